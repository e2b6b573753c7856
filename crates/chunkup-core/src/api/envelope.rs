//! Generic response envelope `{ code, mgs, data }`.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ApiError;

/// Envelope code that marks a successful business response.
pub const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    /// Server message. Some server builds spell the field `msg`.
    #[serde(default, alias = "msg")]
    pub mgs: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// `code == 200` unwraps `data` into `T`; any other code is a business error
    /// carrying the server message.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if self.code != SUCCESS_CODE {
            return Err(ApiError::Business {
                code: self.code,
                message: self.mgs,
            });
        }
        Ok(serde_json::from_value(self.data)?)
    }
}

/// Parse a response body and unwrap its payload in one step.
pub(super) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    Envelope::parse(body)?.into_data()
}
