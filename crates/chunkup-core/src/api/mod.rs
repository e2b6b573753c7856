//! Storage server API: wire types, response envelope, and the transport seam.
//!
//! The uploader talks to the server only through [`StorageApi`]; the curl
//! implementation lives in [`HttpStorageApi`].

mod envelope;
mod error;
mod http;
mod multipart;

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkSpec;
use crate::source::SourceFile;

pub use envelope::{Envelope, SUCCESS_CODE};
pub use error::ApiError;
pub use http::HttpStorageApi;
pub(crate) use multipart::ChunkBody;

/// Endpoint for a single chunk upload (multipart).
pub const UPLOAD_ENDPOINT: &str = "api/storage/upload";
/// Endpoint that assembles uploaded chunks into the final file (JSON).
pub const PATCH_ENDPOINT: &str = "api/storage/patch";

/// Server-issued identifier for one uploaded chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkHandle(String);

impl ChunkHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

/// `data` of a successful upload response.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReply {
    pub filename: ChunkHandle,
}

/// Body of the patch call. `file_list` must be ordered by chunk index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub filename: String,
    #[serde(rename = "fileList")]
    pub file_list: Vec<String>,
    pub md5: String,
}

impl PatchRequest {
    pub fn new(filename: &str, handles: &[ChunkHandle], md5: String) -> Self {
        Self {
            filename: filename.to_string(),
            file_list: handles.iter().map(|h| h.as_str().to_string()).collect(),
            md5,
        }
    }
}

/// Calls the uploader makes against the storage server.
///
/// Implementations must be shareable across worker threads: chunk uploads for
/// one attempt run concurrently against the same value.
pub trait StorageApi: Send + Sync {
    /// Uploads the bytes of `chunk`, reading them from `file` as they are sent.
    /// The handle identifies the chunk in a later patch call.
    fn upload_chunk(&self, file: &SourceFile, chunk: &ChunkSpec) -> Result<ChunkHandle, ApiError>;

    /// Asks the server to assemble the listed chunks and verify the digest.
    /// `Ok(false)` means the server processed the request but refused the patch.
    fn patch(&self, request: &PatchRequest) -> Result<bool, ApiError>;
}

impl<T: StorageApi + ?Sized> StorageApi for std::sync::Arc<T> {
    fn upload_chunk(&self, file: &SourceFile, chunk: &ChunkSpec) -> Result<ChunkHandle, ApiError> {
        (**self).upload_chunk(file, chunk)
    }

    fn patch(&self, request: &PatchRequest) -> Result<bool, ApiError> {
        (**self).patch(request)
    }
}
