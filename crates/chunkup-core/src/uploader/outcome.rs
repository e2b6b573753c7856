//! Attempt errors and their mapping to the single reported outcome.

use std::io;
use thiserror::Error;

use super::state::PatchResult;
use crate::api::ApiError;

pub const PATCH_SUCCESS_MESSAGE: &str = "合并依赖成功";
pub const PATCH_FAIL_MESSAGE: &str = "合并依赖失败";
pub const UPLOAD_FAIL_MESSAGE: &str = "上传文件失败";

/// Internal failure of an attempt after validation passed.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("chunk {index}: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: ApiError,
    },
    /// No upload worker thread could be started.
    #[error("start chunk upload workers: {0}")]
    Spawn(#[source] io::Error),
    /// A worker stopped without reporting its chunk (it panicked).
    #[error("chunk upload worker exited without a result")]
    WorkerLost,
    #[error("checksum: {0}")]
    Checksum(#[source] io::Error),
    #[error("patch: {0}")]
    Patch(#[source] ApiError),
}

/// The one `(result, message)` value an attempt produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub result: PatchResult,
    pub message: String,
}

impl PatchOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            result: PatchResult::Success,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: PatchResult::Fail,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == PatchResult::Success
    }

    /// Outcome for a patch call the server answered.
    pub fn from_patch_reply(patched: bool) -> Self {
        if patched {
            Self::success(PATCH_SUCCESS_MESSAGE)
        } else {
            Self::fail(PATCH_FAIL_MESSAGE)
        }
    }

    /// Outcome for a failed attempt. Only business errors from the patch call
    /// reach the user verbatim.
    pub fn from_error(err: &UploadError) -> Self {
        match err {
            UploadError::Chunk { .. } | UploadError::Spawn(_) | UploadError::WorkerLost => {
                Self::fail(UPLOAD_FAIL_MESSAGE)
            }
            UploadError::Checksum(_) => Self::fail(PATCH_FAIL_MESSAGE),
            UploadError::Patch(api) => match api.business_message() {
                Some(msg) => Self::fail(msg),
                None => Self::fail(PATCH_FAIL_MESSAGE),
            },
        }
    }
}
