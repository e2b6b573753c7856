//! Synchronous checks before any network activity.

use std::fmt;

use crate::source::{SourceFile, ACCEPTED_CONTENT_TYPE};

/// Attempt rejected before it started. The message is user-facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No file was selected.
    NoFile,
    /// File is not `application/zip`.
    WrongType { content_type: String },
    /// Another attempt on this uploader has not finished.
    InFlight,
}

impl ValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            ValidationError::NoFile => "请选择文件",
            ValidationError::WrongType { .. } => "只能上传zip文件格式",
            ValidationError::InFlight => "正在上传，请稍候",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Checks a file is selected and is a zip.
pub fn validate(file: Option<&SourceFile>) -> Result<&SourceFile, ValidationError> {
    let file = file.ok_or(ValidationError::NoFile)?;
    if file.content_type() != ACCEPTED_CONTENT_TYPE {
        return Err(ValidationError::WrongType {
            content_type: file.content_type().to_string(),
        });
    }
    Ok(file)
}
