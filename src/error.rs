use crate::adapters::AdapterId;
use thiserror::Error;

/// Why an incoming file was refused before it reached the selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} ({mime}) does not match the accepted types '{accept}'")]
    TypeMismatch {
        name: String,
        mime: String,
        accept: String,
    },

    #[error("{name} is {size} bytes, larger than the {max} byte limit")]
    SizeExceeded { name: String, size: u64, max: u64 },
}

impl ValidationError {
    pub fn file_name(&self) -> &str {
        match self {
            ValidationError::TypeMismatch { name, .. } => name,
            ValidationError::SizeExceeded { name, .. } => name,
        }
    }
}

#[derive(Debug, Error)]
pub enum UploaderError {
    #[error("File validation failed: {0}")]
    FileValidation(#[from] ValidationError),

    #[error("Presigned URL error: {0}")]
    PresignedUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Temporary credentials error: {0}")]
    TemporaryCredentials(String),

    #[error("{adapter} sign-in failed: {message}")]
    AdapterAuth { adapter: AdapterId, message: String },

    #[error("{adapter} error: {message}")]
    Adapter { adapter: AdapterId, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unknown content reference: {0}")]
    UnknownContent(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl UploaderError {
    pub fn adapter(adapter: AdapterId, message: impl Into<String>) -> Self {
        UploaderError::Adapter {
            adapter,
            message: message.into(),
        }
    }

    pub fn auth(adapter: AdapterId, message: impl Into<String>) -> Self {
        UploaderError::AdapterAuth {
            adapter,
            message: message.into(),
        }
    }

    /// Maps a drive API status code to the adapter error taxonomy.
    pub fn from_status(adapter: AdapterId, status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::auth(
                adapter,
                format!("{} - please sign in again", status),
            ),
            _ => Self::adapter(adapter, format!("request failed with status {}: {}", status, body)),
        }
    }
}

pub type Result<T> = std::result::Result<T, UploaderError>;
