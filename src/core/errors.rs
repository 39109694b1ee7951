//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Configuration error (missing key, bad config file)
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Provider returned a non-success status
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Provider response carried no usable content
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// One or more chunks of a file failed to translate
    #[error("{failed} of {total} chunks failed to translate")]
    ChunkFailures {
        failed: usize,
        total: usize,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Zip archive error
    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}

impl TranslationError {
    /// Whether this error is recoverable at chunk granularity.
    ///
    /// Provider failures are recorded against the failing chunk and later
    /// escalated as a file-level [`TranslationError::ChunkFailures`];
    /// configuration errors abort the run before any dispatch begins.
    pub fn is_chunk_recoverable(&self) -> bool {
        matches!(
            self,
            TranslationError::ApiError { .. }
                | TranslationError::NetworkError { .. }
                | TranslationError::InvalidResponseError { .. }
        )
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
