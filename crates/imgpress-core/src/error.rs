//! Error types module
//!
//! Every failure in imgpress is local to a single image: a preview failure drops
//! the file from ingestion, a compression failure moves the record to `error`,
//! and an unsupported file type never reaches the registry. None of them is
//! fatal to the process.

use std::io;

use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like rejected file types
    Debug,
    /// Warning level - for per-image failures the user can retry
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be presented and logged.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "COMPRESSION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the failed operation can be retried as-is
    fn is_recoverable(&self) -> bool;

    /// Human-readable message shown next to the affected image
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum PressError {
    #[error("Preview generation failed: {0}")]
    PreviewFailure(String),

    #[error("Compression failed: {0}")]
    CompressionFailure(String),

    #[error("Unsupported file type: {content_type} ({filename})")]
    InvalidFileType {
        filename: String,
        content_type: String,
    },

    #[error("File too large: {filename} is {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        filename: String,
        size: usize,
        max: usize,
    },

    #[error("Empty file: {0}")]
    EmptyFile(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type PressResult<T> = Result<T, PressError>;

impl From<anyhow::Error> for PressError {
    fn from(err: anyhow::Error) -> Self {
        PressError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn press_error_static_metadata(err: &PressError) -> (&'static str, bool, LogLevel) {
    match err {
        PressError::PreviewFailure(_) => ("PREVIEW_FAILED", false, LogLevel::Warn),
        PressError::CompressionFailure(_) => ("COMPRESSION_FAILED", true, LogLevel::Warn),
        PressError::InvalidFileType { .. } => ("INVALID_FILE_TYPE", false, LogLevel::Debug),
        PressError::FileTooLarge { .. } => ("FILE_TOO_LARGE", false, LogLevel::Debug),
        PressError::EmptyFile(_) => ("EMPTY_FILE", false, LogLevel::Debug),
        PressError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        PressError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        PressError::Io(_) => ("IO_ERROR", true, LogLevel::Error),
        PressError::Internal(_) | PressError::InternalWithSource { .. } => {
            ("INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for PressError {
    fn error_code(&self) -> &'static str {
        press_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        press_error_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        match self {
            PressError::PreviewFailure(msg)
            | PressError::CompressionFailure(msg)
            | PressError::InvalidInput(msg)
            | PressError::Internal(msg) => msg.clone(),
            PressError::InternalWithSource { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        press_error_static_metadata(self).2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_failure_is_recoverable() {
        let err = PressError::CompressionFailure("encoder exploded".to_string());
        assert_eq!(err.error_code(), "COMPRESSION_FAILED");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_client_message_strips_prefix() {
        let err = PressError::CompressionFailure("bad header".to_string());
        assert_eq!(err.to_string(), "Compression failed: bad header");
        assert_eq!(err.client_message(), "bad header");
    }

    #[test]
    fn test_invalid_file_type_message() {
        let err = PressError::InvalidFileType {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_FILE_TYPE");
        assert_eq!(err.client_message(), "Unsupported file type: text/plain (notes.txt)");
    }

    #[test]
    fn test_from_anyhow_keeps_message() {
        let err: PressError = anyhow::anyhow!("worker pool gone").into();
        assert_eq!(err.client_message(), "worker pool gone");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_from_io_error() {
        let err: PressError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
