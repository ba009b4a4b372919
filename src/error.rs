//! Error types for studyguide-rs
//!
//! This module provides the error taxonomy for every bot operation: upload
//! validation, rate limiting, completion gateway
//! failures and storage failures.

use thiserror::Error;

/// Main error type for study guide operations
#[derive(Error, Debug)]
pub enum StudyGuideError {
    /// Uploaded file exceeds the configured size limit
    #[error("File too large (maximum {max_bytes} bytes)")]
    FileTooLarge { max_bytes: u64 },

    /// Uploaded file does not carry the plain-text extension
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Uploaded file is not valid UTF-8
    #[error("Invalid file encoding: expected UTF-8")]
    InvalidEncoding,

    /// User asked again inside the cooldown window
    #[error("Rate limited")]
    RateLimited,

    /// Completion service errors (network, quota, malformed response, timeout)
    #[error("Completion gateway error: {0}")]
    Gateway(String),

    /// Database/storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(String),
}

/// Result type alias for study guide operations
pub type Result<T> = std::result::Result<T, StudyGuideError>;

impl StudyGuideError {
    /// One-line, emoji-prefixed message that is safe to show in a chat channel.
    ///
    /// Only the validation messages carry detail; everything else collapses to
    /// a generic sentence so provider or storage internals never leak.
    pub fn user_message(&self) -> String {
        match self {
            StudyGuideError::FileTooLarge { max_bytes } => format!(
                "❌ File too large! Maximum size is {}MB",
                max_bytes / (1024 * 1024)
            ),
            StudyGuideError::UnsupportedFileType(_) => {
                "❌ Please upload a .txt file only".to_string()
            }
            StudyGuideError::InvalidEncoding => {
                "❌ Invalid file encoding. Please use UTF-8 encoded text files.".to_string()
            }
            StudyGuideError::RateLimited => {
                "⏱️ Please wait a moment before asking another question.".to_string()
            }
            StudyGuideError::Gateway(_) => {
                "❌ The AI service is unavailable right now. Please try again later.".to_string()
            }
            _ => "❌ Something went wrong. Please try again later.".to_string(),
        }
    }
}

// Implement From traits for external error types
impl From<async_openai::error::OpenAIError> for StudyGuideError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        StudyGuideError::Gateway(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StudyGuideError {
    fn from(err: tokio::task::JoinError) -> Self {
        StudyGuideError::Generic(format!("Background task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StudyGuideError::Storage("disk full".to_string());
        assert_eq!(error.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_error_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = StudyGuideError::from(io_error);

        match error {
            StudyGuideError::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let error = StudyGuideError::Gateway("401 invalid api key sk-123".to_string());
        let message = error.user_message();
        assert!(message.starts_with('❌'));
        assert!(!message.contains("sk-123"));

        let error = StudyGuideError::Storage("/var/data/42.txt: permission denied".to_string());
        assert!(!error.user_message().contains("/var/data"));
    }

    #[test]
    fn test_file_too_large_message() {
        let error = StudyGuideError::FileTooLarge { max_bytes: 10 * 1024 * 1024 };
        assert_eq!(error.user_message(), "❌ File too large! Maximum size is 10MB");
    }
}
