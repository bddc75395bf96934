use crate::pbxproj::MarkerWarning;

/// Errors produced by the cleanup pipeline
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Project file is not valid UTF-8 text (first invalid byte at offset {valid_up_to})")]
    Decode {
        valid_up_to: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Validation failed: {reason}")]
    ValidationFailed {
        reason: String,
        warnings: Vec<MarkerWarning>,
    },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Invalid reference pattern: {source}")]
    Pattern {
        #[from]
        source: regex::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl CleanupError {
    pub fn config(details: impl Into<String>) -> Self {
        CleanupError::Config { details: details.into() }
    }
}

pub type Result<T> = std::result::Result<T, CleanupError>;
