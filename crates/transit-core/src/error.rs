//! Error types module
//!
//! All pipeline failures are unified under [`TransitError`]. Validation failures
//! carry a [`ValidationError`], which in turn lists every [`RuleViolation`] a
//! validator found so callers can report all of them at once.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for failures the caller can correct and retry
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// A single validation rule that a file failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("File is empty")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File too small: {size} bytes (min: {min} bytes)")]
    FileTooSmall { size: u64, min: u64 },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid mime type: {mime_type} (allowed: {allowed:?})")]
    InvalidMimeType {
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("File is not an image")]
    NotAnImage,

    #[error("Image width {actual}px is below the minimum of {min}px")]
    WidthTooSmall { actual: u32, min: u32 },

    #[error("Image width {actual}px exceeds the maximum of {max}px")]
    WidthTooLarge { actual: u32, max: u32 },

    #[error("Image height {actual}px is below the minimum of {min}px")]
    HeightTooSmall { actual: u32, min: u32 },

    #[error("Image height {actual}px exceeds the maximum of {max}px")]
    HeightTooLarge { actual: u32, max: u32 },
}

fn join_violations(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validation failures, raised either by a validator or by a malformed upload.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No file was uploaded")]
    MissingFile,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Not a valid uploaded file: {0}")]
    NotUploaded(String),

    #[error("Unable to inspect file: {0}")]
    Unreadable(String),

    #[error("File failed validation: {}", join_violations(.0))]
    Rules(Vec<RuleViolation>),
}

impl ValidationError {
    /// Rule violations carried by this error (empty for descriptor failures).
    pub fn violations(&self) -> &[RuleViolation] {
        match self {
            ValidationError::Rules(violations) => violations,
            _ => &[],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    /// Filesystem or network operation failed (copy, move, write, fetch).
    #[error("IO error: {0}")]
    Io(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A transformer failed; partial output has been rolled back.
    #[error("Transformation failed: {0}")]
    Transformation(String),

    /// A transporter failed; partial remote state has been rolled back.
    #[error("Transportation failed: {0}")]
    Transportation(String),

    /// An operation was invoked without its required collaborator or input.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<io::Error> for TransitError {
    fn from(err: io::Error) -> Self {
        TransitError::Io(err.to_string())
    }
}

impl TransitError {
    /// Build an I/O error that names the operation that failed.
    pub fn io(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        TransitError::Io(format!("{}: {}", context, err))
    }

    /// Machine-readable error code (e.g. "TRANSFORMATION_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            TransitError::Io(_) => "IO_ERROR",
            TransitError::Validation(_) => "VALIDATION_ERROR",
            TransitError::Transformation(_) => "TRANSFORMATION_ERROR",
            TransitError::Transportation(_) => "TRANSPORTATION_ERROR",
            TransitError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            TransitError::Validation(_) => LogLevel::Debug,
            TransitError::Configuration(_) => LogLevel::Warn,
            TransitError::Io(_)
            | TransitError::Transformation(_)
            | TransitError::Transportation(_) => LogLevel::Error,
        }
    }
}

/// Result type for pipeline operations
pub type TransitResult<T> = Result<T, TransitError>;
