//! Transit Core Library
//!
//! This crate provides the building blocks shared by every Transit component:
//! the `FileHandle` wrapper around staged files, the error taxonomy, destination
//! resolution for staged files, and configuration.

pub mod config;
pub mod destination;
pub mod error;
pub mod file;
pub mod transporter_types;

// Re-export commonly used types
pub use config::{megabytes_to_bytes, TransitConfig};
pub use destination::{find_destination, sanitize_file_name, split_file_name};
pub use error::{LogLevel, RuleViolation, TransitError, TransitResult, ValidationError};
pub use file::{FileHandle, FileMetadata, ImageDimensions};
pub use transporter_types::TransporterBackend;
