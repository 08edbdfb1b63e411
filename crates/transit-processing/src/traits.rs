//! Core traits for validation and transformation
//!
//! The pipeline coordinator only ever talks to these two seams, so any rule set
//! or file transformation can be plugged in.

use async_trait::async_trait;
use transit_core::{FileHandle, ValidationError};

/// Checks a staged file against a set of rules.
pub trait Validator: Send + Sync {
    /// Validate the file, reporting every rule it fails.
    fn validate(&self, file: &FileHandle) -> Result<(), ValidationError>;

    /// Validate an upload still sitting at its temporary path.
    ///
    /// `client_name` is the name the file will be stored under; name-based
    /// rules should use it instead of the temporary file name.
    fn validate_upload(&self, file: &FileHandle, _client_name: &str) -> Result<(), ValidationError> {
        self.validate(file)
    }
}

/// Produces a transformed file from a source file.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Apply the transformation.
    ///
    /// With `in_place` the source file is replaced and the returned handle
    /// points at the same path; otherwise a new file is written next to it and
    /// the source is left untouched.
    async fn transform(&self, file: &FileHandle, in_place: bool)
        -> Result<FileHandle, anyhow::Error>;
}
