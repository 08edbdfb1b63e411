//! Transporter abstraction trait
//!
//! This module defines the Transporter trait that all transport backends must implement.

use async_trait::async_trait;
use thiserror::Error;
use transit_core::{FileHandle, TransitError, TransporterBackend};

/// Transport operation errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

impl From<TransportError> for TransitError {
    fn from(err: TransportError) -> Self {
        TransitError::Transportation(err.to_string())
    }
}

/// Moves a local file to a remote destination.
///
/// A successful `transport` consumes the local file: implementations delete it
/// once the remote copy is written and return a location string that `delete`
/// accepts later.
#[async_trait]
pub trait Transporter: Send + Sync {
    /// Upload the file and return its remote location
    async fn transport(&self, file: FileHandle) -> TransportResult<String>;

    /// Remove a previously transported file.
    ///
    /// Accepts a location returned by `transport` or a raw key. Returns `false`
    /// when the location cannot be resolved or the backend refuses the delete.
    async fn delete(&self, location: &str) -> bool;

    /// Get the transporter backend type
    fn backend_type(&self) -> TransporterBackend;
}
