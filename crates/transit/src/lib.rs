//! Transit
//!
//! A file-upload pipeline: acquire one original file (form upload, local
//! copy, remote download or raw stream), validate it, derive transformed
//! files from it, and hand everything to a transporter. Failed transform and
//! transport steps roll back the files they produced.
//!
//! ```no_run
//! use std::sync::Arc;
//! use transit::{Input, LocalTransporter, ResizeDimensions, ResizeTransformer, Transit};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut transit = Transit::new(Input::Remote("https://example.com/cat.png".into()));
//! transit
//!     .set_directory("/tmp/transit")?
//!     .add_transformer(ResizeTransformer::new(
//!         ResizeDimensions::parse("200x200").map_err(anyhow::Error::msg)?,
//!     ))
//!     .set_transporter(Arc::new(
//!         LocalTransporter::new("/srv/media", "https://cdn.example.com".to_string()).await?,
//!     ));
//!
//! transit.import_from_remote(false).await?;
//! transit.transform().await?;
//! let locations = transit.transport().await?;
//! # Ok(())
//! # }
//! ```

pub mod import;
pub mod input;
pub mod transit;
pub mod upload;

pub use crate::transit::Transit;
pub use import::{Importer, LocalImporter, RemoteImporter, StreamImporter};
pub use input::{Input, StreamInput, UploadDescriptor, UploadErrorCode};
pub use upload::{check_descriptor, finalize_upload};

pub use transit_core::{
    megabytes_to_bytes, FileHandle, FileMetadata, LogLevel, RuleViolation, TransitConfig,
    TransitError, TransitResult, ValidationError,
};
pub use transit_processing::{FileValidator, Transformer, Validator};
#[cfg(feature = "image")]
pub use transit_processing::{
    CropLocation, CropTransformer, ExifTransformer, FitTransformer, FlipDirection,
    FlipTransformer, OutputOptions, ResizeDimensions, ResizeTransformer, RotateTransformer,
    ScaleTransformer, StretchMode,
};
pub use transit_storage::{create_transporter, TransportError, Transporter, TransporterBackend};
#[cfg(feature = "transport-local")]
pub use transit_storage::LocalTransporter;
#[cfg(feature = "transport-s3")]
pub use transit_storage::S3Transporter;
