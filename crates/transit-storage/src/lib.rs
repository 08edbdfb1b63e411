//! Transit Storage Library
//!
//! This crate provides the transport side of the pipeline: the `Transporter`
//! trait and its S3 and local filesystem implementations.
//!
//! # Object keys
//!
//! Both backends store a file under `{folder}/{basename}` (or just `{basename}`
//! without a folder). Keys must not contain `..` or a leading `/`. Key building
//! and location parsing live in the `location` module so the backends agree.

pub mod factory;
pub mod location;
#[cfg(feature = "transport-local")]
pub mod local;
#[cfg(feature = "transport-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_transporter;
#[cfg(feature = "transport-local")]
pub use local::LocalTransporter;
pub use location::{object_key, parse_s3_location, S3Location};
#[cfg(feature = "transport-s3")]
pub use s3::S3Transporter;
pub use traits::{TransportError, TransportResult, Transporter};
pub use transit_core::TransporterBackend;
