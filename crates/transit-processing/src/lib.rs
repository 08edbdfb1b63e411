//! Transit Processing Library
//!
//! This crate provides the validation and transformation collaborators of the
//! pipeline: the `Validator` and `Transformer` traits, the rule-based
//! `FileValidator`, and image transformers built on the `image` crate.

pub mod traits;
pub mod validator;

#[cfg(feature = "image")]
pub mod image;

// Re-export commonly used types
pub use traits::{Transformer, Validator};
pub use validator::FileValidator;

#[cfg(feature = "image")]
pub use self::image::{
    CropLocation, CropTransformer, ExifTransformer, FitTransformer, FlipDirection,
    FlipTransformer, OutputOptions, ResizeDimensions, ResizeTransformer, RotateTransformer,
    ScaleTransformer, StretchMode,
};
