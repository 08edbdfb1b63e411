//! Image transformers
//!
//! Each transformer decodes the source on a blocking thread, applies one
//! operation and writes the result in the source's format.

mod crop;
mod orientation;
mod output;
mod resize;

pub use crop::{CropLocation, CropTransformer};
pub use orientation::{
    orientation_transforms, ExifTransformer, FlipDirection, FlipTransformer, ImageOrientation,
    RotateTransformer,
};
pub use output::OutputOptions;
pub use resize::{
    FitTransformer, ImageResize, ResizeDimensions, ResizeTransformer, ScaleTransformer,
    StretchMode,
};
