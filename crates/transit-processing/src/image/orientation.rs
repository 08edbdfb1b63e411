use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use anyhow::bail;
use async_trait::async_trait;
use image::{imageops, DynamicImage};
use transit_core::FileHandle;

use super::output::{apply, OutputOptions};
use crate::traits::Transformer;

/// Image orientation operations (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotate image by specified angle (90, 180, or 270 degrees clockwise)
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
            180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
            270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
            _ => img,
        }
    }

    /// Apply horizontal flip (mirror)
    pub fn apply_flip_horizontal(img: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()))
    }

    /// Apply vertical flip
    pub fn apply_flip_vertical(img: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()))
    }

    /// Undo an EXIF orientation so the pixels display upright
    pub fn apply_exif_orientation(mut img: DynamicImage, orientation: u32) -> DynamicImage {
        let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );

        // Rotation first, then flips
        if let Some(angle) = rotate {
            img = Self::rotate_by_angle(img, angle);
        }
        if flip_h {
            img = Self::apply_flip_horizontal(img);
        }
        if flip_v {
            img = Self::apply_flip_vertical(img);
        }

        img
    }

    /// EXIF orientation tag of a file; 1 (upright) when absent or unreadable
    pub fn read_exif_orientation(path: &Path) -> u32 {
        let Ok(file) = File::open(path) else {
            return 1;
        };
        let mut reader = BufReader::new(file);
        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(data) => data
                .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
                .unwrap_or(1),
            Err(_) => 1,
        }
    }
}

/// Clockwise rotation and flips (horizontal, vertical) that undo an EXIF
/// orientation value, applied in that order.
pub fn orientation_transforms(orientation: u32) -> (Option<u16>, bool, bool) {
    match orientation {
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(90), true, false),   // Transpose
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(270), true, false),  // Transverse
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Normal or invalid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
    Both,
}

impl FromStr for FlipDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h" | "horizontal" => Ok(FlipDirection::Horizontal),
            "v" | "vertical" => Ok(FlipDirection::Vertical),
            "both" => Ok(FlipDirection::Both),
            _ => bail!("Invalid flip direction: {}", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlipTransformer {
    direction: FlipDirection,
    output: OutputOptions,
}

impl FlipTransformer {
    pub fn new(direction: FlipDirection) -> Self {
        Self {
            direction,
            output: OutputOptions::with_suffix("-flipped"),
        }
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl Transformer for FlipTransformer {
    fn name(&self) -> &'static str {
        "flip"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let direction = self.direction;
        apply(file, in_place, &self.output, move |img| {
            Ok(match direction {
                FlipDirection::Horizontal => ImageOrientation::apply_flip_horizontal(img),
                FlipDirection::Vertical => ImageOrientation::apply_flip_vertical(img),
                FlipDirection::Both => ImageOrientation::rotate_by_angle(img, 180),
            })
        })
        .await
    }
}

/// Rotates clockwise by a right angle
#[derive(Debug, Clone)]
pub struct RotateTransformer {
    degrees: u16,
    output: OutputOptions,
}

impl RotateTransformer {
    pub fn new(degrees: u16) -> anyhow::Result<Self> {
        if !matches!(degrees, 90 | 180 | 270) {
            bail!("Rotation must be 90, 180 or 270 degrees, got {}", degrees);
        }
        Ok(Self {
            degrees,
            output: OutputOptions::with_suffix("-rotated"),
        })
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl Transformer for RotateTransformer {
    fn name(&self) -> &'static str {
        "rotate"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let degrees = self.degrees;
        apply(file, in_place, &self.output, move |img| {
            Ok(ImageOrientation::rotate_by_angle(img, degrees))
        })
        .await
    }
}

/// Bakes the EXIF orientation into the pixels.
///
/// The re-encoded output carries no EXIF block, so it is not rotated twice.
#[derive(Debug, Clone)]
pub struct ExifTransformer {
    output: OutputOptions,
}

impl ExifTransformer {
    pub fn new() -> Self {
        Self {
            output: OutputOptions::with_suffix("-oriented"),
        }
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

impl Default for ExifTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transformer for ExifTransformer {
    fn name(&self) -> &'static str {
        "exif"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let source = file.path().to_path_buf();
        apply(file, in_place, &self.output, move |img| {
            let orientation = ImageOrientation::read_exif_orientation(&source);
            Ok(ImageOrientation::apply_exif_orientation(img, orientation))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
    use tempfile::tempdir;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    /// 3x2 image with a red top-left pixel
    fn marked() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(3, 2, BLACK);
        img.put_pixel(0, 0, RED);
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_rotation_dimension_changes() {
        let img = marked();
        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 90);
        assert_eq!(rotated.dimensions(), (2, 3));
        // top-left moves to top-right
        assert_eq!(rotated.get_pixel(1, 0), RED);

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 180);
        assert_eq!(rotated.dimensions(), (3, 2));
        assert_eq!(rotated.get_pixel(2, 1), RED);

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 45);
        assert_eq!(rotated.dimensions(), img.dimensions());
    }

    #[test]
    fn test_flip_operations() {
        let flipped = ImageOrientation::apply_flip_horizontal(marked());
        assert_eq!(flipped.get_pixel(2, 0), RED);

        let flipped = ImageOrientation::apply_flip_vertical(marked());
        assert_eq!(flipped.get_pixel(0, 1), RED);
    }

    #[test]
    fn test_orientation_transforms() {
        assert_eq!(orientation_transforms(1), (None, false, false));
        assert_eq!(orientation_transforms(6), (Some(90), false, false));
        assert_eq!(orientation_transforms(42), (None, false, false));

        // orientation 5 stores the transpose: pixel (x, y) displays at (y, x)
        let transposed = ImageOrientation::apply_exif_orientation(marked(), 5);
        assert_eq!(transposed.dimensions(), (2, 3));
        assert_eq!(transposed.get_pixel(0, 0), RED);

        // orientation 7 stores the transverse: (0, 0) displays at (h-1, w-1)
        let transverse = ImageOrientation::apply_exif_orientation(marked(), 7);
        assert_eq!(transverse.dimensions(), (2, 3));
        assert_eq!(transverse.get_pixel(1, 2), RED);
    }

    #[test]
    fn test_missing_exif_is_upright() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        marked().save_with_format(&path, ImageFormat::Png).unwrap();
        assert_eq!(ImageOrientation::read_exif_orientation(&path), 1);
    }

    #[test]
    fn test_rotate_rejects_odd_angles() {
        assert!(RotateTransformer::new(45).is_err());
        assert!(RotateTransformer::new(270).is_ok());
        assert_eq!("H".parse::<FlipDirection>().unwrap(), FlipDirection::Horizontal);
        assert!("diagonal".parse::<FlipDirection>().is_err());
    }

    #[tokio::test]
    async fn test_rotate_transformer_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        marked().save_with_format(&path, ImageFormat::Png).unwrap();
        let original = FileHandle::new(&path).unwrap();

        let rotated = RotateTransformer::new(90)
            .unwrap()
            .transform(&original, true)
            .await
            .unwrap();

        assert_eq!(rotated.path(), original.path());
        assert_eq!((rotated.width(), rotated.height()), (Some(2), Some(3)));
    }

    #[tokio::test]
    async fn test_flip_and_exif_derive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pic.png");
        marked().save_with_format(&path, ImageFormat::Png).unwrap();
        let original = FileHandle::new(&path).unwrap();

        let flipped = FlipTransformer::new(FlipDirection::Both)
            .transform(&original, false)
            .await
            .unwrap();
        assert_eq!(flipped.basename(), "pic-flipped.png");

        let oriented = ExifTransformer::new()
            .transform(&original, false)
            .await
            .unwrap();
        assert_eq!(oriented.basename(), "pic-oriented.png");
        assert_eq!(oriented.width(), Some(3));
    }
}
