use anyhow::bail;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use transit_core::FileHandle;

use super::output::{apply, OutputOptions};
use crate::traits::Transformer;

/// Largest side a scale may produce
pub const MAX_SCALED_DIMENSION: u32 = 16_384;

/// Stretch mode for image resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StretchMode {
    #[default]
    On, // Allow upscaling
    Off,  // Keep the original when the target is larger
    Fill, // Pad onto a white canvas instead of upscaling
}

/// Target box for a resize; either side may be left open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeDimensions {
    /// Parse dimensions from string format: "WxH", "Wx", or "xH"
    pub fn parse(s: &str) -> Result<Self, String> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| "Invalid dimensions format. Expected: WxH, Wx, or xH".to_string())?;

        let parse_side = |value: &str, label: &str| -> Result<Option<u32>, String> {
            if value.is_empty() {
                return Ok(None);
            }
            match value.parse::<u32>() {
                Ok(0) | Err(_) => Err(format!("Invalid {}: {}", label, value)),
                Ok(v) => Ok(Some(v)),
            }
        };

        let width = parse_side(w, "width")?;
        let height = parse_side(h, "height")?;

        if width.is_none() && height.is_none() {
            return Err("At least one dimension must be specified".to_string());
        }

        Ok(ResizeDimensions { width, height })
    }
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Calculate target dimensions.
    ///
    /// A missing side follows the aspect ratio. With both sides given and
    /// `keep_aspect`, the image is scaled to fit inside the box.
    pub fn calculate_dimensions(
        orig_width: u32,
        orig_height: u32,
        dimensions: ResizeDimensions,
        keep_aspect: bool,
    ) -> (u32, u32) {
        match (dimensions.width, dimensions.height) {
            (Some(w), Some(h)) if keep_aspect => {
                let scale = (w as f32 / orig_width as f32).min(h as f32 / orig_height as f32);
                Self::scaled(orig_width, orig_height, scale)
            }
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let aspect_ratio = orig_height as f32 / orig_width as f32;
                let h = (w as f32 * aspect_ratio).round() as u32;
                (w, h.max(1))
            }
            (None, Some(h)) => {
                let aspect_ratio = orig_width as f32 / orig_height as f32;
                let w = (h as f32 * aspect_ratio).round() as u32;
                (w.max(1), h)
            }
            (None, None) => (orig_width, orig_height),
        }
    }

    fn scaled(width: u32, height: u32, scale: f32) -> (u32, u32) {
        (
            ((width as f32 * scale).round() as u32).max(1),
            ((height as f32 * scale).round() as u32).max(1),
        )
    }

    /// Scaled size, refusing results with a side above [`MAX_SCALED_DIMENSION`]
    pub fn checked_scale(width: u32, height: u32, scale: f32) -> anyhow::Result<(u32, u32)> {
        let w = (width as f64 * scale as f64).round();
        let h = (height as f64 * scale as f64).round();
        let max = MAX_SCALED_DIMENSION as f64;
        if w > max || h > max {
            bail!(
                "Scaled size {}x{} exceeds the {}px limit",
                w,
                h,
                MAX_SCALED_DIMENSION
            );
        }
        Ok(((w as u32).max(1), (h as u32).max(1)))
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Scale the image into a `target_width` x `target_height` canvas filled
    /// with `fill`, centered. Without `upscale` smaller images are padded at
    /// their original size.
    pub fn resize_with_fill(
        img: &DynamicImage,
        target_width: u32,
        target_height: u32,
        fill: Rgba<u8>,
        upscale: bool,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();

        let scale_width = target_width as f32 / orig_width as f32;
        let scale_height = target_height as f32 / orig_height as f32;
        let mut scale = scale_width.min(scale_height);
        if !upscale {
            scale = scale.min(1.0);
        }

        let (scaled_width, scaled_height) = Self::scaled(orig_width, orig_height, scale);
        let scaled_width = scaled_width.min(target_width);
        let scaled_height = scaled_height.min(target_height);

        let mut canvas =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(target_width, target_height, fill));

        let x_offset = (target_width - scaled_width) / 2;
        let y_offset = (target_height - scaled_height) / 2;

        if (scaled_width, scaled_height) != (orig_width, orig_height) {
            let resized = Self::resize_image(img, scaled_width, scaled_height);
            imageops::overlay(&mut canvas, &resized, x_offset as i64, y_offset as i64);
        } else {
            imageops::overlay(&mut canvas, img, x_offset as i64, y_offset as i64);
        }

        canvas
    }

    /// Apply resize with stretch mode handling
    pub fn apply_resize(
        img: &DynamicImage,
        dimensions: ResizeDimensions,
        keep_aspect: bool,
        stretch_mode: StretchMode,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) =
            Self::calculate_dimensions(orig_width, orig_height, dimensions, keep_aspect);
        let upscaling = target_width > orig_width || target_height > orig_height;

        match stretch_mode {
            StretchMode::On => Self::resize_image(img, target_width, target_height),
            StretchMode::Off if upscaling => img.clone(),
            StretchMode::Fill if upscaling => Self::resize_with_fill(
                img,
                target_width,
                target_height,
                Rgba([255, 255, 255, 255]),
                false,
            ),
            _ => Self::resize_image(img, target_width, target_height),
        }
    }
}

/// Resizes to a width and/or height
#[derive(Debug, Clone)]
pub struct ResizeTransformer {
    dimensions: ResizeDimensions,
    keep_aspect: bool,
    stretch: StretchMode,
    output: OutputOptions,
}

impl ResizeTransformer {
    pub fn new(dimensions: ResizeDimensions) -> Self {
        Self {
            dimensions,
            keep_aspect: true,
            stretch: StretchMode::default(),
            output: OutputOptions::with_suffix("-resized"),
        }
    }

    /// Stretch to the exact box instead of fitting inside it
    pub fn ignore_aspect(mut self) -> Self {
        self.keep_aspect = false;
        self
    }

    pub fn stretch(mut self, stretch: StretchMode) -> Self {
        self.stretch = stretch;
        self
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl Transformer for ResizeTransformer {
    fn name(&self) -> &'static str {
        "resize"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let dimensions = self.dimensions;
        let keep_aspect = self.keep_aspect;
        let stretch = self.stretch;
        apply(file, in_place, &self.output, move |img| {
            Ok(ImageResize::apply_resize(
                &img,
                dimensions,
                keep_aspect,
                stretch,
            ))
        })
        .await
    }
}

/// Scales both sides by a percentage
#[derive(Debug, Clone)]
pub struct ScaleTransformer {
    percent: f32,
    output: OutputOptions,
}

impl ScaleTransformer {
    pub fn new(percent: f32) -> anyhow::Result<Self> {
        if !percent.is_finite() || percent <= 0.0 {
            bail!("Scale percentage must be positive, got {}", percent);
        }
        Ok(Self {
            percent,
            output: OutputOptions::with_suffix("-scaled"),
        })
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl Transformer for ScaleTransformer {
    fn name(&self) -> &'static str {
        "scale"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let scale = self.percent / 100.0;
        apply(file, in_place, &self.output, move |img| {
            let (width, height) = ImageResize::checked_scale(img.width(), img.height(), scale)?;
            Ok(ImageResize::resize_image(&img, width, height))
        })
        .await
    }
}

/// Fits the image inside a box, padding the rest with a fill colour
#[derive(Debug, Clone)]
pub struct FitTransformer {
    width: u32,
    height: u32,
    fill: Rgba<u8>,
    output: OutputOptions,
}

impl FitTransformer {
    pub fn new(width: u32, height: u32) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            bail!("Fit box must be non-empty, got {}x{}", width, height);
        }
        Ok(Self {
            width,
            height,
            fill: Rgba([255, 255, 255, 255]),
            output: OutputOptions::with_suffix("-fit"),
        })
    }

    pub fn fill(mut self, fill: [u8; 4]) -> Self {
        self.fill = Rgba(fill);
        self
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl Transformer for FitTransformer {
    fn name(&self) -> &'static str {
        "fit"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let (width, height, fill) = (self.width, self.height, self.fill);
        apply(file, in_place, &self.output, move |img| {
            Ok(ImageResize::resize_with_fill(&img, width, height, fill, true))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::path::Path;
    use tempfile::tempdir;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255])))
    }

    fn write_png(path: &Path, width: u32, height: u32) -> FileHandle {
        solid(width, height)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
        FileHandle::new(path).unwrap()
    }

    #[test]
    fn test_parse_dimensions() {
        let dims = ResizeDimensions::parse("320x240").unwrap();
        assert_eq!(dims.width, Some(320));
        assert_eq!(dims.height, Some(240));

        let dims = ResizeDimensions::parse("320x").unwrap();
        assert_eq!(dims.height, None);

        let dims = ResizeDimensions::parse("x240").unwrap();
        assert_eq!(dims.width, None);

        assert!(ResizeDimensions::parse("x").is_err());
        assert!(ResizeDimensions::parse("abc").is_err());
        assert!(ResizeDimensions::parse("0x10").is_err());
    }

    #[test]
    fn test_calculate_dimensions() {
        let both = ResizeDimensions {
            width: Some(50),
            height: Some(75),
        };
        assert_eq!(ImageResize::calculate_dimensions(100, 100, both, false), (50, 75));
        assert_eq!(ImageResize::calculate_dimensions(100, 100, both, true), (50, 50));

        let width_only = ResizeDimensions {
            width: Some(200),
            height: None,
        };
        // 50/100 * 200 = 100
        assert_eq!(ImageResize::calculate_dimensions(100, 50, width_only, true), (200, 100));

        let height_only = ResizeDimensions {
            width: None,
            height: Some(100),
        };
        assert_eq!(ImageResize::calculate_dimensions(100, 50, height_only, true), (200, 100));
    }

    #[test]
    fn test_resize_with_fill() {
        let fill = Rgba([0, 0, 255, 255]);
        let padded = ImageResize::resize_with_fill(&solid(50, 50), 100, 80, fill, false);
        assert_eq!(padded.dimensions(), (100, 80));
        // original kept at 50x50 in the middle
        assert_eq!(padded.get_pixel(0, 0), fill);
        assert_eq!(padded.get_pixel(50, 40), Rgba([255, 0, 0, 255]));

        let fitted = ImageResize::resize_with_fill(&solid(50, 25), 100, 100, fill, true);
        assert_eq!(fitted.dimensions(), (100, 100));
        assert_eq!(fitted.get_pixel(50, 10), fill);
        let center = fitted.get_pixel(50, 50);
        assert!(center[0] > 200 && center[2] < 50);
    }

    #[test]
    fn test_apply_resize_stretch_modes() {
        let img = solid(50, 50);
        let up = ResizeDimensions {
            width: Some(100),
            height: Some(100),
        };

        let resized = ImageResize::apply_resize(&img, up, true, StretchMode::On);
        assert_eq!(resized.dimensions(), (100, 100));

        let resized = ImageResize::apply_resize(&img, up, true, StretchMode::Off);
        assert_eq!(resized.dimensions(), (50, 50));

        let resized = ImageResize::apply_resize(&img, up, true, StretchMode::Fill);
        assert_eq!(resized.dimensions(), (100, 100));

        let down = ResizeDimensions {
            width: Some(25),
            height: Some(25),
        };
        let resized = ImageResize::apply_resize(&img, down, true, StretchMode::Off);
        assert_eq!(resized.dimensions(), (25, 25));
    }

    #[tokio::test]
    async fn test_resize_transformer_derives_new_file() {
        let dir = tempdir().unwrap();
        let original = write_png(&dir.path().join("photo.png"), 40, 20);

        let transformer = ResizeTransformer::new(ResizeDimensions::parse("20x").unwrap());
        let resized = transformer.transform(&original, false).await.unwrap();

        assert_eq!(resized.basename(), "photo-resized.png");
        assert_eq!(resized.width(), Some(20));
        assert_eq!(resized.height(), Some(10));
        assert_eq!(original.width(), Some(40));

        // a second run must not clobber the first output
        let again = transformer.transform(&original, false).await.unwrap();
        assert_eq!(again.basename(), "photo-resized-1.png");
    }

    #[tokio::test]
    async fn test_scale_transformer_in_place() {
        let dir = tempdir().unwrap();
        let original = write_png(&dir.path().join("photo.png"), 40, 20);

        let scaled = ScaleTransformer::new(50.0)
            .unwrap()
            .transform(&original, true)
            .await
            .unwrap();

        assert_eq!(scaled.path(), original.path());
        assert_eq!(scaled.width(), Some(20));
        assert_eq!(scaled.height(), Some(10));
        assert!(ScaleTransformer::new(0.0).is_err());
    }

    #[test]
    fn test_checked_scale_limits_output() {
        assert_eq!(ImageResize::checked_scale(40, 20, 0.5).unwrap(), (20, 10));
        assert_eq!(ImageResize::checked_scale(3, 3, 0.01).unwrap(), (1, 1));
        assert!(ImageResize::checked_scale(10, 10, 1e9).is_err());
        assert!(ImageResize::checked_scale(MAX_SCALED_DIMENSION, 1, 1.01).is_err());
    }

    #[tokio::test]
    async fn test_huge_scale_fails_without_output() {
        let dir = tempdir().unwrap();
        let original = write_png(&dir.path().join("photo.png"), 10, 10);

        let result = ScaleTransformer::new(1e9)
            .unwrap()
            .transform(&original, false)
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_fit_transformer() {
        let dir = tempdir().unwrap();
        let original = write_png(&dir.path().join("wide.png"), 40, 10);

        let fitted = FitTransformer::new(30, 30)
            .unwrap()
            .output(OutputOptions::with_suffix("-box").prepend("t_"))
            .transform(&original, false)
            .await
            .unwrap();

        assert_eq!(fitted.basename(), "t_wide-box.png");
        assert_eq!(fitted.width(), Some(30));
        assert_eq!(fitted.height(), Some(30));
    }

    #[tokio::test]
    async fn test_transform_non_image_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();
        let file = FileHandle::new(&path).unwrap();

        let result = ResizeTransformer::new(ResizeDimensions::parse("10x10").unwrap())
            .transform(&file, false)
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("notes-resized.txt").exists());
    }
}
