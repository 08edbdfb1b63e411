use std::str::FromStr;

use anyhow::bail;
use async_trait::async_trait;
use image::DynamicImage;
use transit_core::FileHandle;

use super::output::{apply, OutputOptions};
use crate::traits::Transformer;

/// Anchor of the crop window inside the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropLocation {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CropLocation {
    /// Top-left corner of a `width` x `height` window anchored in the image
    pub fn offset(self, img_width: u32, img_height: u32, width: u32, height: u32) -> (u32, u32) {
        let free_x = img_width.saturating_sub(width);
        let free_y = img_height.saturating_sub(height);
        let (mid_x, mid_y) = (free_x / 2, free_y / 2);

        match self {
            CropLocation::Center => (mid_x, mid_y),
            CropLocation::Top => (mid_x, 0),
            CropLocation::Bottom => (mid_x, free_y),
            CropLocation::Left => (0, mid_y),
            CropLocation::Right => (free_x, mid_y),
            CropLocation::TopLeft => (0, 0),
            CropLocation::TopRight => (free_x, 0),
            CropLocation::BottomLeft => (0, free_y),
            CropLocation::BottomRight => (free_x, free_y),
        }
    }
}

impl FromStr for CropLocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let location = match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "center" | "centre" => CropLocation::Center,
            "top" => CropLocation::Top,
            "bottom" => CropLocation::Bottom,
            "left" => CropLocation::Left,
            "right" => CropLocation::Right,
            "topleft" => CropLocation::TopLeft,
            "topright" => CropLocation::TopRight,
            "bottomleft" => CropLocation::BottomLeft,
            "bottomright" => CropLocation::BottomRight,
            _ => bail!("Invalid crop location: {}", s),
        };
        Ok(location)
    }
}

/// Cuts a window out of the image. The window is clamped to the image bounds.
#[derive(Debug, Clone)]
pub struct CropTransformer {
    width: u32,
    height: u32,
    location: CropLocation,
    output: OutputOptions,
}

impl CropTransformer {
    pub fn new(width: u32, height: u32) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            bail!("Crop size must be non-empty, got {}x{}", width, height);
        }
        Ok(Self {
            width,
            height,
            location: CropLocation::default(),
            output: OutputOptions::with_suffix("-cropped"),
        })
    }

    pub fn location(mut self, location: CropLocation) -> Self {
        self.location = location;
        self
    }

    pub fn output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    fn crop(img: &DynamicImage, width: u32, height: u32, location: CropLocation) -> DynamicImage {
        let width = width.min(img.width());
        let height = height.min(img.height());
        let (x, y) = location.offset(img.width(), img.height(), width, height);
        img.crop_imm(x, y, width, height)
    }
}

#[async_trait]
impl Transformer for CropTransformer {
    fn name(&self) -> &'static str {
        "crop"
    }

    async fn transform(&self, file: &FileHandle, in_place: bool) -> anyhow::Result<FileHandle> {
        let (width, height, location) = (self.width, self.height, self.location);
        apply(file, in_place, &self.output, move |img| {
            Ok(Self::crop(&img, width, height, location))
        })
        .await
    }
}
