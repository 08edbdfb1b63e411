use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};

/// Encoded PNG of a solid-colour image
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

pub fn dimensions(path: &Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}

pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
