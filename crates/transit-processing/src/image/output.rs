use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use transit_core::{find_destination, FileHandle};

const DEFAULT_QUALITY: u8 = 85;

/// Where and how a transformer writes its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Prepended to the source name for derived files
    pub prepend: String,
    /// Appended to the source name for derived files
    pub append: String,
    pub overwrite: bool,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl OutputOptions {
    pub fn with_suffix(append: impl Into<String>) -> Self {
        Self {
            prepend: String::new(),
            append: append.into(),
            overwrite: false,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = prepend.into();
        self
    }

    pub fn append(mut self, append: impl Into<String>) -> Self {
        self.append = append.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Path the transformed image is written to.
    ///
    /// In-place output replaces the source; derived output goes next to it as
    /// `{prepend}{name}{append}.{ext}`.
    pub fn target_path(&self, file: &FileHandle, in_place: bool) -> PathBuf {
        if in_place {
            return file.path().to_path_buf();
        }
        let name = format!("{}{}{}", self.prepend, file.name(), self.append);
        find_destination(file.dir(), &name, &file.ext(), self.overwrite)
    }
}

/// Decode an image, detecting the format from its content
pub(crate) fn load(path: &Path) -> anyhow::Result<(DynamicImage, ImageFormat)> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| anyhow!("Unrecognized image format: {}", path.display()))?;
    let img = reader
        .decode()
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok((img, format))
}

/// Encode to a sibling temp file, then move it over the target.
pub(crate) fn save(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: u8,
) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("Output path has no parent: {}", path.display()))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".transit-")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
            }
            _ => img.write_to(&mut writer, format)?,
        }
        writer.flush()?;
    }

    tmp.persist(path)
        .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e.error))?;
    Ok(())
}

/// Run `op` on the decoded source on a blocking thread and write the result.
pub(crate) async fn apply<F>(
    file: &FileHandle,
    in_place: bool,
    output: &OutputOptions,
    op: F,
) -> anyhow::Result<FileHandle>
where
    F: FnOnce(DynamicImage) -> anyhow::Result<DynamicImage> + Send + 'static,
{
    let source = file.path().to_path_buf();
    let target = output.target_path(file, in_place);
    let quality = output.quality;

    let written = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
        let (img, format) = load(&source)?;
        let transformed = op(img)?;
        save(&transformed, &target, format, quality)?;
        Ok(target)
    })
    .await??;

    Ok(FileHandle::new(&written)?)
}
