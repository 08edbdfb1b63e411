//! Handle to a staged file on disk.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::destination::{find_destination, split_file_name};
use crate::error::{TransitError, TransitResult};

const SNIFF_LEN: usize = 64;

/// Image dimensions as reported by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
    pub mime: String,
}

/// Serializable snapshot of a file's metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub basename: String,
    pub name: String,
    pub ext: String,
    pub dir: PathBuf,
    pub size: u64,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A file that exists on disk.
///
/// The path is canonicalized at construction, which fails unless it points at
/// an existing regular file. Accessors read the file lazily, so a handle whose
/// file has since been deleted reports I/O errors rather than stale values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl AsRef<Path>) -> TransitResult<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)
            .map_err(|e| TransitError::io(format!("File does not exist: {}", path.display()), e))?;

        if !meta.is_file() {
            return Err(TransitError::Io(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let path = path
            .canonicalize()
            .map_err(|e| TransitError::io(format!("Failed to resolve {}", path.display()), e))?;

        Ok(FileHandle { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including the extension
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without the extension
    pub fn name(&self) -> String {
        split_file_name(&self.basename()).0
    }

    /// Lowercased extension, empty when the file has none
    pub fn ext(&self) -> String {
        split_file_name(&self.basename()).1
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn size(&self) -> TransitResult<u64> {
        let meta = fs::metadata(&self.path)
            .map_err(|e| TransitError::io(format!("Failed to stat {}", self.path.display()), e))?;
        Ok(meta.len())
    }

    /// Mime type sniffed from the file's leading bytes.
    ///
    /// Falls back to the extension, then to `application/octet-stream`.
    pub fn mime_type(&self) -> String {
        if let Some(format) = self.sniff_image_format() {
            return format.to_mime_type().to_string();
        }

        mime_guess::from_path(&self.path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    pub fn is_image(&self) -> bool {
        self.mime_type().starts_with("image/")
    }

    /// Image dimensions, or `None` for files the decoder cannot read.
    pub fn dimensions(&self) -> Option<ImageDimensions> {
        let (width, height) = image::ImageReader::open(&self.path)
            .ok()?
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()?;
        Some(ImageDimensions {
            width,
            height,
            mime: self.mime_type(),
        })
    }

    pub fn width(&self) -> Option<u32> {
        self.dimensions().map(|d| d.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.dimensions().map(|d| d.height)
    }

    pub fn metadata(&self) -> TransitResult<FileMetadata> {
        let dimensions = self.dimensions();
        Ok(FileMetadata {
            path: self.path.clone(),
            basename: self.basename(),
            name: self.name(),
            ext: self.ext(),
            dir: self.dir().to_path_buf(),
            size: self.size()?,
            mime_type: self.mime_type(),
            width: dimensions.as_ref().map(|d| d.width),
            height: dimensions.as_ref().map(|d| d.height),
        })
    }

    /// Delete the file from disk.
    ///
    /// Returns `false` when the file was already gone.
    pub fn delete(&self) -> TransitResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Deleted file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TransitError::io(
                format!("Failed to delete {}", self.path.display()),
                e,
            )),
        }
    }

    /// Rename the file within its directory, keeping the extension.
    pub fn rename(&self, name: &str, overwrite: bool) -> TransitResult<FileHandle> {
        let target = find_destination(self.dir(), name, &self.ext(), overwrite);
        self.relocate(&target)
    }

    /// Move the file into another directory, keeping its name.
    pub fn move_to(&self, dir: &Path, overwrite: bool) -> TransitResult<FileHandle> {
        let target = find_destination(dir, &self.name(), &self.ext(), overwrite);
        self.relocate(&target)
    }

    fn relocate(&self, target: &Path) -> TransitResult<FileHandle> {
        if target == self.path {
            return Ok(self.clone());
        }

        if fs::rename(&self.path, target).is_err() {
            // rename fails across filesystems; fall back to copy + remove
            fs::copy(&self.path, target).map_err(|e| {
                TransitError::io(
                    format!(
                        "Failed to move {} to {}",
                        self.path.display(),
                        target.display()
                    ),
                    e,
                )
            })?;
            fs::remove_file(&self.path).map_err(|e| {
                TransitError::io(format!("Failed to remove {}", self.path.display()), e)
            })?;
        }

        FileHandle::new(target)
    }

    fn sniff_image_format(&self) -> Option<image::ImageFormat> {
        let mut buf = [0u8; SNIFF_LEN];
        let mut file = fs::File::open(&self.path).ok()?;
        let mut read = 0;
        while read < SNIFF_LEN {
            match file.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(_) => return None,
            }
        }
        image::guess_format(&buf[..read]).ok()
    }
}

impl Display for FileHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.path.display())
    }
}

impl AsRef<Path> for FileHandle {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
