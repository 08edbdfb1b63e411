use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use transit_core::{FileHandle, TransitError, TransitResult};

use super::{destination_for, Importer};

/// Copies a file from elsewhere on this machine
#[derive(Debug, Clone)]
pub struct LocalImporter {
    source: PathBuf,
    delete_source: bool,
}

impl LocalImporter {
    pub fn new(source: impl Into<PathBuf>, delete_source: bool) -> Self {
        Self {
            source: source.into(),
            delete_source,
        }
    }
}

#[async_trait]
impl Importer for LocalImporter {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn import(&mut self, dir: &Path, overwrite: bool) -> TransitResult<FileHandle> {
        let meta = fs::metadata(&self.source).await.map_err(|e| {
            TransitError::io(
                format!("Source file does not exist: {}", self.source.display()),
                e,
            )
        })?;
        if !meta.is_file() {
            return Err(TransitError::Io(format!(
                "Source is not a regular file: {}",
                self.source.display()
            )));
        }

        let source = fs::canonicalize(&self.source).await?;
        let raw_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = destination_for(dir, &raw_name, overwrite);

        // Overwriting a file with itself would truncate it
        if target == source {
            tracing::debug!(path = %source.display(), "Source already in target directory");
            return FileHandle::new(&target);
        }

        let size = fs::copy(&source, &target).await.map_err(|e| {
            TransitError::io(
                format!("Failed to copy {} to {}", source.display(), target.display()),
                e,
            )
        })?;

        if self.delete_source {
            if let Err(e) = fs::remove_file(&source).await {
                tracing::warn!(error = %e, path = %source.display(), "Failed to delete source file");
            }
        }

        tracing::info!(
            source = %source.display(),
            path = %target.display(),
            size_bytes = size,
            "Imported local file"
        );

        FileHandle::new(&target)
    }
}
