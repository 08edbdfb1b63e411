use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use transit_core::{FileHandle, TransitError, TransitResult};

use super::{destination_for, Importer};
use crate::input::StreamInput;

/// Writes a raw request body to disk under the name given by a parameter
pub struct StreamImporter<'a> {
    input: &'a mut StreamInput,
}

impl<'a> StreamImporter<'a> {
    pub fn new(input: &'a mut StreamInput) -> Self {
        Self { input }
    }
}

#[async_trait]
impl Importer for StreamImporter<'_> {
    fn kind(&self) -> &'static str {
        "stream"
    }

    async fn import(&mut self, dir: &Path, overwrite: bool) -> TransitResult<FileHandle> {
        let raw_name = self
            .input
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| {
                TransitError::Io(format!(
                    "Missing stream parameter '{}'",
                    self.input.field
                ))
            })?;

        let mut body = self
            .input
            .body
            .take()
            .ok_or_else(|| TransitError::Io("Stream has already been consumed".to_string()))?;

        let target = destination_for(dir, &raw_name, overwrite);
        let mut file = fs::File::create(&target)
            .await
            .map_err(|e| TransitError::io(format!("Failed to create {}", target.display()), e))?;

        let copied = match tokio::io::copy(&mut body, &mut file).await {
            Ok(bytes) => file.flush().await.map(|_| bytes),
            Err(e) => Err(e),
        };

        let size = match copied {
            Ok(size) => size,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&target).await;
                return Err(TransitError::io(
                    format!("Failed to write stream to {}", target.display()),
                    e,
                ));
            }
        };

        tracing::info!(
            path = %target.display(),
            size_bytes = size,
            "Imported stream"
        );

        FileHandle::new(&target)
    }
}
