//! Finalizing form uploads.

use std::path::{Path, PathBuf};

use tokio::fs;
use transit_core::{FileHandle, TransitError, TransitResult, ValidationError};

use crate::import::destination_for;
use crate::input::{UploadDescriptor, UploadErrorCode};

/// Check an upload descriptor and return the temp file it points at.
///
/// The temp file must be an existing regular file and, when `upload_root` is
/// set, must live below it.
pub fn check_descriptor(
    descriptor: &UploadDescriptor,
    upload_root: Option<&Path>,
) -> Result<PathBuf, ValidationError> {
    match descriptor.error_code() {
        UploadErrorCode::Ok => {}
        UploadErrorCode::NoFile => return Err(ValidationError::MissingFile),
        code => return Err(ValidationError::UploadFailed(code.message())),
    }

    if descriptor.tmp_name.trim().is_empty() {
        return Err(ValidationError::MissingFile);
    }

    let tmp = Path::new(&descriptor.tmp_name);
    let canonical = tmp
        .canonicalize()
        .ok()
        .filter(|p| p.is_file())
        .ok_or_else(|| ValidationError::NotUploaded(descriptor.tmp_name.clone()))?;

    if let Some(root) = upload_root {
        let inside = root
            .canonicalize()
            .map(|root| canonical.starts_with(root))
            .unwrap_or(false);
        if !inside {
            return Err(ValidationError::NotUploaded(format!(
                "{} is outside the upload directory",
                descriptor.tmp_name
            )));
        }
    }

    Ok(canonical)
}

/// Move the temp file into `dir` under the client-supplied name.
pub async fn finalize_upload(
    tmp: &Path,
    dir: &Path,
    client_name: &str,
    overwrite: bool,
) -> TransitResult<FileHandle> {
    let target = destination_for(dir, client_name, overwrite);

    if fs::rename(tmp, &target).await.is_err() {
        // rename fails across devices; fall back to copy + remove
        fs::copy(tmp, &target).await.map_err(|e| {
            TransitError::io(
                format!("Failed to move {} to {}", tmp.display(), target.display()),
                e,
            )
        })?;
        if let Err(e) = fs::remove_file(tmp).await {
            tracing::warn!(error = %e, path = %tmp.display(), "Failed to remove temp upload");
        }
    }

    tracing::info!(
        tmp = %tmp.display(),
        path = %target.display(),
        "Upload finalized"
    );

    FileHandle::new(&target)
}
