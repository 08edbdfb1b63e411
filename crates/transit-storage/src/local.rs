use crate::location::object_key;
use crate::traits::{TransportError, TransportResult, Transporter};
use crate::TransporterBackend;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use transit_core::{find_destination, FileHandle};

/// Local filesystem transporter
///
/// Copies files below `base_path` and reports `{base_url}/{key}` locations.
#[derive(Clone)]
pub struct LocalTransporter {
    base_path: PathBuf,
    base_url: String,
    folder: Option<String>,
    overwrite: bool,
}

impl LocalTransporter {
    /// Create a new LocalTransporter
    ///
    /// # Arguments
    /// * `base_path` - Root directory files are copied into (e.g., "/var/www/media")
    /// * `base_url` - Base URL the directory is served under (e.g., "http://localhost:8080/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> TransportResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            TransportError::ConfigError(format!(
                "Failed to create transport directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_path = base_path.canonicalize().map_err(|e| {
            TransportError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        Ok(LocalTransporter {
            base_path,
            base_url,
            folder: None,
            overwrite: false,
        })
    }

    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder;
        self
    }

    /// Replace existing files instead of suffixing the new name
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Convert object key to filesystem path, refusing keys that escape the base
    fn key_to_path(&self, key: &str) -> TransportResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(TransportError::InvalidKey(format!(
                "Key contains invalid characters: {}",
                key
            )));
        }

        let path = self.base_path.join(key);

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&self.base_path).is_err() {
                return Err(TransportError::InvalidKey(
                    "Key resolves outside transport directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Generate public URL for a key
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Map a location returned by `transport` (or a raw key) back to a key
    fn location_to_key(&self, location: &str) -> TransportResult<String> {
        let prefix = format!("{}/", self.base_url.trim_end_matches('/'));
        let raw = location.strip_prefix(&prefix).unwrap_or(location);
        urlencoding::decode(raw)
            .map(|k| k.into_owned())
            .map_err(|e| TransportError::InvalidLocation(format!("{}: {}", location, e)))
    }
}

#[async_trait]
impl Transporter for LocalTransporter {
    async fn transport(&self, file: FileHandle) -> TransportResult<String> {
        let dir = match self
            .folder
            .as_deref()
            .map(|f| f.trim_matches('/'))
            .filter(|f| !f.is_empty())
        {
            Some(folder) => self.key_to_path(folder)?,
            None => self.base_path.clone(),
        };
        fs::create_dir_all(&dir).await?;

        let target = find_destination(&dir, &file.name(), &file.ext(), self.overwrite);
        let basename = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransportError::InvalidKey(target.display().to_string()))?;
        let key = object_key(self.folder.as_deref(), &basename);
        let path = self.key_to_path(&key)?;

        let start = std::time::Instant::now();

        let size = fs::copy(file.path(), &path).await.map_err(|e| {
            TransportError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                file.path().display(),
                path.display(),
                e
            ))
        })?;

        if let Err(e) = fs::remove_file(file.path()).await {
            tracing::warn!(
                error = %e,
                path = %file.path().display(),
                "Failed to remove local file after transport"
            );
        }

        let url = self.generate_url(&key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local transport successful"
        );

        Ok(url)
    }

    async fn delete(&self, location: &str) -> bool {
        let path = match self
            .location_to_key(location)
            .and_then(|key| self.key_to_path(&key))
        {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, location = %location, "Cannot resolve local location");
                return false;
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Local transport delete successful");
                true
            }
            // Already gone
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Local transport delete failed"
                );
                false
            }
        }
    }

    fn backend_type(&self) -> TransporterBackend {
        TransporterBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn staged(dir: &Path, name: &str, body: &[u8]) -> FileHandle {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        FileHandle::new(path).unwrap()
    }

    #[tokio::test]
    async fn test_transport_and_delete() {
        let staging = tempdir().unwrap();
        let target = tempdir().unwrap();
        let transporter =
            LocalTransporter::new(target.path(), "http://cdn.test/media/".to_string())
                .await
                .unwrap()
                .with_folder(Some("uploads".to_string()));

        let file = staged(staging.path(), "a.txt", b"hello");
        let url = transporter.transport(file).await.unwrap();

        assert_eq!(url, "http://cdn.test/media/uploads/a.txt");
        assert!(!staging.path().join("a.txt").exists());
        let copied = target.path().join("uploads/a.txt");
        assert_eq!(std::fs::read(&copied).unwrap(), b"hello");

        assert!(transporter.delete(&url).await);
        assert!(!copied.exists());
    }

    #[tokio::test]
    async fn test_transport_suffixes_collisions() {
        let staging = tempdir().unwrap();
        let target = tempdir().unwrap();
        let transporter = LocalTransporter::new(target.path(), "http://cdn.test".to_string())
            .await
            .unwrap();

        let first = transporter
            .transport(staged(staging.path(), "a.txt", b"1"))
            .await
            .unwrap();
        let second = transporter
            .transport(staged(staging.path(), "a.txt", b"2"))
            .await
            .unwrap();

        assert_eq!(first, "http://cdn.test/a.txt");
        assert_eq!(second, "http://cdn.test/a-1.txt");

        // raw keys are accepted too
        assert!(transporter.delete("a-1.txt").await);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let target = tempdir().unwrap();
        let transporter = LocalTransporter::new(target.path(), "http://cdn.test".to_string())
            .await
            .unwrap();

        assert!(transporter.key_to_path("../etc/passwd").is_err());
        assert!(transporter.key_to_path("/etc/passwd").is_err());
        assert!(!transporter.delete("http://cdn.test/../secret").await);
    }

    #[tokio::test]
    async fn test_traversing_folder_fails_transport() {
        let staging = tempdir().unwrap();
        let target = tempdir().unwrap();
        let transporter = LocalTransporter::new(target.path(), "http://cdn.test".to_string())
            .await
            .unwrap()
            .with_folder(Some("../outside".to_string()));

        let result = transporter
            .transport(staged(staging.path(), "a.txt", b"x"))
            .await;
        assert!(matches!(result, Err(TransportError::InvalidKey(_))));
        assert!(staging.path().join("a.txt").exists());
    }
}
