use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use transit_core::{FileHandle, TransitError, TransitResult};

use super::{destination_for, Importer};

const MAX_REDIRECTS: usize = 5;
const DEFAULT_REMOTE_NAME: &str = "remote";

/// Downloads a file over HTTP(S)
#[derive(Debug, Clone)]
pub struct RemoteImporter {
    url: String,
    timeout: Duration,
}

impl RemoteImporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

/// File name for a download: the last path segment, with an extension taken
/// from the content type when the segment has none.
pub(crate) fn remote_file_name(url: &Url, content_type: &str) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| {
            urlencoding::decode(name)
                .map(|n| n.into_owned())
                .unwrap_or_else(|_| name.to_string())
        })
        .unwrap_or_else(|| DEFAULT_REMOTE_NAME.to_string());

    let has_extension = segment
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty());
    if has_extension {
        return segment;
    }

    match extension_for(content_type) {
        Some(ext) => format!("{}.{}", segment.trim_end_matches('.'), ext),
        None => segment,
    }
}

/// Preferred extension for a mime type, favouring one equal to the subtype
fn extension_for(content_type: &str) -> Option<String> {
    let extensions = mime_guess::get_mime_extensions_str(content_type)?;
    let subtype = content_type.split_once('/').map(|(_, sub)| sub)?;
    extensions
        .iter()
        .find(|ext| **ext == subtype)
        .or_else(|| extensions.first())
        .map(|ext| ext.to_string())
}

async fn write_body(response: &mut reqwest::Response, target: &Path) -> TransitResult<u64> {
    let mut file = fs::File::create(target)
        .await
        .map_err(|e| TransitError::io(format!("Failed to create {}", target.display()), e))?;

    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransitError::io("Failed to read response body", e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| TransitError::io(format!("Failed to write {}", target.display()), e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| TransitError::io(format!("Failed to write {}", target.display()), e))?;
    Ok(written)
}

#[async_trait]
impl Importer for RemoteImporter {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn import(&mut self, dir: &Path, overwrite: bool) -> TransitResult<FileHandle> {
        let url = self.url.trim();
        let parsed = Url::parse(url)
            .map_err(|e| TransitError::io(format!("Invalid URL {}", url), e))?;

        // Only allow HTTP/HTTPS
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(TransitError::Io(format!(
                "Only HTTP and HTTPS URLs are allowed: {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| TransitError::io("Failed to create HTTP client", e))?;

        let start = std::time::Instant::now();

        let mut response = client
            .get(parsed.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Failed to download from URL");
                TransitError::io(format!("Failed to download {}", url), e)
            })?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("application/octet-stream")
            .split(';')
            .next()
            .unwrap_or("application/octet-stream")
            .trim()
            .to_lowercase();

        let target: PathBuf =
            destination_for(dir, &remote_file_name(&parsed, &content_type), overwrite);

        let size = match write_body(&mut response, &target).await {
            Ok(size) => size,
            Err(e) => {
                // Drop the partial download
                let _ = fs::remove_file(&target).await;
                return Err(e);
            }
        };

        tracing::info!(
            url = %url,
            path = %target.display(),
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Imported remote file"
        );

        FileHandle::new(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::tempdir;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_remote_file_name() {
        assert_eq!(
            remote_file_name(&url("https://example.com/img/cat.jpg?size=2"), "image/png"),
            "cat.jpg"
        );
        assert_eq!(
            remote_file_name(&url("https://example.com/my%20photo.png"), "image/png"),
            "my photo.png"
        );
        assert_eq!(
            remote_file_name(&url("https://example.com/download"), "image/png"),
            "download.png"
        );
        assert_eq!(
            remote_file_name(&url("https://example.com/"), "image/jpeg"),
            "remote.jpeg"
        );
        assert_eq!(
            remote_file_name(&url("https://example.com/blob"), "application/x-unknown-thing"),
            "blob"
        );
    }

    #[tokio::test]
    async fn test_download() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/files/report");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("%PDF-1.4 test");
        });

        let dir = tempdir().unwrap();
        let file = RemoteImporter::new(server.url("/files/report"), Duration::from_secs(5))
            .import(dir.path(), false)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(file.basename(), "report.pdf");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_follows_redirect_keeping_requested_name() {
        let server = MockServer::start_async().await;
        let moved = server.mock(|when, then| {
            when.method(GET).path("/old/avatar.png");
            then.status(302)
                .header("location", server.url("/cdn/object-7f3a"));
        });
        let target = server.mock(|when, then| {
            when.method(GET).path("/cdn/object-7f3a");
            then.status(200)
                .header("content-type", "image/png")
                .body("png bytes");
        });

        let dir = tempdir().unwrap();
        let file = RemoteImporter::new(server.url("/old/avatar.png"), Duration::from_secs(5))
            .import(dir.path(), false)
            .await
            .unwrap();

        moved.assert();
        target.assert();
        assert_eq!(file.basename(), "avatar.png");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_redirect_chain_over_limit_fails() {
        let server = MockServer::start_async().await;
        let hops = MAX_REDIRECTS + 3;
        for hop in 0..hops {
            let next = server.url(format!("/hop/{}", hop + 1));
            server.mock(|when, then| {
                when.method(GET).path(format!("/hop/{}", hop));
                then.status(302).header("location", next);
            });
        }
        server.mock(|when, then| {
            when.method(GET).path(format!("/hop/{}", hops));
            then.status(200).body("finally");
        });

        let dir = tempdir().unwrap();
        let result = RemoteImporter::new(server.url("/hop/0"), Duration::from_secs(5))
            .import(dir.path(), false)
            .await;

        assert!(matches!(result, Err(TransitError::Io(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_error_status_leaves_nothing() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/missing.txt");
            then.status(404);
        });

        let dir = tempdir().unwrap();
        let result = RemoteImporter::new(server.url("/missing.txt"), Duration::from_secs(5))
            .import(dir.path(), false)
            .await;

        assert!(matches!(result, Err(TransitError::Io(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_other_schemes() {
        let dir = tempdir().unwrap();
        let result = RemoteImporter::new("ftp://example.com/a.txt", Duration::from_secs(5))
            .import(dir.path(), false)
            .await;
        assert!(matches!(result, Err(TransitError::Io(_))));
    }
}
