use crate::location::{object_key, parse_s3_location};
use crate::traits::{TransportError, TransportResult, Transporter};
use crate::TransporterBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use transit_core::FileHandle;

const DEFAULT_REGION: &str = "us-east-1";

/// S3 transporter
///
/// Uploads files with `object_store` and reports path-style URLs
/// (`{endpoint}/{bucket}/{key}`).
#[derive(Clone)]
pub struct S3Transporter {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    folder: Option<String>,
}

impl S3Transporter {
    /// Create a new S3Transporter
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `folder` - Optional key prefix
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        folder: Option<String>,
    ) -> TransportResult<Self> {
        let store = Self::build_store(&bucket, &region, endpoint_url.as_deref())?;

        Ok(S3Transporter {
            store,
            bucket,
            region,
            endpoint_url,
            folder,
        })
    }

    fn build_store(bucket: &str, region: &str, endpoint: Option<&str>) -> TransportResult<AmazonS3> {
        // Credentials come from the standard AWS environment variables
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket);

        if let Some(endpoint) = endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        builder
            .build()
            .map_err(|e| TransportError::ConfigError(e.to_string()))
    }

    /// Store for `bucket`, reusing the configured one when it matches
    fn store_for(&self, bucket: &str) -> TransportResult<AmazonS3> {
        if bucket == self.bucket {
            Ok(self.store.clone())
        } else {
            Self::build_store(bucket, &self.region, self.endpoint_url.as_deref())
        }
    }

    /// Endpoint used in returned URLs
    pub fn endpoint(&self) -> String {
        match self.endpoint_url {
            Some(ref endpoint) => endpoint.trim_end_matches('/').to_string(),
            None if self.region == DEFAULT_REGION => "https://s3.amazonaws.com".to_string(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        }
    }

    /// Generate public URL for an object in the configured bucket
    pub fn generate_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint(), self.bucket, key)
    }

    /// Split a location into bucket and key.
    ///
    /// URLs under the configured endpoint are matched first so custom
    /// endpoints with a path prefix resolve too.
    fn resolve(&self, location: &str) -> TransportResult<(String, String)> {
        let own_prefix = format!("{}/", self.endpoint());
        if let Some((bucket, key)) = location
            .trim()
            .strip_prefix(&own_prefix)
            .and_then(|rest| rest.split_once('/'))
            .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
        {
            let key = urlencoding::decode(key)
                .map_err(|e| TransportError::InvalidLocation(format!("{}: {}", location, e)))?;
            return Ok((bucket.to_string(), key.into_owned()));
        }

        let parsed = parse_s3_location(location)?;
        Ok((
            parsed.bucket.unwrap_or_else(|| self.bucket.clone()),
            parsed.key,
        ))
    }
}

#[async_trait]
impl Transporter for S3Transporter {
    async fn transport(&self, file: FileHandle) -> TransportResult<String> {
        let key = object_key(self.folder.as_deref(), &file.basename());
        let data = tokio::fs::read(file.path()).await?;
        let size = data.len() as u64;
        let location = Path::from(key.clone());

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            TransportError::UploadFailed(e.to_string())
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        if let Err(e) = tokio::fs::remove_file(file.path()).await {
            tracing::warn!(
                error = %e,
                path = %file.path().display(),
                "Failed to remove local file after upload"
            );
        }

        Ok(url)
    }

    async fn delete(&self, location: &str) -> bool {
        let (bucket, key) = match self.resolve(location) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(error = %e, location = %location, "Cannot resolve S3 location");
                return false;
            }
        };

        let store = match self.store_for(&bucket) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, bucket = %bucket, "Failed to build S3 client");
                return false;
            }
        };

        let start = std::time::Instant::now();
        let result: ObjectResult<_> = store.delete(&Path::from(key.clone())).await;

        match result {
            Ok(_) => {
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete successful"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                false
            }
        }
    }

    fn backend_type(&self) -> TransporterBackend {
        TransporterBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transporter(region: &str, endpoint: Option<&str>) -> S3Transporter {
        S3Transporter::new(
            "mybucket".to_string(),
            region.to_string(),
            endpoint.map(String::from),
            Some("uploads".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_defaults() {
        assert_eq!(
            transporter("us-east-1", None).generate_url("uploads/a.jpg"),
            "https://s3.amazonaws.com/mybucket/uploads/a.jpg"
        );
        assert_eq!(
            transporter("eu-west-1", None).generate_url("a.jpg"),
            "https://s3.eu-west-1.amazonaws.com/mybucket/a.jpg"
        );
        assert_eq!(
            transporter("us-east-1", Some("http://localhost:9000/")).generate_url("a.jpg"),
            "http://localhost:9000/mybucket/a.jpg"
        );
    }

    #[test]
    fn test_resolve_locations() {
        let s3 = transporter("us-east-1", Some("http://minio.local/s3"));

        assert_eq!(
            s3.resolve("http://minio.local/s3/mybucket/uploads/a.jpg").unwrap(),
            ("mybucket".to_string(), "uploads/a.jpg".to_string())
        );
        assert_eq!(
            s3.resolve("https://other.s3.amazonaws.com/path/to/key.jpg").unwrap(),
            ("other".to_string(), "path/to/key.jpg".to_string())
        );
        assert_eq!(
            s3.resolve("uploads/a.jpg").unwrap(),
            ("mybucket".to_string(), "uploads/a.jpg".to_string())
        );
        assert!(s3.resolve("").is_err());
    }

    #[test]
    fn test_backend_type() {
        assert_eq!(transporter("us-east-1", None).backend_type(), TransporterBackend::S3);
    }
}
