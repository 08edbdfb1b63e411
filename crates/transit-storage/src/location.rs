//! Object key building and location parsing shared by the transport backends.

use url::Url;

use crate::traits::{TransportError, TransportResult};

/// Build the object key for a file: `{folder}/{basename}`, or just `{basename}`.
pub fn object_key(folder: Option<&str>, basename: &str) -> String {
    match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/{}", folder, basename),
        None => basename.to_string(),
    }
}

/// Bucket and key addressed by an S3 location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// `None` for raw keys, which belong to the configured bucket
    pub bucket: Option<String>,
    pub key: String,
}

/// Resolve a raw key or an S3 URL into bucket and key.
///
/// Handles path-style (`https://s3.amazonaws.com/bucket/key`, also custom
/// endpoints such as MinIO) and virtual-hosted-style
/// (`https://bucket.s3.amazonaws.com/key`, `https://bucket.s3.eu-west-1.amazonaws.com/key`)
/// URLs. Key segments are percent-decoded.
pub fn parse_s3_location(location: &str) -> TransportResult<S3Location> {
    let location = location.trim();
    if location.is_empty() {
        return Err(TransportError::InvalidLocation("empty location".to_string()));
    }

    let url = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            return Err(TransportError::InvalidLocation(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                location
            )))
        }
        // Not a URL: treat as a key in the default bucket
        Err(_) => {
            return Ok(S3Location {
                bucket: None,
                key: decode(location.trim_start_matches('/'))?,
            })
        }
    };

    let host = url
        .host_str()
        .ok_or_else(|| TransportError::InvalidLocation(format!("missing host in {}", location)))?;
    let path = decode(url.path().trim_start_matches('/'))?;

    let (bucket, key) = match virtual_hosted_bucket(host) {
        Some(bucket) => (bucket.to_string(), path),
        None => match path.split_once('/') {
            Some((bucket, key)) => (bucket.to_string(), key.to_string()),
            None => (path, String::new()),
        },
    };

    if bucket.is_empty() || key.is_empty() {
        return Err(TransportError::InvalidLocation(format!(
            "no bucket and key in {}",
            location
        )));
    }

    Ok(S3Location {
        bucket: Some(bucket),
        key,
    })
}

/// Bucket prefix of an AWS virtual-hosted host (`bucket.s3[.-]region.amazonaws.com`)
fn virtual_hosted_bucket(host: &str) -> Option<&str> {
    if !host.ends_with(".amazonaws.com") {
        return None;
    }
    let idx = host.find(".s3.").or_else(|| host.find(".s3-"))?;
    Some(&host[..idx])
}

fn decode(raw: &str) -> TransportResult<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| TransportError::InvalidLocation(format!("{}: {}", raw, e)))
}
