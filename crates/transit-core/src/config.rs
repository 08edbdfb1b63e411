//! Configuration module
//!
//! Pipeline settings are read from the environment (a `.env` file is honoured
//! through `dotenvy`). Every variable has a default except the transporter
//! settings, which are only required once a transporter backend is selected.

use std::env;
use std::path::PathBuf;

use crate::transporter_types::TransporterBackend;

const TARGET_DIR: &str = "./uploads";
const MAX_FILE_SIZE_MB: u64 = 10;
const REMOTE_TIMEOUT_SECS: u64 = 30;

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct TransitConfig {
    /// Directory acquired and transformed files are staged in
    pub target_dir: PathBuf,
    pub overwrite: bool,
    /// When set, uploaded temp files must live below this directory
    pub upload_root: Option<PathBuf>,
    pub max_file_size_bytes: u64,
    /// Empty means any extension is accepted
    pub allowed_extensions: Vec<String>,
    /// Empty means any mime type is accepted; `image/*` style wildcards allowed
    pub allowed_mime_types: Vec<String>,
    pub remote_timeout_secs: u64,
    pub transporter: Option<TransporterBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_folder: Option<String>,
    pub local_transport_path: Option<PathBuf>,
    pub local_transport_base_url: Option<String>,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from(TARGET_DIR),
            overwrite: false,
            upload_root: None,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: Vec::new(),
            allowed_mime_types: Vec::new(),
            remote_timeout_secs: REMOTE_TIMEOUT_SECS,
            transporter: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_folder: None,
            local_transport_path: None,
            local_transport_base_url: None,
        }
    }
}

fn parse_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_bool(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TransitConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_file_size_mb = match non_empty(lookup("TRANSIT_MAX_FILE_SIZE_MB")) {
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("TRANSIT_MAX_FILE_SIZE_MB must be a valid number"))?,
            None => MAX_FILE_SIZE_MB,
        };

        let remote_timeout_secs = match non_empty(lookup("TRANSIT_REMOTE_TIMEOUT_SECS")) {
            Some(v) => v.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("TRANSIT_REMOTE_TIMEOUT_SECS must be a valid number")
            })?,
            None => REMOTE_TIMEOUT_SECS,
        };

        let transporter = non_empty(lookup("TRANSPORTER"))
            .map(|v| v.parse::<TransporterBackend>())
            .transpose()?;

        Ok(TransitConfig {
            target_dir: non_empty(lookup("TRANSIT_TARGET_DIR"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(TARGET_DIR)),
            overwrite: parse_bool(lookup("TRANSIT_OVERWRITE")),
            upload_root: non_empty(lookup("TRANSIT_UPLOAD_ROOT")).map(PathBuf::from),
            max_file_size_bytes: megabytes_to_bytes(max_file_size_mb)?,
            allowed_extensions: parse_list(lookup("TRANSIT_ALLOWED_EXTENSIONS")),
            allowed_mime_types: parse_list(lookup("TRANSIT_ALLOWED_MIME_TYPES")),
            remote_timeout_secs,
            transporter,
            s3_bucket: non_empty(lookup("S3_BUCKET")),
            s3_region: non_empty(lookup("S3_REGION")).or_else(|| non_empty(lookup("AWS_REGION"))),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            s3_folder: non_empty(lookup("S3_FOLDER")),
            local_transport_path: non_empty(lookup("LOCAL_TRANSPORT_PATH")).map(PathBuf::from),
            local_transport_base_url: non_empty(lookup("LOCAL_TRANSPORT_BASE_URL")),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("TRANSIT_MAX_FILE_SIZE_MB must be greater than zero");
        }
        if self.remote_timeout_secs == 0 {
            anyhow::bail!("TRANSIT_REMOTE_TIMEOUT_SECS must be greater than zero");
        }

        match self.transporter {
            Some(TransporterBackend::S3) => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET must be set when TRANSPORTER=s3");
                }
                if self.s3_region.is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION must be set when TRANSPORTER=s3");
                }
            }
            Some(TransporterBackend::Local) => {
                if self.local_transport_path.is_none() {
                    anyhow::bail!("LOCAL_TRANSPORT_PATH must be set when TRANSPORTER=local");
                }
                if self.local_transport_base_url.is_none() {
                    anyhow::bail!("LOCAL_TRANSPORT_BASE_URL must be set when TRANSPORTER=local");
                }
            }
            None => {}
        }

        Ok(())
    }
}

/// Convert a megabyte limit to bytes, rejecting values that overflow
pub fn megabytes_to_bytes(mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("TRANSIT_MAX_FILE_SIZE_MB is too large: {}", mb))
}
