#[cfg(feature = "transport-local")]
use crate::LocalTransporter;
#[cfg(feature = "transport-s3")]
use crate::S3Transporter;
use crate::{TransportError, TransportResult, Transporter, TransporterBackend};
use std::sync::Arc;
use transit_core::TransitConfig;

/// Create a transporter based on configuration
pub async fn create_transporter(config: &TransitConfig) -> TransportResult<Arc<dyn Transporter>> {
    let backend = config
        .transporter
        .ok_or_else(|| TransportError::ConfigError("TRANSPORTER not configured".to_string()))?;

    match backend {
        #[cfg(feature = "transport-s3")]
        TransporterBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| TransportError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                TransportError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let transporter = S3Transporter::new(
                bucket,
                region,
                config.s3_endpoint.clone(),
                config.s3_folder.clone(),
            )?;
            Ok(Arc::new(transporter))
        }

        #[cfg(not(feature = "transport-s3"))]
        TransporterBackend::S3 => Err(TransportError::ConfigError(
            "S3 transporter not available (transport-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "transport-local")]
        TransporterBackend::Local => {
            let base_path = config.local_transport_path.clone().ok_or_else(|| {
                TransportError::ConfigError("LOCAL_TRANSPORT_PATH not configured".to_string())
            })?;
            let base_url = config.local_transport_base_url.clone().ok_or_else(|| {
                TransportError::ConfigError("LOCAL_TRANSPORT_BASE_URL not configured".to_string())
            })?;

            let transporter = LocalTransporter::new(base_path, base_url)
                .await?
                .overwrite(config.overwrite);
            Ok(Arc::new(transporter))
        }

        #[cfg(not(feature = "transport-local"))]
        TransporterBackend::Local => Err(TransportError::ConfigError(
            "Local transporter not available (transport-local feature not enabled)".to_string(),
        )),
    }
}
