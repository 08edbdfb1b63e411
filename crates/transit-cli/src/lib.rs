use serde::Serialize;
use transit::{FileMetadata, LogLevel, ResizeDimensions, Transit, TransitError, TransitResult};

/// What a pipeline run produced, printed as JSON by the binary.
#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    pub original: Option<FileMetadata>,
    pub transformed: Vec<FileMetadata>,
    /// One per file, in the order they were transported
    pub locations: Vec<String>,
}

impl PipelineReport {
    /// Snapshot the files a pipeline currently holds.
    ///
    /// Must run before `transport`, which removes the local copies.
    pub fn collect(transit: &Transit) -> TransitResult<Self> {
        let original = transit
            .original_file()
            .map(|file| file.metadata())
            .transpose()?;
        let transformed = transit
            .transformed_files()
            .iter()
            .map(|file| file.metadata())
            .collect::<TransitResult<Vec<_>>>()?;

        Ok(Self {
            original,
            transformed,
            locations: Vec::new(),
        })
    }
}

/// Parse a `WxH`, `Wx` or `xH` resize argument.
pub fn parse_dimensions(value: &str) -> anyhow::Result<ResizeDimensions> {
    ResizeDimensions::parse(value)
        .map_err(|e| anyhow::anyhow!("Invalid resize argument '{}': {}", value, e))
}

/// Log a pipeline error at the level its kind calls for.
pub fn log_error(err: &TransitError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code = err.error_code(), error = %err, "Pipeline failed"),
        LogLevel::Warn => tracing::warn!(code = err.error_code(), error = %err, "Pipeline failed"),
        LogLevel::Error => tracing::error!(code = err.error_code(), error = %err, "Pipeline failed"),
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
