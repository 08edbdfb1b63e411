//! Transit CLI: acquire a file, validate and transform it, then optionally
//! hand it to the configured transporter.
//!
//! Settings come from the environment (see `TransitConfig`); flags override
//! them. Logs go to stderr, the JSON report to stdout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use transit::{
    create_transporter, megabytes_to_bytes, ExifTransformer, FileHandle, FileValidator, Input,
    ResizeTransformer, StreamInput, Transit, TransitConfig, TransitError, UploadDescriptor,
};
use transit_cli::{init_tracing, log_error, parse_dimensions, PipelineReport};

#[derive(Parser)]
#[command(name = "transit", about = "File upload pipeline")]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PipelineArgs {
    /// Directory files are staged in (overrides TRANSIT_TARGET_DIR)
    #[arg(long, global = true)]
    target_dir: Option<PathBuf>,

    /// Replace existing files instead of suffixing the new name
    #[arg(long, global = true)]
    overwrite: bool,

    /// Maximum file size in megabytes
    #[arg(long, global = true)]
    max_size_mb: Option<u64>,

    /// Allowed extensions, comma separated
    #[arg(long, global = true, value_delimiter = ',')]
    allow_ext: Vec<String>,

    /// Allowed mime types, comma separated (`image/*` wildcards allowed)
    #[arg(long, global = true, value_delimiter = ',')]
    allow_mime: Vec<String>,

    /// Reject files that are not images
    #[arg(long, global = true)]
    require_image: bool,

    /// Derive a resized copy, WxH (repeatable)
    #[arg(long, global = true, value_name = "WxH")]
    resize: Vec<String>,

    /// Resize the original in place, WxH
    #[arg(long, global = true, value_name = "WxH")]
    self_resize: Option<String>,

    /// Apply EXIF orientation to the original
    #[arg(long, global = true)]
    auto_orient: bool,

    /// Send the files to the transporter selected by TRANSPORTER
    #[arg(long, global = true)]
    transport: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a local file into the pipeline
    Local {
        path: PathBuf,
        /// Delete the source after copying
        #[arg(long)]
        delete_source: bool,
    },
    /// Download a file over HTTP(S)
    Remote { url: String },
    /// Read the file body from stdin
    Stream {
        /// File name to store the body under
        #[arg(long)]
        name: String,
    },
    /// Finalize a form upload described by a JSON file
    Upload {
        /// JSON with tmp_name, name, error, size and type
        descriptor: PathBuf,
    },
    /// Print metadata for a file
    Info { path: PathBuf },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

fn load_config(args: &PipelineArgs) -> anyhow::Result<TransitConfig> {
    let mut config = TransitConfig::from_env()?;
    if let Some(ref dir) = args.target_dir {
        config.target_dir = dir.clone();
    }
    if args.overwrite {
        config.overwrite = true;
    }
    if let Some(mb) = args.max_size_mb {
        config.max_file_size_bytes = megabytes_to_bytes(mb)?;
    }
    if !args.allow_ext.is_empty() {
        config.allowed_extensions = args.allow_ext.clone();
    }
    if !args.allow_mime.is_empty() {
        config.allowed_mime_types = args.allow_mime.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_descriptor(path: &Path) -> anyhow::Result<UploadDescriptor> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid upload descriptor {}", path.display()))
}

async fn build(
    input: Input,
    args: &PipelineArgs,
    config: &TransitConfig,
) -> anyhow::Result<Transit> {
    let mut transit = Transit::from_config(input, config)?;

    if args.require_image {
        transit.set_validator(FileValidator::from_config(config).require_image());
    }
    for value in &args.resize {
        transit.add_transformer(ResizeTransformer::new(parse_dimensions(value)?));
    }
    if args.auto_orient {
        transit.add_self_transformer(ExifTransformer::new());
    }
    if let Some(ref value) = args.self_resize {
        transit.add_self_transformer(ResizeTransformer::new(parse_dimensions(value)?));
    }
    if args.transport {
        let transporter = create_transporter(config)
            .await
            .context("Failed to create transporter")?;
        transit.set_transporter(transporter);
    }

    Ok(transit)
}

async fn run(
    transit: &mut Transit,
    acquire: Acquire,
    overwrite: bool,
) -> Result<PipelineReport, TransitError> {
    match acquire {
        Acquire::Local { delete_source } => {
            transit.import_from_local(overwrite, delete_source).await?;
        }
        Acquire::Remote => {
            transit.import_from_remote(overwrite).await?;
        }
        Acquire::Stream => {
            transit.import_from_stream(overwrite).await?;
        }
        Acquire::Upload => {
            transit.upload(overwrite).await?;
        }
    }

    transit.transform().await?;

    let mut report = PipelineReport::collect(transit)?;
    if transit.has_transporter() {
        report.locations = transit.transport().await?;
    }
    Ok(report)
}

enum Acquire {
    Local { delete_source: bool },
    Remote,
    Stream,
    Upload,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let (input, acquire) = match cli.command {
        Commands::Info { path } => {
            let file = FileHandle::new(&path)?;
            return print_json(&file.metadata()?);
        }
        Commands::Local {
            path,
            delete_source,
        } => (Input::Local(path), Acquire::Local { delete_source }),
        Commands::Remote { url } => (Input::Remote(url), Acquire::Remote),
        Commands::Stream { name } => {
            let params = HashMap::from([("name".to_string(), name)]);
            (
                Input::Stream(StreamInput::new("name", params, tokio::io::stdin())),
                Acquire::Stream,
            )
        }
        Commands::Upload { descriptor } => {
            (Input::Upload(read_descriptor(&descriptor)?), Acquire::Upload)
        }
    };

    let config = load_config(&cli.pipeline)?;
    let mut transit = build(input, &cli.pipeline, &config).await?;

    match run(&mut transit, acquire, config.overwrite).await {
        Ok(report) => print_json(&report),
        Err(e) => {
            log_error(&e);
            Err(e.into())
        }
    }
}
