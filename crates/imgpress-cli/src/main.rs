//! imgpress: compress images from the command line.
//!
//! Defaults come from IMGPRESS_* environment variables (and `.env`); flags
//! override them.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use imgpress_cli::{
    init_tracing, load_file, rename_targets, DirectorySink, FileReport, SettingsOverrides,
};
use imgpress_core::{OutputFormat, PressConfig};
use imgpress_processing::{DataUriPreview, PreviewGenerator};
use imgpress_worker::{ImageCoordinator, RejectedFile};

#[derive(Parser)]
#[command(name = "imgpress", about = "Compress JPEG, PNG, GIF, BMP and WebP images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress files and write the results to a directory
    Compress {
        /// Images to compress
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory for compressed files
        #[arg(long, default_value = "compressed")]
        out_dir: PathBuf,
        /// Encoder quality in (0, 1]
        #[arg(long)]
        quality: Option<f32>,
        /// Target size ceiling in megabytes
        #[arg(long)]
        max_size_mb: Option<f64>,
        /// Longest edge in pixels
        #[arg(long)]
        max_dimension: Option<u32>,
        /// Output format: auto, jpeg, png or webp
        #[arg(long)]
        format: Option<String>,
        /// Keep EXIF metadata
        #[arg(long)]
        keep_metadata: bool,
        /// Compress on the async runtime instead of the blocking pool
        #[arg(long)]
        no_offload: bool,
        /// Rename outputs (NAME for one file, NAME_1, NAME_2, ... for several)
        #[arg(long, value_name = "NAME")]
        rename: Option<String>,
    },
    /// Print the data URI preview of an image
    Preview {
        /// Image to preview
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct CompressReport {
    out_dir: PathBuf,
    saved: usize,
    files: Vec<FileReport>,
    rejected: Vec<RejectedFile>,
    dropped: Vec<RejectedFile>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compress {
            files,
            out_dir,
            quality,
            max_size_mb,
            max_dimension,
            format,
            keep_metadata,
            no_offload,
            rename,
        } => {
            let mut config = PressConfig::from_env().context("Failed to load configuration")?;

            let format = format
                .as_deref()
                .map(OutputFormat::parse)
                .transpose()
                .context("Invalid --format")?;
            SettingsOverrides {
                quality,
                max_size_mb,
                max_dimension,
                format,
                keep_metadata,
                no_offload,
            }
            .apply(&mut config.settings);
            config.validate()?;

            let mut sources = Vec::with_capacity(files.len());
            for path in &files {
                sources.push(load_file(path).await?);
            }

            let coordinator = ImageCoordinator::from_config(&config);
            let ingest = coordinator.ingest(sources).await;
            if !config.auto_compress() {
                coordinator.compress_all().await;
            }
            coordinator.settled().await;

            if let Some(name) = rename {
                for (id, new_name) in ingest
                    .accepted
                    .iter()
                    .zip(rename_targets(&name, ingest.accepted.len()))
                {
                    coordinator.rename(*id, &new_name)?;
                }
            }

            let sink = DirectorySink::create(&out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            let saved = coordinator.download_all(&sink).await;

            let records = coordinator.records();
            print_json(&CompressReport {
                out_dir: sink.dir().to_path_buf(),
                saved,
                files: records.iter().map(FileReport::from).collect(),
                rejected: ingest.rejected,
                dropped: ingest.dropped,
            })?;
        }
        Commands::Preview { file } => {
            let source = load_file(&file).await?;
            let preview = DataUriPreview::new()
                .preview(&source)
                .await
                .with_context(|| format!("Failed to preview {}", file.display()))?;
            println!("{}", preview);
        }
    }

    Ok(())
}
