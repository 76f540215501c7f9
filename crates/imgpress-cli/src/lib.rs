//! Building blocks for the `imgpress` binary: tracing setup, loading files from
//! disk, writing results to a directory and the JSON report.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use imgpress_core::{
    CompressionSettings, DownloadSink, ImageFile, ImageRecord, ImageStatus, OutputFormat,
    PressError, PressResult,
};
use imgpress_processing::{content_type_for_path, format_file_size};

/// MIME type given to files whose extension is not a supported image type;
/// ingestion rejects them.
const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Read a file from disk, guessing its MIME type from the extension
pub async fn load_file(path: &Path) -> anyhow::Result<ImageFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;
    let content_type = content_type_for_path(path).unwrap_or(UNKNOWN_CONTENT_TYPE);
    Ok(ImageFile::new(name, content_type, data))
}

/// Writes downloaded images into a directory under their current names
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create the directory if needed
    pub async fn create(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, file: &ImageFile) -> PressResult<()> {
        // Only the final component, so a crafted name cannot escape the directory
        let name = Path::new(&file.name)
            .file_name()
            .ok_or_else(|| PressError::InvalidInput(format!("Invalid file name: {}", file.name)))?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, &file.data).await?;
        tracing::info!(path = %path.display(), size = file.size(), "Saved compressed image");
        Ok(())
    }
}

/// Command-line values that take precedence over the environment
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub quality: Option<f32>,
    pub max_size_mb: Option<f64>,
    pub max_dimension: Option<u32>,
    pub format: Option<OutputFormat>,
    pub keep_metadata: bool,
    pub no_offload: bool,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut CompressionSettings) {
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if let Some(max_size_mb) = self.max_size_mb {
            settings.max_size_mb = max_size_mb;
        }
        if let Some(max_dimension) = self.max_dimension {
            settings.max_width_or_height = Some(max_dimension);
        }
        if let Some(format) = self.format {
            settings.output_format = format;
        }
        if self.keep_metadata {
            settings.remove_metadata = false;
        }
        if self.no_offload {
            settings.offload_to_worker = false;
        }
    }
}

/// New names for `count` files: `name` itself for one file, `name_1`,
/// `name_2`, ... for several.
pub fn rename_targets(name: &str, count: usize) -> Vec<String> {
    if count == 1 {
        vec![name.to_string()]
    } else {
        (1..=count).map(|i| format!("{}_{}", name, i)).collect()
    }
}

/// One line of the JSON report
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub id: Uuid,
    pub name: String,
    pub status: ImageStatus,
    pub original_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ImageRecord> for FileReport {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id(),
            name: record.source().name.clone(),
            status: record.status(),
            original_size: format_file_size(record.source().size()),
            compressed_name: record.compressed().map(|f| f.name.clone()),
            compressed_size: record.compressed().map(|f| format_file_size(f.size())),
            ratio: record
                .compression_ratio()
                .map(|r| (r * 100.0).round() / 100.0),
            error: record.error().map(str::to_string),
        }
    }
}
