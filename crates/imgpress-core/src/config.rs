//! Configuration module
//!
//! Loads the default compression settings and coordinator behavior from the
//! environment (and a `.env` file when present). Command-line flags are applied
//! on top by the binary.

use std::env;

use crate::models::{CompressionSettings, OutputFormat};

const MAX_FILE_SIZE_MB: usize = 50;

/// Process-wide configuration
#[derive(Clone, Debug)]
pub struct PressConfig {
    pub settings: CompressionSettings,
    /// Start a batch automatically whenever idle images are waiting
    pub auto_compress: bool,
    /// Ingestion ceiling for a single source file
    pub max_file_size_bytes: usize,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            settings: CompressionSettings::default(),
            auto_compress: true,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .to_lowercase()
        .parse()
        .unwrap_or(default)
}

impl PressConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = CompressionSettings::default();

        let output_format = match env::var("IMGPRESS_OUTPUT_FORMAT") {
            Ok(s) => OutputFormat::parse(&s)
                .map_err(|_| anyhow::anyhow!("IMGPRESS_OUTPUT_FORMAT must be one of auto, jpeg, png, webp"))?,
            Err(_) => defaults.output_format,
        };

        let max_width_or_height = env::var("IMGPRESS_MAX_WIDTH_OR_HEIGHT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| s.trim().parse::<u32>().ok());

        let max_file_size_mb = env::var("IMGPRESS_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let config = PressConfig {
            settings: CompressionSettings {
                quality: env::var("IMGPRESS_QUALITY")
                    .unwrap_or_else(|_| defaults.quality.to_string())
                    .parse()
                    .unwrap_or(defaults.quality),
                max_size_mb: env::var("IMGPRESS_MAX_SIZE_MB")
                    .unwrap_or_else(|_| defaults.max_size_mb.to_string())
                    .parse()
                    .unwrap_or(defaults.max_size_mb),
                max_width_or_height,
                remove_metadata: env_bool("IMGPRESS_REMOVE_METADATA", defaults.remove_metadata),
                output_format,
                offload_to_worker: env_bool(
                    "IMGPRESS_OFFLOAD_TO_WORKER",
                    defaults.offload_to_worker,
                ),
            },
            auto_compress: env_bool("IMGPRESS_AUTO_COMPRESS", true),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.settings
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid compression settings: {}", e))?;
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("IMGPRESS_MAX_FILE_SIZE_MB must be greater than zero"));
        }
        Ok(())
    }

    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    pub fn auto_compress(&self) -> bool {
        self.auto_compress
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes
    }
}
