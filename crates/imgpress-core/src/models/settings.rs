use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::{PressError, PressResult};

/// Output container for compressed images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Keep the source format
    #[default]
    Auto,
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn parse(s: &str) -> PressResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(OutputFormat::Auto),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(PressError::InvalidInput(format!("Invalid output format: {}", s))),
        }
    }

    /// MIME type of the container, `None` for `Auto`
    pub fn to_mime_type(self) -> Option<&'static str> {
        match self {
            OutputFormat::Auto => None,
            OutputFormat::Jpeg => Some("image/jpeg"),
            OutputFormat::Png => Some("image/png"),
            OutputFormat::Webp => Some("image/webp"),
        }
    }

    /// File extension of the container, `None` for `Auto`
    pub fn extension(self) -> Option<&'static str> {
        match self {
            OutputFormat::Auto => None,
            OutputFormat::Jpeg => Some("jpg"),
            OutputFormat::Png => Some("png"),
            OutputFormat::Webp => Some("webp"),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OutputFormat::Auto => write!(f, "auto"),
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Webp => write!(f, "webp"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Options every compression call is made with.
///
/// The coordinator reads a snapshot of these for each image; editing them
/// affects images compressed afterwards, not the ones already done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    /// Encoder quality in (0, 1]
    pub quality: f32,
    /// Target ceiling for the output size, in MiB
    pub max_size_mb: f64,
    /// Longest allowed edge in pixels; `None` keeps the original resolution
    pub max_width_or_height: Option<u32>,
    pub remove_metadata: bool,
    pub output_format: OutputFormat,
    /// Run decode/encode on the blocking thread pool instead of the calling task
    pub offload_to_worker: bool,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            quality: 0.8,
            max_size_mb: 1.0,
            max_width_or_height: None,
            remove_metadata: true,
            output_format: OutputFormat::Auto,
            offload_to_worker: true,
        }
    }
}

impl CompressionSettings {
    pub fn validate(&self) -> PressResult<()> {
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(PressError::InvalidInput(format!(
                "quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        if !(self.max_size_mb > 0.0) || !self.max_size_mb.is_finite() {
            return Err(PressError::InvalidInput(format!(
                "max_size_mb must be a positive number, got {}",
                self.max_size_mb
            )));
        }
        if self.max_width_or_height == Some(0) {
            return Err(PressError::InvalidInput(
                "max_width_or_height must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Size ceiling in bytes
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb * 1024.0 * 1024.0) as u64
    }
}
