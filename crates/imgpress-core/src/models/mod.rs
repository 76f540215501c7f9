//! Data models
//!
//! Images move through the registry as [`ImageRecord`]s; the compression
//! options every record is processed with live in [`CompressionSettings`].

mod image;
mod settings;

pub use image::{CompressedOutput, ImageFile, ImageRecord, ImageStatus};
pub use settings::{CompressionSettings, OutputFormat};
