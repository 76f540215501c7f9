//! imgpress core library
//!
//! This crate provides the domain models, error types, configuration and hook
//! traits shared by the processing, worker and CLI crates.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::PressConfig;
pub use error::{ErrorMetadata, LogLevel, PressError, PressResult};
pub use hooks::DownloadSink;
pub use models::{
    CompressedOutput, CompressionSettings, ImageFile, ImageRecord, ImageStatus, OutputFormat,
};
