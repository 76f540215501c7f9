//! Core traits for image processing
//!
//! The coordinator only knows these two seams. Real implementations live in
//! [`crate::compression`] and [`crate::preview`]; tests substitute their own.

use async_trait::async_trait;

use imgpress_core::{CompressionSettings, ImageFile, PressResult};

/// Compression operation: turns a source file into a (possibly re-encoded
/// or resized) new file.
#[async_trait]
pub trait ImageCompression: Send + Sync {
    /// Compress `file` with `settings`. Options that cannot be honored for a
    /// given input are skipped silently rather than failing.
    async fn compress(
        &self,
        file: &ImageFile,
        settings: &CompressionSettings,
    ) -> PressResult<ImageFile>;
}

/// Preview generator: turns a file into something a UI can display directly.
#[async_trait]
pub trait PreviewGenerator: Send + Sync {
    /// Fails when the payload cannot be decoded as an image.
    async fn preview(&self, file: &ImageFile) -> PressResult<String>;
}
