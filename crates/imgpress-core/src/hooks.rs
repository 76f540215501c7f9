//! Hooks for the outside world
//!
//! The coordinator never writes files itself. "Downloading" a compressed image
//! means handing it to a [`DownloadSink`], which a binary or embedding
//! application implements (a directory on disk, an HTTP response, ...).

use async_trait::async_trait;

use crate::error::PressResult;
use crate::models::ImageFile;

/// Receives compressed images the user asked to download
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist or deliver one file under its current name
    async fn save(&self, file: &ImageFile) -> PressResult<()>;
}
