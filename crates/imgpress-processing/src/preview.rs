//! Preview generation
//!
//! Previews are `data:` URIs so that any front end can show them without
//! another round trip.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageReader;
use std::io::Cursor;

use imgpress_core::{ImageFile, PressError, PressResult};

use crate::traits::PreviewGenerator;

/// Builds `data:<mime>;base64,<payload>` previews after checking that the
/// payload decodes as an image.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUriPreview;

impl DataUriPreview {
    pub fn new() -> Self {
        Self
    }

    /// Decode the payload and return the MIME type to advertise.
    fn validate(file: &ImageFile) -> PressResult<String> {
        let reader = ImageReader::new(Cursor::new(file.data.as_ref()))
            .with_guessed_format()
            .map_err(|e| PressError::PreviewFailure(format!("{}: {}", file.name, e)))?;
        let format = reader.format().ok_or_else(|| {
            PressError::PreviewFailure(format!("{}: unrecognized image format", file.name))
        })?;
        reader
            .decode()
            .map_err(|e| PressError::PreviewFailure(format!("{}: {}", file.name, e)))?;

        if file.content_type.is_empty() {
            Ok(format.to_mime_type().to_string())
        } else {
            Ok(file.content_type.clone())
        }
    }

    pub fn to_data_uri(mime: &str, data: &[u8]) -> String {
        format!("data:{};base64,{}", mime, STANDARD.encode(data))
    }
}

#[async_trait]
impl PreviewGenerator for DataUriPreview {
    async fn preview(&self, file: &ImageFile) -> PressResult<String> {
        let file = file.clone();
        // Decoding is CPU-bound; run off the async pool to avoid blocking other tasks.
        tokio::task::spawn_blocking(move || -> PressResult<String> {
            let mime = Self::validate(&file)?;
            Ok(Self::to_data_uri(&mime, &file.data))
        })
        .await
        .map_err(|e| PressError::Internal(format!("Preview worker failed: {}", e)))?
    }
}
