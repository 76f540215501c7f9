use std::path::Path;

use imgpress_core::{ImageFile, PressError, PressResult};

/// MIME types accepted for ingestion
pub const SUPPORTED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// Whether `content_type` is one of [`SUPPORTED_CONTENT_TYPES`] (case-insensitive)
pub fn is_supported(content_type: &str) -> bool {
    let normalized = content_type.trim().to_lowercase();
    SUPPORTED_CONTENT_TYPES.iter().any(|ct| *ct == normalized)
}

/// MIME type implied by a path's extension, if it is a supported image type
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Ingestion gate for incoming files
///
/// Files that fail here never reach the registry.
pub struct FileValidator {
    max_file_size: usize,
}

impl FileValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    /// Validate file size
    pub fn validate_file_size(&self, file: &ImageFile) -> PressResult<()> {
        let size = file.data.len();
        if size == 0 {
            return Err(PressError::EmptyFile(file.name.clone()));
        }

        if size > self.max_file_size {
            return Err(PressError::FileTooLarge {
                filename: file.name.clone(),
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, file: &ImageFile) -> PressResult<()> {
        if !is_supported(&file.content_type) {
            return Err(PressError::InvalidFileType {
                filename: file.name.clone(),
                content_type: file.content_type.clone(),
            });
        }
        Ok(())
    }

    /// Validate all aspects of a file
    pub fn validate(&self, file: &ImageFile) -> PressResult<()> {
        self.validate_content_type(file)?;
        self.validate_file_size(file)?;
        Ok(())
    }
}
