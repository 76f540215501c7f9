//! imgpress processing library
//!
//! The two black-box operations the coordinator drives (compression and preview
//! generation) plus the small helpers around them: file-type validation,
//! renaming, size formatting and metadata handling.

pub mod compression;
pub mod metadata;
pub mod naming;
pub mod preview;
pub mod traits;
pub mod validator;

// Re-export commonly used types
pub use compression::ImageCompressor;
pub use metadata::strip_metadata;
pub use naming::{
    compressed_name, compression_ratio, file_extension, format_file_size, rename_file, renamed,
};
pub use preview::DataUriPreview;
pub use traits::{ImageCompression, PreviewGenerator};
pub use validator::{content_type_for_path, is_supported, FileValidator, SUPPORTED_CONTENT_TYPES};
