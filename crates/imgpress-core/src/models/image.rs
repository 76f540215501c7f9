use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// An image payload together with its file name and MIME type.
///
/// Files are never mutated in place: renaming produces a new `ImageFile`
/// that shares the same underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    #[serde(skip)]
    pub data: Bytes,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size of the payload in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Copy of this file under a different name. The payload is shared, not copied.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: self.content_type.clone(),
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Idle,
    Compressing,
    Done,
    Error,
}

impl ImageStatus {
    /// Whether a batch run should pick this record up.
    pub fn is_batch_eligible(self) -> bool {
        matches!(self, ImageStatus::Idle | ImageStatus::Error)
    }
}

impl Display for ImageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ImageStatus::Idle => write!(f, "idle"),
            ImageStatus::Compressing => write!(f, "compressing"),
            ImageStatus::Done => write!(f, "done"),
            ImageStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ImageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ImageStatus::Idle),
            "compressing" => Ok(ImageStatus::Compressing),
            "done" => Ok(ImageStatus::Done),
            "error" => Ok(ImageStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid image status: {}", s)),
        }
    }
}

/// Result of a successful compression, applied to a record in one step.
#[derive(Debug, Clone)]
pub struct CompressedOutput {
    pub file: ImageFile,
    pub preview: String,
    pub ratio: f64,
}

/// One uploaded image and its position in the compression lifecycle.
///
/// Fields are private so that every transition goes through the methods below,
/// which keep `status`, `compressed` and `error` consistent:
/// `Done` carries a compressed file and no error, `Error` carries an error and
/// no compressed file, `Idle` and `Compressing` carry neither.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    id: Uuid,
    source: ImageFile,
    #[serde(skip)]
    preview: String,
    compressed: Option<ImageFile>,
    #[serde(skip)]
    compressed_preview: Option<String>,
    compression_ratio: Option<f64>,
    status: ImageStatus,
    error: Option<String>,
    added_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn new(source: ImageFile, preview: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            preview,
            compressed: None,
            compressed_preview: None,
            compression_ratio: None,
            status: ImageStatus::Idle,
            error: None,
            added_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &ImageFile {
        &self.source
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn compressed(&self) -> Option<&ImageFile> {
        self.compressed.as_ref()
    }

    pub fn compressed_preview(&self) -> Option<&str> {
        self.compressed_preview.as_deref()
    }

    pub fn compression_ratio(&self) -> Option<f64> {
        self.compression_ratio
    }

    pub fn status(&self) -> ImageStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Claim the record for compression.
    ///
    /// Returns `false` without touching the record if it is already compressing.
    /// Any previous output or error is discarded.
    pub fn begin_compression(&mut self) -> bool {
        if self.status == ImageStatus::Compressing {
            return false;
        }
        self.status = ImageStatus::Compressing;
        self.compressed = None;
        self.compressed_preview = None;
        self.compression_ratio = None;
        self.error = None;
        true
    }

    pub fn complete(&mut self, output: CompressedOutput) {
        self.compressed = Some(output.file);
        self.compressed_preview = Some(output.preview);
        self.compression_ratio = Some(output.ratio);
        self.error = None;
        self.status = ImageStatus::Done;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.compressed = None;
        self.compressed_preview = None;
        self.compression_ratio = None;
        self.error = Some(message.into());
        self.status = ImageStatus::Error;
    }

    /// Swap in renamed files. The compressed copy is only replaced when the
    /// record already holds one.
    pub fn apply_rename(&mut self, source: ImageFile, compressed: Option<ImageFile>) {
        self.source = source;
        if self.compressed.is_some() {
            if let Some(file) = compressed {
                self.compressed = Some(file);
            }
        }
    }

    /// Whether status, output and error agree with each other.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            ImageStatus::Done => self.compressed.is_some() && self.error.is_none(),
            ImageStatus::Error => self.error.is_some() && self.compressed.is_none(),
            ImageStatus::Idle | ImageStatus::Compressing => {
                self.compressed.is_none() && self.error.is_none()
            }
        }
    }
}
