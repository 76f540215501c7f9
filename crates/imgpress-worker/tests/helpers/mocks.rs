//! Test doubles for the compression, preview and download seams.

use async_trait::async_trait;
use bytes::Bytes;
use imgpress_core::{
    CompressionSettings, DownloadSink, ImageFile, PressError, PressResult,
};
use imgpress_processing::{ImageCompression, PreviewGenerator};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

/// Compressor that halves the payload.
///
/// When gated, calls wait for a permit from [`MockCompressor::release`]
/// before returning; `gated_names` narrows that to the listed names.
/// Names listed in `failing` produce a compression error.
pub struct MockCompressor {
    gate: Option<Semaphore>,
    gated_names: HashSet<String>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    qualities: Mutex<Vec<f32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCompressor {
    pub fn new() -> Self {
        Self {
            gate: None,
            gated_names: HashSet::new(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            qualities: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Gate only calls for `names`; everything else completes immediately
    pub fn gated_on(names: &[&str]) -> Self {
        Self {
            gated_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::gated()
        }
    }

    /// Let `n` pending or future calls finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn succeed_on(&self, name: &str) {
        self.failing.lock().unwrap().remove(name);
    }

    /// Source names in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Quality setting seen by each call, in call order
    pub fn qualities(&self) -> Vec<f32> {
        self.qualities.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageCompression for MockCompressor {
    async fn compress(
        &self,
        file: &ImageFile,
        settings: &CompressionSettings,
    ) -> PressResult<ImageFile> {
        self.calls.lock().unwrap().push(file.name.clone());
        self.qualities.lock().unwrap().push(settings.quality);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if self.gated_names.is_empty() || self.gated_names.contains(&file.name) {
                gate.acquire().await.unwrap().forget();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&file.name) {
            return Err(PressError::CompressionFailure(format!(
                "mock failure for {}",
                file.name
            )));
        }

        let half = Bytes::copy_from_slice(&file.data[..file.data.len() / 2]);
        Ok(ImageFile {
            name: file.name.clone(),
            content_type: file.content_type.clone(),
            data: half,
        })
    }
}

/// Previewer that never decodes. Names containing `broken` fail.
pub struct MockPreview;

#[async_trait]
impl PreviewGenerator for MockPreview {
    async fn preview(&self, file: &ImageFile) -> PressResult<String> {
        if file.name.contains("broken") {
            return Err(PressError::PreviewFailure(format!("{}: cannot decode", file.name)));
        }
        Ok(format!("data:{};base64,bW9jaw==", file.content_type))
    }
}

/// Sink that remembers the names it saved. Names listed in `failing` error.
#[derive(Default)]
pub struct RecordingSink {
    saved: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadSink for RecordingSink {
    async fn save(&self, file: &ImageFile) -> PressResult<()> {
        if self.failing.lock().unwrap().contains(&file.name) {
            return Err(PressError::Internal(format!("disk full writing {}", file.name)));
        }
        self.saved.lock().unwrap().push(file.name.clone());
        Ok(())
    }
}
