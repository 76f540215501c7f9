//! Compression workflow coordinator
//!
//! Locking: the registry sits behind a `std::sync::Mutex` that is only ever held
//! for short synchronous sections, never across an `.await`. The check-and-claim
//! that moves a record to `compressing` happens under a single acquisition, so
//! two callers racing on the same record produce one compression call.
//!
//! The processing flag is a `watch` channel: claiming it is an atomic
//! test-and-set, and [`ImageCoordinator::settled`] waits on its changes.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

use imgpress_core::{
    CompressedOutput, CompressionSettings, DownloadSink, ErrorMetadata, ImageFile, ImageRecord,
    ImageStatus, PressConfig, PressError, PressResult,
};
use imgpress_processing::{
    compressed_name, compression_ratio, file_extension, rename_file, DataUriPreview,
    FileValidator, ImageCompression, ImageCompressor, PreviewGenerator,
};

use crate::registry::ImageRegistry;

/// A file that did not make it into the registry
#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of [`ImageCoordinator::ingest`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Ids of the new records, in ingestion order
    pub accepted: Vec<Uuid>,
    /// Unsupported type, empty or oversized files
    pub rejected: Vec<RejectedFile>,
    /// Files whose preview could not be generated
    pub dropped: Vec<RejectedFile>,
}

/// Outcome of one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// `false` when another batch was already running
    pub ran: bool,
    pub succeeded: usize,
    pub failed: usize,
    /// Records removed, claimed or finished elsewhere by the time their turn came
    pub skipped: usize,
}

struct Shared {
    registry: Mutex<ImageRegistry>,
    settings: RwLock<CompressionSettings>,
    processing: watch::Sender<bool>,
    compressor: Arc<dyn ImageCompression>,
    previewer: Arc<dyn PreviewGenerator>,
    validator: FileValidator,
    auto_compress: bool,
}

/// Owns the image registry and the processing flag.
///
/// Cloning is cheap and every clone drives the same registry.
#[derive(Clone)]
pub struct ImageCoordinator {
    inner: Arc<Shared>,
}

impl ImageCoordinator {
    pub fn new(
        compressor: Arc<dyn ImageCompression>,
        previewer: Arc<dyn PreviewGenerator>,
        config: &PressConfig,
    ) -> Self {
        let (processing, _) = watch::channel(false);
        Self {
            inner: Arc::new(Shared {
                registry: Mutex::new(ImageRegistry::new()),
                settings: RwLock::new(config.settings().clone()),
                processing,
                compressor,
                previewer,
                validator: FileValidator::new(config.max_file_size_bytes()),
                auto_compress: config.auto_compress(),
            }),
        }
    }

    /// Coordinator backed by [`ImageCompressor`] and [`DataUriPreview`]
    pub fn from_config(config: &PressConfig) -> Self {
        Self::new(
            Arc::new(ImageCompressor::new()),
            Arc::new(DataUriPreview::new()),
            config,
        )
    }

    fn registry(&self) -> MutexGuard<'_, ImageRegistry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current settings snapshot
    pub fn settings(&self) -> CompressionSettings {
        self.inner
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the settings used for compressions started from now on
    pub fn update_settings(&self, settings: CompressionSettings) -> PressResult<()> {
        settings.validate()?;
        *self
            .inner
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = settings;
        tracing::debug!("Compression settings updated");
        Ok(())
    }

    pub fn is_processing(&self) -> bool {
        *self.inner.processing.borrow()
    }

    pub fn records(&self) -> Vec<ImageRecord> {
        self.registry().snapshot()
    }

    pub fn get(&self, id: Uuid) -> Option<ImageRecord> {
        self.registry().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    /// Validate, preview and register a batch of files.
    ///
    /// Files are appended together once every preview has been attempted; a
    /// failure on one file never prevents the others from being added.
    pub async fn ingest(&self, files: Vec<ImageFile>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut new_records = Vec::with_capacity(files.len());

        for file in files {
            if let Err(e) = self.inner.validator.validate(&file) {
                tracing::debug!(file = %file.name, error = %e, "Rejecting file");
                report.rejected.push(RejectedFile {
                    name: file.name,
                    reason: e.client_message(),
                });
                continue;
            }

            match self.inner.previewer.preview(&file).await {
                Ok(preview) => new_records.push(ImageRecord::new(file, preview)),
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "Failed to create preview, dropping file");
                    report.dropped.push(RejectedFile {
                        name: file.name,
                        reason: e.client_message(),
                    });
                }
            }
        }

        {
            let mut registry = self.registry();
            for record in new_records {
                report.accepted.push(registry.push(record));
            }
        }

        tracing::info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            dropped = report.dropped.len(),
            "Files ingested"
        );

        self.maybe_start_batch();
        report
    }

    /// Compress a single record.
    ///
    /// Returns the record's new status, or `None` when nothing was done: the
    /// record does not exist, is already compressing, or was removed before
    /// its result came back (the result is then discarded).
    pub async fn compress_one(&self, id: Uuid) -> Option<ImageStatus> {
        self.compress_if(id, |_| true).await
    }

    /// Claim and compress `id` only if its status passes `eligible` at the
    /// moment of the claim. The check and the claim share one lock acquisition.
    async fn compress_if(
        &self,
        id: Uuid,
        eligible: fn(ImageStatus) -> bool,
    ) -> Option<ImageStatus> {
        let source = {
            let mut registry = self.registry();
            let record = registry.get_mut(id)?;
            if !eligible(record.status()) {
                tracing::debug!(image_id = %id, status = %record.status(), "Image no longer eligible, skipping");
                return None;
            }
            if !record.begin_compression() {
                tracing::debug!(image_id = %id, "Image already compressing, skipping");
                return None;
            }
            record.source().clone()
        };

        let settings = self.settings();
        tracing::debug!(image_id = %id, file = %source.name, "Compressing image");

        let outcome = self.run_compression(&source, &settings).await;

        let mut registry = self.registry();
        let Some(record) = registry.get_mut(id) else {
            tracing::debug!(image_id = %id, "Image removed while compressing, discarding result");
            return None;
        };

        match outcome {
            Ok(mut output) => {
                // Renamed while in flight: give the output the name a rename would have
                if record.source().name != source.name {
                    output.file = compressed_copy(&record.source().name, &output.file);
                }
                tracing::debug!(
                    image_id = %id,
                    original_size = source.size(),
                    compressed_size = output.file.size(),
                    ratio = output.ratio,
                    "Image compressed"
                );
                record.complete(output);
            }
            Err(e) => {
                tracing::warn!(image_id = %id, file = %source.name, error = %e, "Image compression failed");
                record.fail(e.client_message());
            }
        }

        Some(record.status())
    }

    async fn run_compression(
        &self,
        source: &ImageFile,
        settings: &CompressionSettings,
    ) -> PressResult<CompressedOutput> {
        let file = self.inner.compressor.compress(source, settings).await?;
        let preview = self.inner.previewer.preview(&file).await?;
        let ratio = compression_ratio(source.size(), file.size());
        Ok(CompressedOutput {
            file,
            preview,
            ratio,
        })
    }

    /// Compress every `idle` or `error` record, one after another, in
    /// registry order.
    ///
    /// Returns immediately with `ran == false` if a batch is already running.
    pub async fn compress_all(&self) -> BatchSummary {
        if !self.try_begin_batch() {
            tracing::debug!("Batch already running, skipping");
            return BatchSummary::default();
        }
        self.run_batch().await
    }

    /// Atomic test-and-set of the processing flag
    fn try_begin_batch(&self) -> bool {
        self.inner.processing.send_if_modified(|processing| {
            if *processing {
                false
            } else {
                *processing = true;
                true
            }
        })
    }

    async fn run_batch(&self) -> BatchSummary {
        let ids = self
            .registry()
            .ids_where(|r| r.status().is_batch_eligible());

        let started = Instant::now();
        let mut summary = BatchSummary {
            ran: true,
            ..Default::default()
        };

        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "Starting compression batch");
        }

        for id in ids {
            // Status may have moved on since the ids were taken
            match self.compress_if(id, ImageStatus::is_batch_eligible).await {
                Some(ImageStatus::Done) => summary.succeeded += 1,
                Some(ImageStatus::Error) => summary.failed += 1,
                _ => summary.skipped += 1,
            }
        }

        self.inner.processing.send_replace(false);

        if summary.succeeded + summary.failed > 0 {
            tracing::info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Compression batch finished"
            );
        }

        // Images added while this batch ran are picked up now that the flag is clear
        self.maybe_start_batch();
        summary
    }

    /// Start a background batch if auto-compression is on, at least one record
    /// is idle and no batch is running. Returns whether a batch was started.
    fn maybe_start_batch(&self) -> bool {
        if !self.inner.auto_compress {
            return false;
        }
        if !self.registry().any_with_status(ImageStatus::Idle) {
            return false;
        }
        if !self.try_begin_batch() {
            return false;
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_batch().await;
        });
        true
    }

    /// Wait until no batch is running and, with auto-compression on, no
    /// record is left idle.
    pub async fn settled(&self) {
        let mut rx = self.inner.processing.subscribe();
        loop {
            let processing = *rx.borrow_and_update();
            let waiting =
                self.inner.auto_compress && self.registry().any_with_status(ImageStatus::Idle);
            if !processing && !waiting {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Remove one record. An in-flight compression for it finishes but its
    /// result is dropped.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.registry().remove(id).is_some();
        if removed {
            tracing::debug!(image_id = %id, "Image removed");
        }
        removed
    }

    /// Remove every record, returning how many there were
    pub fn clear(&self) -> usize {
        let count = self.registry().clear();
        tracing::debug!(count = count, "Registry cleared");
        count
    }

    /// Rename a record's files.
    ///
    /// The source keeps its extension; an existing compressed copy becomes
    /// `<new_name>_compressed.<its extension>`.
    pub fn rename(&self, id: Uuid, new_name: &str) -> PressResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(PressError::InvalidInput("New name cannot be empty".to_string()));
        }

        let mut registry = self.registry();
        let record = registry.get_mut(id).ok_or(PressError::NotFound(id))?;

        let source = rename_file(record.source(), new_name);
        let compressed = record
            .compressed()
            .map(|file| compressed_copy(&source.name, file));

        tracing::debug!(image_id = %id, from = %record.source().name, to = %source.name, "Image renamed");
        record.apply_rename(source, compressed);
        Ok(())
    }

    /// Hand one record's compressed file to `sink`.
    ///
    /// Returns `Ok(false)` when the record is missing or has no compressed file.
    pub async fn download(&self, id: Uuid, sink: &dyn DownloadSink) -> PressResult<bool> {
        let file = self
            .registry()
            .get(id)
            .and_then(|r| r.compressed().cloned());

        let Some(file) = file else {
            return Ok(false);
        };

        sink.save(&file).await?;
        tracing::debug!(image_id = %id, file = %file.name, "Image downloaded");
        Ok(true)
    }

    /// Download every `done` record, in registry order.
    ///
    /// A failing save is logged and does not stop the others. Returns how many
    /// files were saved.
    pub async fn download_all(&self, sink: &dyn DownloadSink) -> usize {
        let ids = self
            .registry()
            .ids_where(|r| r.status() == ImageStatus::Done && r.compressed().is_some());

        let mut saved = 0;
        for id in ids {
            match self.download(id, sink).await {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(image_id = %id, error = %e, "Failed to download image");
                }
            }
        }
        saved
    }
}

/// Compressed copy named after `source_name`: `<stem>_compressed.<ext of file>`
fn compressed_copy(source_name: &str, file: &ImageFile) -> ImageFile {
    rename_file(file, &compressed_name(source_name, file_extension(source_name)))
}
