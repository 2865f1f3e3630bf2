// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion session — owns the editor surface, the canonical content, and
// the conversion job, and drives upload and convert with timed notifications.
//
// Shared state sits in `Arc<Mutex<>>` (std mutex, never held across an
// await). Render + write runs on the blocking pool against a detached
// snapshot of the surface; the surface lock is released before layout starts.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use vpdf_bridge::{NotificationSink, PageWriter, RichTextSurface, TextExtractor};
use vpdf_core::AppConfig;
use vpdf_core::error::{Result, VpdfError};
use vpdf_core::types::{ConversionState, FormatCommand, JobId, Severity};
use vpdf_document::{
    CanonicalContent, ContentModel, DocxExtractor, IngestedText, Ingestor, PageSummary, PdfWriter,
    RenderedDocument, SavedFile, UploadedSource, compose, finalize, layout_pages, normalize,
    save_atomic,
};

use super::pacer::NotificationPacer;
use crate::state::ConversionJob;

const RENDERING: &str = "Rendering your PDF...";
const COMPLETE: &str = "Download complete!";
const EXTRACTING: &str = "Extracting data...";

/// The collaborators a session drives.
pub struct Backends {
    pub surface: Box<dyn RichTextSurface>,
    pub extractor: Arc<dyn TextExtractor>,
    pub writer: Arc<dyn PageWriter>,
}

impl Backends {
    /// Content model, DOCX extractor and PDF writer configured from `config`.
    pub fn standard(config: &AppConfig) -> Self {
        Self {
            surface: Box::new(ContentModel::new(config.typography.clone())),
            extractor: Arc::new(DocxExtractor::new()),
            writer: Arc::new(PdfWriter::new(config.document_title.clone())),
        }
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub job_id: JobId,
    pub pages: Vec<PageSummary>,
    pub file: SavedFile,
}

fn lock<T>(shared: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Announcement shown once the PDF bytes exist, naming the download delay.
fn ready_message(delay: Duration) -> String {
    if delay.is_zero() {
        return "PDF generated! Download starting now...".to_string();
    }
    let secs = delay.as_millis().div_ceil(1000);
    let unit = if secs == 1 { "second" } else { "seconds" };
    format!("PDF generated! Download will start in {secs} {unit}...")
}

/// One editing session. Cheap to clone; clones share all state.
///
/// The CLI drives upload, convert and inspect; the editing methods serve an
/// interactive front end.
#[derive(Clone)]
pub struct Session {
    config: Arc<AppConfig>,
    surface: Arc<Mutex<Box<dyn RichTextSurface>>>,
    content: Arc<Mutex<CanonicalContent>>,
    job: Arc<Mutex<ConversionJob>>,
    ingestor: Ingestor,
    writer: Arc<dyn PageWriter>,
    pacer: NotificationPacer,
}

#[allow(dead_code)]
impl Session {
    pub fn new(config: AppConfig, backends: Backends, sink: Arc<dyn NotificationSink>) -> Self {
        let ingestor = Ingestor::new(
            backends.extractor,
            config.extraction_timeout_secs.map(Duration::from_secs),
        );
        let pacer = NotificationPacer::new(sink, config.pacing.min_visible());
        let job = ConversionJob::new();
        info!(job = %job.id, "Session started");
        Self {
            config: Arc::new(config),
            surface: Arc::new(Mutex::new(backends.surface)),
            content: Arc::new(Mutex::new(CanonicalContent::empty())),
            job: Arc::new(Mutex::new(job)),
            ingestor,
            writer: backends.writer,
            pacer,
        }
    }

    /// Session with the standard backends.
    pub fn with_defaults(config: AppConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let backends = Backends::standard(&config);
        Self::new(config, backends, sink)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn content(&self) -> CanonicalContent {
        lock(&self.content).clone()
    }

    pub fn job(&self) -> ConversionJob {
        lock(&self.job).clone()
    }

    pub fn state(&self) -> ConversionState {
        lock(&self.job).state
    }

    /// What the editor currently renders.
    pub fn markup(&self) -> String {
        lock(&self.surface).markup()
    }

    pub fn plain_text(&self) -> String {
        lock(&self.surface).plain_text()
    }

    /// Replace the editor content with `html` (a user edit).
    pub fn set_markup(&self, html: &str) -> Result<()> {
        let text = {
            let mut surface = lock(&self.surface);
            surface.set_content(html)?;
            surface.plain_text()
        };
        lock(&self.job).content_changed(!text.trim().is_empty());
        Ok(())
    }

    /// Settle the editor state into canonical content.
    pub fn finalize_edit(&self) -> CanonicalContent {
        let (markup, text) = {
            let surface = lock(&self.surface);
            (surface.markup(), surface.plain_text())
        };
        let content = finalize(&markup, &text);
        debug!(rich = content.is_rich(), "Edit finalized");
        *lock(&self.content) = content.clone();
        content
    }

    /// Programmatic load: `raw` is classified as HTML or plain text.
    pub fn load_text(&self, raw: &str) -> Result<()> {
        self.replace_content(normalize(raw))
    }

    fn replace_content(&self, content: CanonicalContent) -> Result<()> {
        let text = {
            let mut surface = lock(&self.surface);
            surface.set_content(&content.markup())?;
            surface.plain_text()
        };
        *lock(&self.content) = content;
        lock(&self.job).content_changed(!text.trim().is_empty());
        Ok(())
    }

    /// Apply a toolbar command to the editor. A rejected command is shown as
    /// a warning and leaves the content as it was.
    pub async fn apply_format(
        &self,
        command: &FormatCommand,
        selection: std::ops::Range<usize>,
    ) -> Result<()> {
        let applied = {
            let mut surface = lock(&self.surface);
            surface
                .apply_format(command, selection)
                .map(|()| surface.plain_text())
        };
        match applied {
            Ok(text) => {
                lock(&self.job).content_changed(!text.trim().is_empty());
                Ok(())
            }
            Err(err) => self.recover(err).await,
        }
    }

    /// Ingest an upload and replace the content with its text.
    #[instrument(skip(self, source), fields(name = %source.name()))]
    pub async fn upload(&self, source: &UploadedSource) -> Result<IngestedText> {
        let format = match source.format() {
            Ok(format) => format,
            Err(err) => return self.recover(err).await,
        };
        if format.is_binary() {
            let pacing = &self.config.pacing;
            self.pacer
                .show(
                    format!("Document uploaded: {}", source.name()),
                    Severity::Info,
                    millis(pacing.upload_notice_ms),
                )
                .await;
            self.pacer
                .show(EXTRACTING, Severity::Info, millis(pacing.extracting_notice_ms))
                .await;
        }

        let ingested = match self.ingestor.ingest(source).await {
            Ok(ingested) => ingested,
            Err(err) => return self.recover(err).await,
        };
        if let Err(err) = self.replace_content(CanonicalContent::plain(ingested.text.clone())) {
            return self.recover(err).await;
        }
        info!(state = ?self.state(), "Upload loaded");
        Ok(ingested)
    }

    /// Render, paginate and save the current content to `out_dir`.
    ///
    /// Returns `Ok(None)` when a conversion is already running.
    #[instrument(skip(self, out_dir), fields(out_dir = %out_dir.display()))]
    pub async fn convert(&self, out_dir: &Path) -> Result<Option<ConversionReport>> {
        if lock(&self.job).is_converting() {
            debug!("Conversion already running");
            return Ok(None);
        }
        let content = self.finalize_edit();

        let job_id = {
            let mut job = lock(&self.job);
            if job.is_converting() {
                return Ok(None);
            }
            if !content.is_blank() && job.begin() {
                Some(job.id)
            } else {
                None
            }
        };
        let Some(job_id) = job_id else {
            return self.recover(VpdfError::EmptyContent).await;
        };

        self.pacer
            .show(RENDERING, Severity::Info, millis(self.config.pacing.default_ms))
            .await;
        match self.render_and_save(out_dir, job_id).await {
            Ok(report) => {
                let mut job = lock(&self.job);
                job.succeed();
                job.settle();
                Ok(Some(report))
            }
            Err(err) => {
                error!(error = %err, "Conversion failed");
                lock(&self.job).fail(err.to_string());
                self.pacer.show_error(&err).await;
                lock(&self.job).settle();
                Err(err)
            }
        }
    }

    async fn render_and_save(&self, out_dir: &Path, job_id: JobId) -> Result<ConversionReport> {
        let pacing = &self.config.pacing;
        let rendered = self.render().await?;

        // Bytes exist in full before the user is told the download is coming.
        let delay = pacing.download_delay();
        self.pacer
            .show(ready_message(delay), Severity::Info, millis(pacing.ready_notice_ms))
            .await;
        tokio::time::sleep(delay).await;

        let file = save_atomic(out_dir, &self.config.output_file_name, &rendered.bytes)?;
        self.pacer
            .show(COMPLETE, Severity::Success, millis(pacing.complete_notice_ms))
            .await;

        info!(path = %file.path.display(), pages = rendered.pages.len(), "Conversion complete");
        Ok(ConversionReport {
            job_id,
            pages: rendered.pages.iter().map(PageSummary::from).collect(),
            file,
        })
    }

    async fn render(&self) -> Result<RenderedDocument> {
        // A timed-out task keeps running; it must not own the live surface.
        let snapshot = lock(&self.surface).snapshot();
        let writer = Arc::clone(&self.writer);
        let geometry = self.config.geometry();
        let task =
            tokio::task::spawn_blocking(move || compose(&*snapshot, &*writer, &geometry));

        let joined = match self.config.render_timeout_secs.map(Duration::from_secs) {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(VpdfError::RenderWrite(format!(
                        "timed out after {}s",
                        limit.as_secs()
                    )));
                }
            },
            None => task.await,
        };
        joined.map_err(|err| VpdfError::RenderWrite(format!("render task failed: {err}")))?
    }

    /// Page layout of the current content without writing anything.
    pub fn inspect(&self) -> Result<Vec<PageSummary>> {
        self.finalize_edit();
        let snapshot = lock(&self.surface).snapshot();
        let pages = layout_pages(&*snapshot, &self.config.geometry())?;
        Ok(pages.iter().map(PageSummary::from).collect())
    }

    /// Surface `err` as its single notification and hand it back.
    async fn recover<T>(&self, err: VpdfError) -> Result<T> {
        warn!(error = %err, "Operation failed");
        self.pacer.show_error(&err).await;
        Err(err)
    }
}
