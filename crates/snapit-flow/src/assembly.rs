// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembly flow: the main surface.
//
//   Launcher ──capture arrives──▶ Preview ──add_page──▶ PdfReview
//      ▲  ▲                          │                    │
//      │  └──────────retake──────────┘                    │
//      └───────────add_more_images / clear_pages──────────┘
//
// Pages live only in this controller's memory. Captures arrive through the
// shared-storage mailbox and are de-duplicated by `ImageId`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use snapit_bridge::{ImageClipboard, ListenerSet, Platform, Subscription};
use snapit_core::error::{Result, SnapitError};
use snapit_core::filename::export_filename;
use snapit_core::human_errors::humanize_error;
use snapit_core::{
    AppConfig, AssemblyState, CAPTURE_KEYS, CapturedImage, DownloadOutcome, ImageExportFormat,
    KEY_CAPTURED_IMAGE, MessageOutcome, Page, PageMessage, StorageChanges, WindowConfig,
    WindowHandle,
};
use snapit_document::{PdfWriter, reencode_as_png};
use tracing::{debug, info, instrument, warn};

use crate::status::{StatusMessage, page_count_label};

/// Address of the capture surface.
pub const CAPTURE_SURFACE_URL: &str = "capture";

/// What the main surface renders.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySnapshot {
    pub state: AssemblyState,
    pub status: StatusMessage,
    /// The loaded capture, as a `data:` URL.
    pub preview: Option<String>,
    pub page_count: usize,
    /// "N Pages Added" for the review screen.
    pub page_count_label: String,
    /// "N page(s) in current PDF" while previewing with pages pending.
    pub pdf_hint: Option<String>,
    pub can_attach_to_page: bool,
}

struct AssemblyInner {
    state: AssemblyState,
    status: StatusMessage,
    current: Option<CapturedImage>,
    pages: Vec<Page>,
    adding: bool,
}

impl AssemblyInner {
    fn enter(&mut self, state: AssemblyState) {
        self.state = state;
        self.status = match state {
            AssemblyState::Launcher => StatusMessage::ready(),
            AssemblyState::Preview => StatusMessage::document_ready(),
            AssemblyState::PdfReview => StatusMessage::pages_in_pdf(self.pages.len()),
        };
    }
}

/// Controller for the main surface.
pub struct DocumentAssemblyFlow<P> {
    platform: P,
    inner: Arc<Mutex<AssemblyInner>>,
    changes: ListenerSet<AssemblySnapshot>,
    config: AppConfig,
}

impl<P: Clone> Clone for DocumentAssemblyFlow<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            inner: Arc::clone(&self.inner),
            changes: self.changes.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: Platform + ImageClipboard> DocumentAssemblyFlow<P> {
    pub fn new(platform: P, config: AppConfig) -> Self {
        Self {
            platform,
            inner: Arc::new(Mutex::new(AssemblyInner {
                state: AssemblyState::Launcher,
                status: StatusMessage::ready(),
                current: None,
                pages: Vec::new(),
                adding: false,
            })),
            changes: ListenerSet::new(),
            config,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn lock(&self) -> MutexGuard<'_, AssemblyInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the current view model.
    pub fn snapshot(&self) -> AssemblySnapshot {
        let inner = self.lock();
        let page_count = inner.pages.len();
        AssemblySnapshot {
            state: inner.state,
            status: inner.status.clone(),
            preview: inner.current.as_ref().map(CapturedImage::data_url),
            page_count,
            page_count_label: page_count_label(page_count),
            pdf_hint: (inner.state == AssemblyState::Preview && page_count > 0)
                .then(|| format!("{page_count} page(s) in current PDF")),
            can_attach_to_page: self.platform.supports_active_page(),
        }
    }

    pub fn state(&self) -> AssemblyState {
        self.lock().state
    }

    pub fn pages(&self) -> Vec<Page> {
        self.lock().pages.clone()
    }

    /// Be told about every change to the view model.
    pub fn subscribe(
        &self,
        listener: impl Fn(&AssemblySnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.changes.subscribe(listener)
    }

    fn notify(&self) {
        if !self.changes.is_empty() {
            self.changes.emit(&self.snapshot());
        }
    }

    fn set_status(&self, status: StatusMessage) {
        self.lock().status = status;
        self.notify();
    }

    async fn clear_mailbox(&self) {
        if let Err(e) = self.platform.storage_remove(&CAPTURE_KEYS).await {
            warn!(error = %e, "could not clear the capture mailbox");
        }
    }

    /// Clear storage, pages, and the loaded image; enter `Launcher`.
    pub async fn reset(&self) {
        self.clear_mailbox().await;
        {
            let mut inner = self.lock();
            inner.current = None;
            inner.pages.clear();
            inner.adding = false;
            inner.enter(AssemblyState::Launcher);
        }
        info!("assembly reset");
        self.notify();
    }

    /// Open a capture surface centred on a screen of `screen` pixels.
    #[instrument(skip(self))]
    pub async fn open_capture_surface(&self, screen: (u32, u32)) -> Result<WindowHandle> {
        self.set_status(StatusMessage::neutral("Opening camera..."));
        let (width, height) = self.config.capture_window_size;
        let config = WindowConfig::centred(CAPTURE_SURFACE_URL, width, height, screen);

        match self.platform.open_window(config).await {
            Ok(handle) => {
                self.set_status(StatusMessage::neutral("Camera window opened"));
                Ok(handle)
            }
            Err(e) => {
                warn!(error = %e, "capture surface did not open");
                self.set_status(StatusMessage::error(humanize_error(&e).message));
                Err(e)
            }
        }
    }

    /// React to a storage notification. Returns whether a new capture was
    /// loaded.
    pub async fn handle_storage_change(&self, changes: &StorageChanges) -> bool {
        let carries_image = changes
            .get(KEY_CAPTURED_IMAGE)
            .is_some_and(|c| c.new_value.is_some());
        if !carries_image {
            return false;
        }

        let capture = match CapturedImage::from_changes(changes) {
            Ok(Some(capture)) => Ok(Some(capture)),
            Ok(None) => {
                debug!("partial notification, reading storage");
                CapturedImage::from_storage(&self.platform.storage_get(&CAPTURE_KEYS).await)
            }
            Err(e) => Err(e),
        };
        let capture = match capture {
            Ok(Some(capture)) => capture,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "ignoring malformed capture");
                return false;
            }
        };

        {
            let mut inner = self.lock();
            let seen = inner.current.as_ref().is_some_and(|c| c.id == capture.id)
                || inner.pages.iter().any(|p| p.image.id == capture.id);
            if seen {
                debug!(id = %capture.id, "capture already loaded");
                return false;
            }
            info!(id = %capture.id, bytes = capture.bytes.len(), "capture loaded");
            inner.current = Some(capture);
            inner.enter(AssemblyState::Preview);
        }
        self.notify();
        self.clear_mailbox().await;
        true
    }

    /// Listen to storage and load captures as they arrive.
    ///
    /// Must be called inside a tokio runtime.
    pub fn listen(&self) -> Subscription
    where
        P: Clone + 'static,
    {
        let flow = self.clone();
        self.platform.on_storage_changed(move |changes| {
            let flow = flow.clone();
            let changes = changes.clone();
            tokio::spawn(async move {
                flow.handle_storage_change(&changes).await;
            });
        })
    }

    /// Enter `Launcher` from a clean slate, then start listening.
    ///
    /// Captures left in storage by an earlier session are dropped rather
    /// than loaded.
    pub async fn start(&self) -> Subscription
    where
        P: Clone + 'static,
    {
        self.reset().await;
        self.listen()
    }

    fn loaded_image(&self) -> Option<CapturedImage> {
        let current = self.lock().current.clone();
        if current.is_none() {
            self.set_status(StatusMessage::no_image());
        }
        current
    }

    pub async fn copy_to_clipboard(&self) -> Result<()> {
        let image = self
            .loaded_image()
            .ok_or_else(|| SnapitError::InvalidState("no image loaded".into()))?;

        match self.platform.write_image(&image).await {
            Ok(()) => {
                self.set_status(StatusMessage::success("Copied to clipboard!"));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "clipboard write failed");
                self.set_status(StatusMessage::error("Failed to copy"));
                Err(e)
            }
        }
    }

    /// Download the loaded image. PNG re-encodes the decoded pixels; JPEG
    /// hands over the captured bytes unchanged.
    #[instrument(skip(self))]
    pub async fn download_image(&self, format: ImageExportFormat) -> Result<DownloadOutcome> {
        let image = self
            .loaded_image()
            .ok_or_else(|| SnapitError::InvalidState("no image loaded".into()))?;

        let payload = match format {
            ImageExportFormat::Jpeg => Ok(image.bytes),
            ImageExportFormat::Png => reencode_as_png(&image.bytes),
        };
        let result = match payload {
            Ok(bytes) => {
                let filename = export_filename(format.extension());
                self.platform
                    .download(&bytes, format.mime_type(), &filename)
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) if outcome.success => self.set_status(StatusMessage::downloaded(format)),
            Ok(_) => self.set_status(StatusMessage::download_cancelled()),
            Err(e) => {
                warn!(error = %e, "image download failed");
                self.set_status(StatusMessage::error("Failed to download"));
            }
        }
        result
    }

    /// Download in the configured default format.
    pub async fn download_default_image(&self) -> Result<DownloadOutcome> {
        self.download_image(self.config.default_image_format).await
    }

    pub fn default_image_format(&self) -> ImageExportFormat {
        self.config.default_image_format
    }

    /// Best-effort hand-off to the page the user is on.
    pub async fn attach_to_active_page(&self) -> MessageOutcome {
        let Some(image) = self.loaded_image() else {
            return MessageOutcome::unsupported("No image captured");
        };
        let message = PageMessage::attach_image(image.data_url(), export_filename("jpeg"));

        let outcome = self.platform.send_message_to_active_page(message).await;
        if outcome.success {
            self.set_status(StatusMessage::success("Attached to webpage!"));
        } else {
            debug!(reason = ?outcome.message, "attach failed");
            self.set_status(StatusMessage::error("Use Copy to Clipboard instead"));
        }
        outcome
    }

    /// Append the loaded image as the next page and enter `PdfReview`.
    ///
    /// Rejected without a state change when nothing is loaded, when the
    /// image is already a page, or while another add is in flight.
    pub async fn add_page(&self) -> Result<u32> {
        let position = {
            let mut inner = self.lock();
            if inner.adding {
                inner.status = StatusMessage::neutral("Processing...");
                None
            } else if let Some(image) = inner.current.take() {
                if inner.pages.iter().any(|p| p.image.id == image.id) {
                    warn!(id = %image.id, "duplicate page rejected");
                    inner.current = Some(image);
                    inner.status = StatusMessage::error("This image is already added");
                    None
                } else {
                    inner.adding = true;
                    let position = inner.pages.len() as u32 + 1;
                    inner.pages.push(Page {
                        image,
                        position,
                        added_at: Utc::now(),
                    });
                    inner.enter(AssemblyState::PdfReview);
                    Some(position)
                }
            } else {
                inner.status = StatusMessage::error("No image to add");
                None
            }
        };

        let Some(position) = position else {
            self.notify();
            return Err(SnapitError::InvalidState("page not added".into()));
        };
        info!(position, "page added");
        self.notify();

        self.clear_mailbox().await;
        self.lock().adding = false;
        Ok(position)
    }

    /// Drop the loaded image and every page; back to `Launcher`.
    pub fn retake(&self) {
        {
            let mut inner = self.lock();
            inner.current = None;
            inner.pages.clear();
            inner.enter(AssemblyState::Launcher);
        }
        self.notify();
    }

    /// Back to `Launcher` keeping the pages.
    pub fn add_more_images(&self) {
        self.lock().enter(AssemblyState::Launcher);
        self.notify();
    }

    pub fn clear_pages(&self) {
        {
            let mut inner = self.lock();
            inner.pages.clear();
            inner.enter(AssemblyState::Launcher);
        }
        self.notify();
    }

    /// Build one PDF from every page, in order, and download it.
    #[instrument(skip(self))]
    pub async fn download_pdf(&self) -> Result<DownloadOutcome> {
        let payloads: Vec<Vec<u8>> = {
            let inner = self.lock();
            inner.pages.iter().map(|p| p.image.bytes.clone()).collect()
        };
        if payloads.is_empty() {
            self.set_status(StatusMessage::error("No pages added"));
            return Err(SnapitError::InvalidState("no pages added".into()));
        }
        let count = payloads.len();
        self.set_status(StatusMessage::neutral(format!(
            "Generating PDF with {count} pages..."
        )));

        let mut writer = PdfWriter::new(self.config.pdf_paper_size, self.config.pdf_margin_mm);
        writer.set_title(format!("SnapIt Document ({count} pages)"));

        // Decoding and encoding every page is CPU-bound.
        let built = tokio::task::spawn_blocking(move || {
            let refs: Vec<&[u8]> = payloads.iter().map(Vec::as_slice).collect();
            writer.create_from_images(&refs)
        })
        .await
        .unwrap_or_else(|e| Err(SnapitError::PdfError(format!("PDF task failed: {e}"))));

        let result = match built {
            Ok(pdf) => {
                self.platform
                    .download(&pdf, "application/pdf", &export_filename("pdf"))
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) if outcome.success => self.set_status(StatusMessage::pdf_generated(count)),
            Ok(_) => self.set_status(StatusMessage::download_cancelled()),
            Err(e @ SnapitError::PageDecode { .. }) | Err(e @ SnapitError::PdfError(_)) => {
                warn!(error = %e, "PDF export aborted");
                self.set_status(StatusMessage::error(humanize_error(e).message));
            }
            Err(e) => {
                warn!(error = %e, "PDF download failed");
                self.set_status(StatusMessage::error("Failed to download"));
            }
        }
        result
    }
}
