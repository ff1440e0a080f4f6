// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for host capabilities.
//
// Every backend implements the whole `Platform` trait; capabilities a host
// genuinely lacks (webpage attachment on the desktop) are reported through
// `supports_active_page` and a best-effort `success: false` outcome rather
// than a missing method.

use std::future::Future;

use snapit_core::error::{CameraFailure, Result};
use snapit_core::{
    CapturedImage, DownloadOutcome, MessageOutcome, PageMessage, StorageChanges, StorageMap,
    WindowConfig, WindowHandle,
};

use crate::listeners::Subscription;

/// The capability provider every flow is written against.
pub trait Platform: Send + Sync {
    /// Open a new surface. Fails if the host cannot create one.
    fn open_window(&self, config: WindowConfig) -> impl Future<Output = Result<WindowHandle>> + Send;

    /// Close the calling surface.
    fn close_window(&self) -> impl Future<Output = Result<()>> + Send;

    /// Read `keys` from shared storage. Absent keys are omitted; on a host
    /// failure the error is logged and an empty map returned.
    fn storage_get(&self, keys: &[&str]) -> impl Future<Output = StorageMap> + Send;

    /// Write `entries` and notify every listening surface.
    fn storage_set(&self, entries: StorageMap) -> impl Future<Output = Result<()>> + Send;

    /// Remove `keys`. Absent keys are not an error.
    fn storage_remove(&self, keys: &[&str]) -> impl Future<Output = Result<()>> + Send;

    /// Register a storage change listener.
    fn on_storage_changed(
        &self,
        listener: impl Fn(&StorageChanges) + Send + Sync + 'static,
    ) -> Subscription;

    /// Hand `payload` to the host's save mechanism. User cancellation is
    /// `success: false`, never an error.
    fn download(
        &self,
        payload: &[u8],
        mime: &str,
        filename: &str,
    ) -> impl Future<Output = Result<DownloadOutcome>> + Send;

    /// Best-effort delivery to the page the user is looking at.
    fn send_message_to_active_page(
        &self,
        message: PageMessage,
    ) -> impl Future<Output = MessageOutcome> + Send;

    /// Register an inbound message listener. Hosts without messaging return
    /// a no-op subscription.
    fn on_message(&self, listener: impl Fn(&PageMessage) + Send + Sync + 'static) -> Subscription;

    fn platform_name(&self) -> &'static str;

    fn is_extension(&self) -> bool;

    fn is_desktop_app(&self) -> bool;

    /// Whether `send_message_to_active_page` can ever succeed here.
    fn supports_active_page(&self) -> bool;
}

/// Writes images to the system clipboard.
///
/// Kept apart from [`Platform`]: each backend reaches its clipboard through a
/// host-specific entry point.
pub trait ImageClipboard: Send + Sync {
    fn write_image(&self, image: &CapturedImage) -> impl Future<Output = Result<()>> + Send;
}

/// A camera stream owned by one capture surface.
///
/// Implementations are driven from the UI thread and need not be `Send`.
pub trait CameraDevice {
    /// Start the stream, preferring the rear-facing camera.
    fn acquire(&self) -> impl Future<Output = std::result::Result<(), CameraFailure>>;

    /// Freeze the current frame at full source resolution, JPEG-encoded.
    fn grab_frame(&self) -> impl Future<Output = Result<Vec<u8>>>;

    /// Stop every track. Safe to call when already released.
    fn release(&self);

    fn is_active(&self) -> bool;
}
