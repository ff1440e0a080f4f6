// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop backend: every capability is a request to the host bridge.

use snapit_core::error::{Result, SnapitError};
use snapit_core::{
    CapturedImage, DownloadOutcome, MessageOutcome, PageMessage, StorageChanges, StorageMap,
    WindowConfig, WindowHandle, changes_from_written, data_url,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::host::{HostClient, HostEvent, HostRequest, HostResponse};
use crate::listeners::Subscription;
use crate::traits::{ImageClipboard, Platform};

/// Capability provider for a surface hosted by the desktop app.
#[derive(Clone)]
pub struct DesktopPlatform {
    client: HostClient,
}

impl DesktopPlatform {
    pub fn new(client: HostClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HostClient {
        &self.client
    }

    /// Run `listener` whenever the host pushes `reset-state`.
    pub fn on_reset_state(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.forward_events(move |event| {
            if matches!(event, HostEvent::ResetState) {
                listener();
            }
        })
    }

    /// Spawn a task relaying host events to `f` until unsubscribed.
    fn forward_events(&self, f: impl Fn(&HostEvent) + Send + Sync + 'static) -> Subscription {
        let mut rx = self.client.subscribe();
        let surface = self.client.surface();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => f(&event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(%surface, missed, "host events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription::new(move || task.abort())
    }

    async fn expect_done(&self, request: HostRequest) -> Result<()> {
        match self.client.call(request).await? {
            HostResponse::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: HostResponse) -> SnapitError {
    SnapitError::Bridge(format!("unexpected host response: {response:?}"))
}

fn owned_keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

impl Platform for DesktopPlatform {
    async fn open_window(&self, config: WindowConfig) -> Result<WindowHandle> {
        match self.client.call(HostRequest::OpenWindow { config }).await? {
            HostResponse::Window { handle } => Ok(handle),
            other => Err(unexpected(other)),
        }
    }

    async fn close_window(&self) -> Result<()> {
        self.expect_done(HostRequest::CloseWindow).await
    }

    async fn storage_get(&self, keys: &[&str]) -> StorageMap {
        let request = HostRequest::StorageGet {
            keys: owned_keys(keys),
        };
        match self.client.call(request).await {
            Ok(HostResponse::Entries { entries }) => entries,
            Ok(other) => {
                warn!(error = %unexpected(other), "storage-get failed");
                StorageMap::new()
            }
            Err(e) => {
                warn!(error = %e, "storage-get failed");
                StorageMap::new()
            }
        }
    }

    async fn storage_set(&self, entries: StorageMap) -> Result<()> {
        self.expect_done(HostRequest::StorageSet { entries }).await
    }

    async fn storage_remove(&self, keys: &[&str]) -> Result<()> {
        self.expect_done(HostRequest::StorageRemove {
            keys: owned_keys(keys),
        })
        .await
    }

    fn on_storage_changed(
        &self,
        listener: impl Fn(&StorageChanges) + Send + Sync + 'static,
    ) -> Subscription {
        self.forward_events(move |event| {
            if let HostEvent::StorageChanged { entries } = event {
                listener(&changes_from_written(entries));
            }
        })
    }

    async fn download(&self, payload: &[u8], mime: &str, filename: &str) -> Result<DownloadOutcome> {
        let request = HostRequest::DownloadFile {
            data_url: data_url::encode(mime, payload),
            filename: filename.to_string(),
        };
        match self.client.call(request).await {
            Ok(HostResponse::Download { outcome }) => Ok(outcome),
            Ok(other) => Err(unexpected(other)),
            Err(e @ SnapitError::Download(_)) => Err(e),
            Err(e) => Err(SnapitError::Download(e.to_string())),
        }
    }

    async fn send_message_to_active_page(&self, message: PageMessage) -> MessageOutcome {
        debug!(action = %message.action, "active page messaging requested on desktop");
        MessageOutcome::unsupported("Not supported in desktop app")
    }

    fn on_message(&self, _listener: impl Fn(&PageMessage) + Send + Sync + 'static) -> Subscription {
        Subscription::noop()
    }

    fn platform_name(&self) -> &'static str {
        "desktop"
    }

    fn is_extension(&self) -> bool {
        false
    }

    fn is_desktop_app(&self) -> bool {
        true
    }

    fn supports_active_page(&self) -> bool {
        false
    }
}

impl ImageClipboard for DesktopPlatform {
    async fn write_image(&self, image: &CapturedImage) -> Result<()> {
        self.expect_done(HostRequest::WriteClipboard {
            data_url: image.data_url(),
        })
        .await
    }
}
