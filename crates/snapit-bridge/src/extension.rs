// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extension-style host, in process.
//
// Storage is an in-memory map whose notifications carry old and new values.
// Downloads land straight in a downloads directory with no dialog. The
// "active page" is whatever content channel is currently connected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use snapit_core::error::{Result, SnapitError};
use snapit_core::{
    CapturedImage, DownloadOutcome, MessageOutcome, PageMessage, StorageChange, StorageChanges,
    StorageMap, WindowConfig, WindowHandle,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::listeners::{ListenerSet, Subscription};
use crate::traits::{ImageClipboard, Platform};

#[derive(Default)]
struct HostState {
    storage: StorageMap,
    windows: BTreeMap<u64, WindowConfig>,
    next_window: u64,
    active_page: Option<mpsc::UnboundedSender<PageMessage>>,
    clipboard: Option<CapturedImage>,
}

/// The shared extension runtime all of its surfaces talk to.
#[derive(Clone)]
pub struct ExtensionHost {
    state: Arc<Mutex<HostState>>,
    storage_listeners: ListenerSet<StorageChanges>,
    message_listeners: ListenerSet<PageMessage>,
    downloads_dir: PathBuf,
}

impl ExtensionHost {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState::default())),
            storage_listeners: ListenerSet::new(),
            message_listeners: ListenerSet::new(),
            downloads_dir: downloads_dir.into(),
        }
    }

    /// The popup surface (not a host-opened window).
    pub fn popup(&self) -> ExtensionPlatform {
        ExtensionPlatform {
            host: self.clone(),
            window: None,
        }
    }

    /// The platform seen from inside an opened window.
    pub fn window(&self, handle: WindowHandle) -> ExtensionPlatform {
        ExtensionPlatform {
            host: self.clone(),
            window: Some(handle),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Windows currently open, in creation order.
    pub fn open_windows(&self) -> Vec<(WindowHandle, WindowConfig)> {
        self.state()
            .windows
            .iter()
            .map(|(id, config)| (WindowHandle(*id), config.clone()))
            .collect()
    }

    /// Connect a content page; it becomes the active page and receives
    /// every message sent to it until the receiver is dropped.
    pub fn connect_active_page(&self) -> mpsc::UnboundedReceiver<PageMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().active_page = Some(tx);
        rx
    }

    /// Deliver a message from a content page to the extension's listeners.
    pub fn post_to_extension(&self, message: PageMessage) {
        self.message_listeners.emit(&message);
    }

    /// Last image written to the clipboard.
    pub fn clipboard(&self) -> Option<CapturedImage> {
        self.state().clipboard.clone()
    }

    pub fn storage_snapshot(&self) -> StorageMap {
        self.state().storage.clone()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Capability provider for one extension surface.
#[derive(Clone)]
pub struct ExtensionPlatform {
    host: ExtensionHost,
    window: Option<WindowHandle>,
}

impl ExtensionPlatform {
    pub fn host(&self) -> &ExtensionHost {
        &self.host
    }
}

/// First free name in `dir`: `name.ext`, then `name (1).ext`, `name (2).ext`, ...
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (filename, String::new()),
    };
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}){ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

impl Platform for ExtensionPlatform {
    async fn open_window(&self, config: WindowConfig) -> Result<WindowHandle> {
        let mut state = self.host.state();
        state.next_window += 1;
        let id = state.next_window;
        debug!(id, url = %config.url, "window opened");
        state.windows.insert(id, config);
        Ok(WindowHandle(id))
    }

    async fn close_window(&self) -> Result<()> {
        match self.window {
            Some(handle) => {
                self.host.state().windows.remove(&handle.0);
                debug!(id = handle.0, "window closed");
            }
            None => debug!("popup closed"),
        }
        Ok(())
    }

    async fn storage_get(&self, keys: &[&str]) -> StorageMap {
        let state = self.host.state();
        keys.iter()
            .filter_map(|k| state.storage.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect()
    }

    async fn storage_set(&self, entries: StorageMap) -> Result<()> {
        let changes: StorageChanges = {
            let mut state = self.host.state();
            entries
                .into_iter()
                .map(|(key, value)| {
                    let old_value = state.storage.insert(key.clone(), value.clone());
                    (
                        key,
                        StorageChange {
                            new_value: Some(value),
                            old_value,
                        },
                    )
                })
                .collect()
        };
        self.host.storage_listeners.emit(&changes);
        Ok(())
    }

    async fn storage_remove(&self, keys: &[&str]) -> Result<()> {
        let changes: StorageChanges = {
            let mut state = self.host.state();
            keys.iter()
                .filter_map(|k| {
                    state.storage.remove(*k).map(|old| {
                        (
                            (*k).to_string(),
                            StorageChange {
                                new_value: None,
                                old_value: Some(old),
                            },
                        )
                    })
                })
                .collect()
        };
        if !changes.is_empty() {
            self.host.storage_listeners.emit(&changes);
        }
        Ok(())
    }

    fn on_storage_changed(
        &self,
        listener: impl Fn(&StorageChanges) + Send + Sync + 'static,
    ) -> Subscription {
        self.host.storage_listeners.subscribe(listener)
    }

    async fn download(&self, payload: &[u8], mime: &str, filename: &str) -> Result<DownloadOutcome> {
        let dir = self.host.downloads_dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SnapitError::Download(format!("{}: {e}", dir.display())))?;
        let path = unique_path(&dir, filename);
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| SnapitError::Download(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), mime, bytes = payload.len(), "download saved");
        Ok(DownloadOutcome::saved(path.display().to_string()))
    }

    async fn send_message_to_active_page(&self, message: PageMessage) -> MessageOutcome {
        let Some(tx) = self.host.state().active_page.clone() else {
            return MessageOutcome::unsupported("No active page");
        };
        if tx.send(message).is_ok() {
            return MessageOutcome::delivered();
        }
        warn!("active page went away");
        self.host.state().active_page = None;
        MessageOutcome::unsupported("Could not reach the page")
    }

    fn on_message(&self, listener: impl Fn(&PageMessage) + Send + Sync + 'static) -> Subscription {
        self.host.message_listeners.subscribe(listener)
    }

    fn platform_name(&self) -> &'static str {
        "extension"
    }

    fn is_extension(&self) -> bool {
        true
    }

    fn is_desktop_app(&self) -> bool {
        false
    }

    fn supports_active_page(&self) -> bool {
        true
    }
}

impl ImageClipboard for ExtensionPlatform {
    async fn write_image(&self, image: &CapturedImage) -> Result<()> {
        self.host.state().clipboard = Some(image.clone());
        Ok(())
    }
}
