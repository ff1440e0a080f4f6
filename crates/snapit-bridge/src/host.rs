// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host process bridge.
//
// Surfaces never touch the store, the file system, or native windows
// directly. They send named requests over an async channel; the host answers
// each one and pushes `storage-changed` / `reset-state` events to every
// surface on a broadcast bus.
//
//   surface ──HostClient::call──▶ mpsc ──▶ HostBridge::serve ──▶ handle()
//        ◀──────────────── oneshot reply ◀──────────────────────┘
//   surface ◀── broadcast<HostEvent> ◀── storage-set / reset

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use snapit_core::error::{Result, SnapitError};
use snapit_core::{
    DownloadOutcome, PlatformInfo, StorageMap, SurfaceId, WindowConfig, WindowHandle, data_url,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::kv_store::KvStore;

/// The surface created at startup.
pub const MAIN_SURFACE: SurfaceId = SurfaceId(0);

const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A named operation a surface asks the host to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum HostRequest {
    StorageGet { keys: Vec<String> },
    StorageSet { entries: StorageMap },
    StorageRemove { keys: Vec<String> },
    OpenWindow { config: WindowConfig },
    CloseWindow,
    DownloadFile { data_url: String, filename: String },
    WriteClipboard { data_url: String },
    GetPlatformInfo,
}

impl HostRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StorageGet { .. } => "storage-get",
            Self::StorageSet { .. } => "storage-set",
            Self::StorageRemove { .. } => "storage-remove",
            Self::OpenWindow { .. } => "open-window",
            Self::CloseWindow => "close-window",
            Self::DownloadFile { .. } => "download-file",
            Self::WriteClipboard { .. } => "write-clipboard",
            Self::GetPlatformInfo => "get-platform-info",
        }
    }
}

/// The host's answer to a [`HostRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HostResponse {
    Done,
    Entries { entries: StorageMap },
    Window { handle: WindowHandle },
    Download { outcome: DownloadOutcome },
    PlatformInfo { info: PlatformInfo },
}

/// Pushed from the host to every surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    /// The exact entries a `storage-set` wrote.
    StorageChanged { entries: StorageMap },
    /// The main surface should return to its initial state.
    ResetState,
}

/// One save-dialog file type filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

/// Save-dialog filters for `filename`: PDFs get a PDF filter first, anything
/// else the image filter. "All Files" is always offered.
pub fn download_filters(filename: &str) -> Vec<FileFilter> {
    let primary = if filename.to_ascii_lowercase().ends_with(".pdf") {
        FileFilter {
            name: "PDF",
            extensions: &["pdf"],
        }
    } else {
        FileFilter {
            name: "Images",
            extensions: &["jpg", "jpeg", "png"],
        }
    };
    vec![
        primary,
        FileFilter {
            name: "All Files",
            extensions: &["*"],
        },
    ]
}

// ---------------------------------------------------------------------------
// Native shell
// ---------------------------------------------------------------------------

/// Native services the host delegates to: windows, dialogs, clipboard.
pub trait NativeShell: Send + Sync + 'static {
    /// Create a surface identified by `surface`.
    fn open_window(
        &self,
        surface: SurfaceId,
        config: WindowConfig,
    ) -> impl Future<Output = Result<WindowHandle>> + Send;

    fn close_window(&self, surface: SurfaceId) -> impl Future<Output = Result<()>> + Send;

    /// Show a save dialog. `None` when the user cancels.
    fn save_dialog(
        &self,
        suggested_name: &str,
        filters: &[FileFilter],
    ) -> impl Future<Output = Option<PathBuf>> + Send;

    fn write_clipboard_image(
        &self,
        mime: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

// ---------------------------------------------------------------------------
// Channel plumbing
// ---------------------------------------------------------------------------

struct Envelope {
    surface: SurfaceId,
    request: HostRequest,
    reply: oneshot::Sender<Result<HostResponse>>,
}

/// Receiving end of the request channel, consumed by [`HostBridge::serve`].
pub struct HostInbox(mpsc::UnboundedReceiver<Envelope>);

/// Hands out per-surface clients for one host.
#[derive(Clone)]
pub struct HostConnector {
    tx: mpsc::UnboundedSender<Envelope>,
    events: broadcast::Sender<HostEvent>,
}

impl HostConnector {
    /// Create the request channel and event bus for a new host.
    pub fn channel() -> (Self, HostInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        (Self { tx, events }, HostInbox(rx))
    }

    /// A client whose calls are attributed to `surface`.
    pub fn client(&self, surface: SurfaceId) -> HostClient {
        HostClient {
            surface,
            tx: self.tx.clone(),
            events: self.events.clone(),
        }
    }
}

/// A surface's connection to the host.
#[derive(Clone)]
pub struct HostClient {
    surface: SurfaceId,
    tx: mpsc::UnboundedSender<Envelope>,
    events: broadcast::Sender<HostEvent>,
}

impl HostClient {
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Send `request` and wait for the host's answer.
    pub async fn call(&self, request: HostRequest) -> Result<HostResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                surface: self.surface,
                request,
                reply,
            })
            .map_err(|_| SnapitError::Bridge("host is not running".into()))?;
        rx.await
            .map_err(|_| SnapitError::Bridge("host dropped the request".into()))?
    }

    /// Receive every event pushed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// The host process: owns the store and the native shell.
pub struct HostBridge<S> {
    store: Mutex<KvStore>,
    shell: S,
    events: broadcast::Sender<HostEvent>,
    capture_surface: Mutex<Option<SurfaceId>>,
    next_surface: AtomicU64,
}

impl<S: NativeShell> HostBridge<S> {
    pub fn new(store: KvStore, shell: S, connector: &HostConnector) -> Self {
        Self {
            store: Mutex::new(store),
            shell,
            events: connector.events.clone(),
            capture_surface: Mutex::new(None),
            next_surface: AtomicU64::new(MAIN_SURFACE.0 + 1),
        }
    }

    /// Answer requests until every client is gone. Each request runs on its
    /// own task, so a pending save dialog does not block storage traffic.
    pub async fn serve(self: Arc<Self>, mut inbox: HostInbox) {
        info!("host bridge serving");
        while let Some(envelope) = inbox.0.recv().await {
            let host = Arc::clone(&self);
            tokio::spawn(async move {
                let op = envelope.request.name();
                let result = host.handle(envelope.surface, envelope.request).await;
                if let Err(e) = &result {
                    warn!(op, surface = %envelope.surface, error = %e, "host request failed");
                }
                let _ = envelope.reply.send(result);
            });
        }
        info!("host bridge stopped");
    }

    /// Push `reset-state` to every surface.
    pub fn broadcast_reset(&self) {
        info!("broadcasting reset-state");
        let _ = self.events.send(HostEvent::ResetState);
    }

    /// Perform one request on behalf of `surface`.
    #[instrument(skip(self, request), fields(op = request.name(), %surface))]
    pub async fn handle(&self, surface: SurfaceId, request: HostRequest) -> Result<HostResponse> {
        match request {
            HostRequest::StorageGet { keys } => {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                let entries = self.store()?.get(&keys)?;
                Ok(HostResponse::Entries { entries })
            }

            HostRequest::StorageSet { entries } => {
                self.store()?.set(&entries)?;
                let receivers = self
                    .events
                    .send(HostEvent::StorageChanged { entries })
                    .unwrap_or(0);
                debug!(receivers, "storage-changed broadcast");
                Ok(HostResponse::Done)
            }

            HostRequest::StorageRemove { keys } => {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                self.store()?.remove(&keys)?;
                Ok(HostResponse::Done)
            }

            HostRequest::OpenWindow { config } => {
                let previous = self.capture_slot()?.take();
                if let Some(old) = previous {
                    debug!(%old, "closing previous capture surface");
                    if let Err(e) = self.shell.close_window(old).await {
                        warn!(%old, error = %e, "previous capture surface did not close");
                    }
                }

                let new_surface = SurfaceId(self.next_surface.fetch_add(1, Ordering::Relaxed));
                let handle = self
                    .shell
                    .open_window(new_surface, config)
                    .await
                    .map_err(|e| match e {
                        SnapitError::Window(_) => e,
                        other => SnapitError::Window(other.to_string()),
                    })?;
                *self.capture_slot()? = Some(new_surface);
                info!(%new_surface, "capture surface opened");
                Ok(HostResponse::Window { handle })
            }

            HostRequest::CloseWindow => {
                {
                    let mut slot = self.capture_slot()?;
                    if *slot == Some(surface) {
                        *slot = None;
                    }
                }
                self.shell.close_window(surface).await?;
                Ok(HostResponse::Done)
            }

            HostRequest::DownloadFile { data_url, filename } => {
                let filters = download_filters(&filename);
                let Some(path) = self.shell.save_dialog(&filename, &filters).await else {
                    info!(filename, "save dialog cancelled");
                    return Ok(HostResponse::Download {
                        outcome: DownloadOutcome::cancelled(),
                    });
                };

                let (_, bytes) = data_url::decode(&data_url)?;
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| SnapitError::Download(format!("{}: {e}", path.display())))?;
                info!(path = %path.display(), bytes = bytes.len(), "file saved");
                Ok(HostResponse::Download {
                    outcome: DownloadOutcome::saved(path.display().to_string()),
                })
            }

            HostRequest::WriteClipboard { data_url } => {
                let (mime, bytes) = data_url::decode(&data_url)?;
                self.shell
                    .write_clipboard_image(&mime, bytes)
                    .await
                    .map_err(|e| match e {
                        SnapitError::Clipboard(_) => e,
                        other => SnapitError::Clipboard(other.to_string()),
                    })?;
                Ok(HostResponse::Done)
            }

            HostRequest::GetPlatformInfo => Ok(HostResponse::PlatformInfo {
                info: PlatformInfo {
                    name: "desktop".into(),
                    is_desktop_app: true,
                    is_extension: false,
                },
            }),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, KvStore>> {
        self.store
            .lock()
            .map_err(|_| SnapitError::Storage("store lock poisoned".into()))
    }

    fn capture_slot(&self) -> Result<MutexGuard<'_, Option<SurfaceId>>> {
        self.capture_surface
            .lock()
            .map_err(|_| SnapitError::Window("surface registry lock poisoned".into()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted native shell shared by the bridge tests.

    use super::*;

    #[derive(Default)]
    pub struct ShellLog {
        pub opened: Vec<(SurfaceId, WindowConfig)>,
        pub closed: Vec<SurfaceId>,
        pub dialogs: Vec<(String, Vec<FileFilter>)>,
        pub clipboard: Vec<(String, Vec<u8>)>,
    }

    #[derive(Clone, Default)]
    pub struct FakeShell {
        pub log: Arc<Mutex<ShellLog>>,
        /// `None` simulates a cancelled dialog.
        pub save_to: Option<PathBuf>,
        pub fail_open: bool,
    }

    impl NativeShell for FakeShell {
        async fn open_window(&self, surface: SurfaceId, config: WindowConfig) -> Result<WindowHandle> {
            if self.fail_open {
                return Err(SnapitError::Window("no display".into()));
            }
            self.log.lock().unwrap().opened.push((surface, config));
            Ok(WindowHandle(surface.0))
        }

        async fn close_window(&self, surface: SurfaceId) -> Result<()> {
            self.log.lock().unwrap().closed.push(surface);
            Ok(())
        }

        async fn save_dialog(&self, suggested_name: &str, filters: &[FileFilter]) -> Option<PathBuf> {
            self.log
                .lock()
                .unwrap()
                .dialogs
                .push((suggested_name.to_string(), filters.to_vec()));
            self.save_to.clone()
        }

        async fn write_clipboard_image(&self, mime: &str, bytes: Vec<u8>) -> Result<()> {
            self.log.lock().unwrap().clipboard.push((mime.to_string(), bytes));
            Ok(())
        }
    }

    /// Start a host over an in-memory store and return a client for the
    /// main surface.
    pub fn start(shell: FakeShell) -> (Arc<HostBridge<FakeShell>>, HostConnector) {
        let (connector, inbox) = HostConnector::channel();
        let store = KvStore::open_in_memory().expect("store");
        let host = Arc::new(HostBridge::new(store, shell, &connector));
        tokio::spawn(Arc::clone(&host).serve(inbox));
        (host, connector)
    }
}
