// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: opens the storage database, loads the config, and
// owns the host bridge every surface talks to.
//
// Built before the UI launches and handed to Dioxus as root context, so it
// must be `Send + Sync`. The host's request inbox and the shell command queue
// are parked here until the root component takes them in `start`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use snapit_bridge::host::HostInbox;
use snapit_bridge::{DesktopPlatform, HostBridge, HostConnector, KvStore};
use snapit_core::error::Result;
use snapit_core::{AppConfig, SurfaceId};
use tracing::{info, warn};

use super::data_dir;
use super::instance::InstanceListener;
use super::shell::{DesktopShell, ShellCommands};

const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "storage.db";

/// Shared application services, available to every surface via
/// `use_context::<AppServices>()`.
#[derive(Clone)]
pub struct AppServices {
    connector: HostConnector,
    host: Arc<HostBridge<DesktopShell>>,
    pending: Arc<Mutex<Option<(HostInbox, ShellCommands)>>>,
    instance: Arc<Mutex<Option<InstanceListener>>>,
    config: AppConfig,
    data_dir: PathBuf,
}

impl AppServices {
    /// Open the persistent store and config in the data directory.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir();
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_else(|| {
            let config = AppConfig::default();
            if let Err(e) = persist_config(&dir, &config) {
                warn!(error = %e, "could not write default config");
            }
            config
        });
        let store = KvStore::open(&dir.join(STORE_FILE))?;

        info!("app services initialised");
        Ok(Self::assemble(store, config, dir))
    }

    /// In-memory storage and default config, for when the data directory is
    /// unusable.
    pub fn fallback() -> Result<Self> {
        let store = KvStore::open_in_memory()?;
        Ok(Self::assemble(
            store,
            AppConfig::default(),
            std::env::temp_dir(),
        ))
    }

    fn assemble(store: KvStore, config: AppConfig, data_dir: PathBuf) -> Self {
        let (connector, inbox) = HostConnector::channel();
        let (shell, commands) = DesktopShell::channel();
        let host = Arc::new(HostBridge::new(store, shell, &connector));
        Self {
            connector,
            host,
            pending: Arc::new(Mutex::new(Some((inbox, commands)))),
            instance: Arc::new(Mutex::new(None)),
            config,
            data_dir,
        }
    }

    /// Start serving host requests and hand back the shell command queue.
    ///
    /// Only the first call does anything; later calls return `None`. Must run
    /// inside the tokio runtime.
    pub fn start(&self) -> Option<ShellCommands> {
        let (inbox, commands) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        tokio::spawn(Arc::clone(&self.host).serve(inbox));
        Some(commands)
    }

    /// Park the single-instance listener until the UI can serve it.
    pub fn with_instance(self, listener: InstanceListener) -> Self {
        *self.instance.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
        self
    }

    /// The single-instance listener, once.
    pub fn take_instance(&self) -> Option<InstanceListener> {
        self.instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Capability provider for `surface`.
    pub fn platform(&self, surface: SurfaceId) -> DesktopPlatform {
        DesktopPlatform::new(self.connector.client(surface))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Tell every surface to drop its state.
    pub fn reset_all_surfaces(&self) {
        self.host.broadcast_reset();
    }
}

// ---------------------------------------------------------------------------
// Config persistence
// ---------------------------------------------------------------------------

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
