// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend chosen at construction time.

use snapit_core::error::Result;
use snapit_core::{
    CapturedImage, DownloadOutcome, MessageOutcome, PageMessage, StorageChanges, StorageMap,
    WindowConfig, WindowHandle,
};

use crate::desktop::DesktopPlatform;
use crate::extension::ExtensionPlatform;
use crate::listeners::Subscription;
use crate::traits::{ImageClipboard, Platform};

/// Either backend behind one concrete type.
#[derive(Clone)]
pub enum AnyPlatform {
    Desktop(DesktopPlatform),
    Extension(ExtensionPlatform),
}

impl From<DesktopPlatform> for AnyPlatform {
    fn from(p: DesktopPlatform) -> Self {
        Self::Desktop(p)
    }
}

impl From<ExtensionPlatform> for AnyPlatform {
    fn from(p: ExtensionPlatform) -> Self {
        Self::Extension(p)
    }
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            AnyPlatform::Desktop($p) => $call,
            AnyPlatform::Extension($p) => $call,
        }
    };
}

impl Platform for AnyPlatform {
    async fn open_window(&self, config: WindowConfig) -> Result<WindowHandle> {
        dispatch!(self, p => p.open_window(config).await)
    }

    async fn close_window(&self) -> Result<()> {
        dispatch!(self, p => p.close_window().await)
    }

    async fn storage_get(&self, keys: &[&str]) -> StorageMap {
        dispatch!(self, p => p.storage_get(keys).await)
    }

    async fn storage_set(&self, entries: StorageMap) -> Result<()> {
        dispatch!(self, p => p.storage_set(entries).await)
    }

    async fn storage_remove(&self, keys: &[&str]) -> Result<()> {
        dispatch!(self, p => p.storage_remove(keys).await)
    }

    fn on_storage_changed(
        &self,
        listener: impl Fn(&StorageChanges) + Send + Sync + 'static,
    ) -> Subscription {
        dispatch!(self, p => p.on_storage_changed(listener))
    }

    async fn download(&self, payload: &[u8], mime: &str, filename: &str) -> Result<DownloadOutcome> {
        dispatch!(self, p => p.download(payload, mime, filename).await)
    }

    async fn send_message_to_active_page(&self, message: PageMessage) -> MessageOutcome {
        dispatch!(self, p => p.send_message_to_active_page(message).await)
    }

    fn on_message(&self, listener: impl Fn(&PageMessage) + Send + Sync + 'static) -> Subscription {
        dispatch!(self, p => p.on_message(listener))
    }

    fn platform_name(&self) -> &'static str {
        dispatch!(self, p => p.platform_name())
    }

    fn is_extension(&self) -> bool {
        dispatch!(self, p => p.is_extension())
    }

    fn is_desktop_app(&self) -> bool {
        dispatch!(self, p => p.is_desktop_app())
    }

    fn supports_active_page(&self) -> bool {
        dispatch!(self, p => p.supports_active_page())
    }
}

impl ImageClipboard for AnyPlatform {
    async fn write_image(&self, image: &CapturedImage) -> Result<()> {
        dispatch!(self, p => p.write_image(image).await)
    }
}
