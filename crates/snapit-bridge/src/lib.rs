// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SnapIt: capability providers.
//
// Flows talk to their host only through the `Platform` and `ImageClipboard`
// traits. Two backends exist: the desktop backend, which forwards every call
// over the host request channel to a `HostBridge`, and the in-process
// extension-style host. `AnyPlatform` picks one at construction time.

pub mod any;
pub mod desktop;
pub mod extension;
pub mod host;
pub mod kv_store;
pub mod listeners;
pub mod traits;

pub use any::AnyPlatform;
pub use desktop::DesktopPlatform;
pub use extension::{ExtensionHost, ExtensionPlatform};
pub use host::{HostBridge, HostClient, HostConnector, HostEvent, HostRequest, HostResponse, NativeShell};
pub use kv_store::KvStore;
pub use listeners::{ListenerSet, Subscription};
pub use traits::{CameraDevice, ImageClipboard, Platform};
