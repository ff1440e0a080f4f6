// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: bridges the Dioxus surfaces to the host bridge, the native
// shell, the webview camera, and the single-instance guard.

pub mod app_services;
pub mod camera;
pub mod data_dir;
pub mod instance;
pub mod shell;
