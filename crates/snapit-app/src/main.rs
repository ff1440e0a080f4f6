// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SnapIt — desktop document capture
//
// Entry point. Claims the single-instance socket, initialises logging and the
// host bridge, then launches the main window. Closing the main window hides
// it; the global shortcut or a second launch shows it again. Capture windows
// are opened on demand by the shell loop.

mod pages;
mod services;
mod windows;

use dioxus::desktop::{Config, LogicalSize, WindowBuilder, WindowCloseBehaviour};
use dioxus::prelude::*;

use pages::assembly::DocumentAssembly;
use services::app_services::AppServices;
use services::data_dir;
use services::instance::{self, Instance};

const MAIN_TITLE: &str = "SnapIt - Document Capture";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("SnapIt starting");

    let listener = match instance::claim(&data_dir::data_dir()) {
        Ok(Instance::Primary(listener)) => Some(listener),
        Ok(Instance::Secondary) => return,
        Err(e) => {
            tracing::warn!(error = %e, "single-instance guard unavailable");
            None
        }
    };

    let services = match AppServices::init().or_else(|e| {
        tracing::error!(error = %e, "persistent storage failed, using in-memory fallback");
        AppServices::fallback()
    }) {
        Ok(services) => services,
        Err(e) => {
            tracing::error!(error = %e, "could not initialise services");
            std::process::exit(1);
        }
    };
    let services = match listener {
        Some(listener) => services.with_instance(listener),
        None => services,
    };
    tracing::info!(data_dir = %services.data_dir().display(), "services ready");

    let (width, height) = services.config().main_window_size;
    let window = WindowBuilder::new()
        .with_title(MAIN_TITLE)
        .with_inner_size(LogicalSize::new(f64::from(width), f64::from(height)));

    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            Config::new()
                .with_window(window)
                .with_close_behaviour(WindowCloseBehaviour::WindowHides),
        )
        .with_context(services)
        .launch(app);
}

/// Root component of the main window.
fn app() -> Element {
    let services = use_context::<AppServices>();

    // Host bridge and shell loop start with the UI runtime.
    use_hook(|| {
        if let Some(commands) = services.start() {
            spawn(windows::run_shell(commands, services.clone()));
        }
        if let Some(listener) = services.take_instance() {
            let main_window = dioxus::desktop::window();
            spawn(listener.serve(move || windows::show_main_window(&main_window)));
        }
    });
    windows::use_reset_on_close(services.clone());
    windows::use_show_shortcut();

    rsx! {
        DocumentAssembly {}
    }
}
