// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// UI-thread side of the native shell: capture windows, save dialogs, the
// clipboard, and showing the hidden main window again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dioxus::desktop::tao::event::{Event, WindowEvent};
use dioxus::desktop::{
    Config, DesktopContext, HotKeyState, LogicalPosition, LogicalSize, WindowBuilder,
    use_global_shortcut, use_wry_event_handler,
};
use dioxus::prelude::*;
use snapit_bridge::host::FileFilter;
use snapit_core::error::{Result, SnapitError};
use snapit_core::{SurfaceId, WindowConfig, WindowHandle, data_url};
use snapit_flow::assembly::CAPTURE_SURFACE_URL;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::pages::capture::{CaptureContext, CaptureWindow};
use crate::services::app_services::AppServices;
use crate::services::shell::{ShellCommand, ShellCommands};

pub const CAPTURE_TITLE: &str = "SnapIt - Camera Capture";

/// Brings the hidden main window back.
pub const SHOW_SHORTCUT: &str = "CmdOrCtrl+Shift+2";

/// Used when the monitor cannot be queried.
const FALLBACK_SCREEN: (u32, u32) = (1920, 1080);

/// Serve shell commands until the host goes away.
pub async fn run_shell(mut commands: ShellCommands, services: AppServices) {
    let mut open: HashMap<SurfaceId, Arc<Notify>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            ShellCommand::OpenWindow {
                surface,
                config,
                reply,
            } => {
                let result = open_capture_window(&services, surface, &config).map(|close| {
                    open.insert(surface, close);
                    WindowHandle(surface.0)
                });
                let _ = reply.send(result);
            }

            ShellCommand::CloseWindow { surface, reply } => {
                match open.remove(&surface) {
                    Some(close) => close.notify_one(),
                    None => debug!(%surface, "window already gone"),
                }
                let _ = reply.send(Ok(()));
            }

            ShellCommand::SaveDialog {
                suggested_name,
                filters,
                reply,
            } => {
                // The dialog can stay up for a while; keep serving other commands.
                spawn(async move {
                    let _ = reply.send(save_dialog(&suggested_name, &filters).await);
                });
            }

            ShellCommand::WriteClipboard { mime, bytes, reply } => {
                let _ = reply.send(write_clipboard(&mime, &bytes).await);
            }
        }
    }
    info!("shell loop stopped");
}

/// Logical size of the monitor showing the main window.
pub fn screen_size() -> (u32, u32) {
    dioxus::desktop::window()
        .window
        .current_monitor()
        .map(|monitor| {
            let size: LogicalSize<u32> = monitor.size().to_logical(monitor.scale_factor());
            (size.width, size.height)
        })
        .unwrap_or(FALLBACK_SCREEN)
}

/// Broadcast `reset-state` when the main window is asked to close. The
/// window itself only hides.
pub fn use_reset_on_close(services: AppServices) {
    let main_window = use_hook(|| dioxus::desktop::window().window.id());
    use_wry_event_handler(move |event, _| {
        if let Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            window_id,
            ..
        } = event
        {
            if *window_id == main_window {
                services.reset_all_surfaces();
            }
        }
    });
}

/// Show, restore, and focus the main window.
pub fn show_main_window(main_window: &DesktopContext) {
    main_window.window.set_visible(true);
    main_window.window.set_minimized(false);
    main_window.window.set_focus();
}

/// Register the global shortcut that shows the main window.
pub fn use_show_shortcut() {
    let main_window = use_hook(dioxus::desktop::window);
    let registered = use_global_shortcut(SHOW_SHORTCUT, move |state| {
        if state == HotKeyState::Pressed {
            debug!("show shortcut pressed");
            show_main_window(&main_window);
        }
    });
    use_hook(move || match registered {
        Ok(_) => info!(shortcut = SHOW_SHORTCUT, "global shortcut registered"),
        Err(e) => warn!(shortcut = SHOW_SHORTCUT, error = ?e, "global shortcut not registered"),
    });
}

/// Open a capture window for `surface`. Returns the handle that closes it.
fn open_capture_window(
    services: &AppServices,
    surface: SurfaceId,
    config: &WindowConfig,
) -> Result<Arc<Notify>> {
    if config.url != CAPTURE_SURFACE_URL {
        return Err(SnapitError::Window(format!("unknown surface {:?}", config.url)));
    }

    let close = Arc::new(Notify::new());
    let dom = VirtualDom::new(CaptureWindow).with_root_context(CaptureContext {
        platform: services.platform(surface),
        config: services.config().clone(),
        close: Arc::clone(&close),
    });
    let window = WindowBuilder::new()
        .with_title(CAPTURE_TITLE)
        .with_inner_size(LogicalSize::new(
            f64::from(config.width),
            f64::from(config.height),
        ))
        .with_position(LogicalPosition::new(
            f64::from(config.left),
            f64::from(config.top),
        ));

    let _ = dioxus::desktop::window().new_window(dom, Config::new().with_window(window));
    info!(%surface, width = config.width, height = config.height, "capture window opened");
    Ok(close)
}

async fn save_dialog(suggested_name: &str, filters: &[FileFilter]) -> Option<PathBuf> {
    let mut dialog = rfd::AsyncFileDialog::new().set_file_name(suggested_name);
    for filter in filters {
        dialog = dialog.add_filter(filter.name, filter.extensions);
    }
    let picked = dialog.save_file().await?;
    Some(picked.path().to_path_buf())
}

/// Re-encode through a canvas as PNG, the one image type the async
/// clipboard API accepts everywhere.
fn clipboard_script(url: &str) -> Result<String> {
    let url = serde_json::to_string(url)?;
    Ok(format!(
        r#"
try {{
    const img = new Image();
    await new Promise((resolve, reject) => {{
        img.onload = resolve;
        img.onerror = () => reject(new Error("image did not load"));
        img.src = {url};
    }});
    const canvas = document.createElement("canvas");
    canvas.width = img.naturalWidth;
    canvas.height = img.naturalHeight;
    canvas.getContext("2d").drawImage(img, 0, 0);
    const blob = await new Promise((resolve) => canvas.toBlob(resolve, "image/png"));
    await navigator.clipboard.write([new ClipboardItem({{ "image/png": blob }})]);
    return null;
}} catch (e) {{
    return (e && e.message) || String(e);
}}
"#
    ))
}

async fn write_clipboard(mime: &str, bytes: &[u8]) -> Result<()> {
    let script = clipboard_script(&data_url::encode(mime, bytes))?;
    let failure = document::eval(&script)
        .join::<Option<String>>()
        .await
        .map_err(|e| SnapitError::Clipboard(e.to_string()))?;
    match failure {
        None => Ok(()),
        Some(reason) => {
            warn!(%reason, "clipboard write rejected");
            Err(SnapitError::Clipboard(reason))
        }
    }
}
