// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native shell for the host bridge.
//
// Windows, dialogs and the clipboard belong to the UI thread, so the shell
// only forwards commands there and waits for the answer. The receiving side
// is drained by `crate::windows::run_shell` on the UI thread.

use std::path::PathBuf;

use snapit_bridge::NativeShell;
use snapit_bridge::host::FileFilter;
use snapit_core::error::{Result, SnapitError};
use snapit_core::{SurfaceId, WindowConfig, WindowHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// A request for the UI thread.
pub enum ShellCommand {
    OpenWindow {
        surface: SurfaceId,
        config: WindowConfig,
        reply: oneshot::Sender<Result<WindowHandle>>,
    },
    CloseWindow {
        surface: SurfaceId,
        reply: oneshot::Sender<Result<()>>,
    },
    SaveDialog {
        suggested_name: String,
        filters: Vec<FileFilter>,
        reply: oneshot::Sender<Option<PathBuf>>,
    },
    WriteClipboard {
        mime: String,
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
}

pub type ShellCommands = mpsc::UnboundedReceiver<ShellCommand>;

/// [`NativeShell`] that delegates to the UI thread.
#[derive(Clone)]
pub struct DesktopShell {
    tx: mpsc::UnboundedSender<ShellCommand>,
}

impl DesktopShell {
    pub fn channel() -> (Self, ShellCommands) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    async fn ask<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ShellCommand,
    ) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(command(reply)).is_err() {
            warn!("UI is not running");
            return None;
        }
        rx.await.ok()
    }
}

fn ui_gone() -> SnapitError {
    SnapitError::Bridge("UI did not answer".into())
}

impl NativeShell for DesktopShell {
    async fn open_window(&self, surface: SurfaceId, config: WindowConfig) -> Result<WindowHandle> {
        self.ask(|reply| ShellCommand::OpenWindow {
            surface,
            config,
            reply,
        })
        .await
        .unwrap_or_else(|| Err(ui_gone()))
    }

    async fn close_window(&self, surface: SurfaceId) -> Result<()> {
        self.ask(|reply| ShellCommand::CloseWindow { surface, reply })
            .await
            .unwrap_or_else(|| Err(ui_gone()))
    }

    async fn save_dialog(&self, suggested_name: &str, filters: &[FileFilter]) -> Option<PathBuf> {
        let suggested_name = suggested_name.to_string();
        let filters = filters.to_vec();
        self.ask(|reply| ShellCommand::SaveDialog {
            suggested_name,
            filters,
            reply,
        })
        .await
        .flatten()
    }

    async fn write_clipboard_image(&self, mime: &str, bytes: Vec<u8>) -> Result<()> {
        let mime = mime.to_string();
        self.ask(|reply| ShellCommand::WriteClipboard { mime, bytes, reply })
            .await
            .unwrap_or_else(|| Err(ui_gone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_reach_the_ui_and_answers_come_back() {
        let (shell, mut commands) = DesktopShell::channel();
        let ui = tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                match command {
                    ShellCommand::OpenWindow { surface, reply, .. } => {
                        let _ = reply.send(Ok(WindowHandle(surface.0 * 10)));
                    }
                    ShellCommand::SaveDialog {
                        suggested_name,
                        reply,
                        ..
                    } => {
                        let _ = reply.send(Some(PathBuf::from("/out").join(suggested_name)));
                    }
                    ShellCommand::CloseWindow { reply, .. } => {
                        let _ = reply.send(Ok(()));
                    }
                    ShellCommand::WriteClipboard { reply, .. } => {
                        let _ = reply.send(Err(SnapitError::Clipboard("denied".into())));
                    }
                }
            }
        });

        let config = WindowConfig::centred("capture", 800, 700, (1920, 1080));
        let handle = shell.open_window(SurfaceId(3), config).await.expect("open");
        assert_eq!(handle, WindowHandle(30));
        shell.close_window(SurfaceId(3)).await.expect("close");

        let path = shell.save_dialog("scan.pdf", &[]).await;
        assert_eq!(path, Some(PathBuf::from("/out/scan.pdf")));

        let err = shell
            .write_clipboard_image("image/png", vec![1, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, SnapitError::Clipboard(_)));

        drop(shell);
        ui.await.expect("ui loop");
    }

    #[tokio::test]
    async fn missing_ui_is_an_error_or_a_cancel() {
        let (shell, commands) = DesktopShell::channel();
        drop(commands);

        let config = WindowConfig::centred("capture", 800, 700, (1280, 800));
        assert!(matches!(
            shell.open_window(SurfaceId(1), config).await,
            Err(SnapitError::Bridge(_))
        ));
        assert_eq!(shell.save_dialog("x.png", &[]).await, None);
    }
}
