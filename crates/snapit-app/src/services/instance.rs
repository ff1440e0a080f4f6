// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-instance guard.
//
// The first launch binds a Unix socket in the data directory. Later launches
// connect, ask the running instance to show its main window, and exit.

use std::path::Path;

use snapit_core::error::Result;

pub const SOCKET_NAME: &str = "snapit.sock";

/// Outcome of claiming the data directory.
pub enum Instance {
    /// First instance; serves later launches.
    Primary(InstanceListener),
    /// Another instance is running and has been asked to show itself.
    Secondary,
}

#[cfg(unix)]
mod imp {
    use std::io::Write;
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tracing::{debug, info, warn};

    use super::*;

    const SHOW: &str = "show";
    const IO_TIMEOUT: Duration = Duration::from_secs(2);

    pub struct InstanceListener {
        listener: UnixListener,
    }

    pub fn claim(dir: &Path) -> Result<Instance> {
        let path = dir.join(SOCKET_NAME);
        if let Ok(mut stream) = UnixStream::connect(&path) {
            stream.set_write_timeout(Some(IO_TIMEOUT))?;
            writeln!(stream, "{SHOW}")?;
            info!("SnapIt is already running; asked it to show itself");
            return Ok(Instance::Secondary);
        }

        // Nobody answered, so any file there is left from a crash.
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;
        info!(path = %path.display(), "single-instance socket bound");
        Ok(Instance::Primary(InstanceListener { listener }))
    }

    impl InstanceListener {
        /// Call `on_launch` for every later launch. Must run inside the tokio
        /// runtime; returns only if the socket fails.
        pub async fn serve(self, mut on_launch: impl FnMut()) {
            let listener = match tokio::net::UnixListener::from_std(self.listener) {
                Ok(listener) => listener,
                Err(e) => {
                    warn!(error = %e, "single-instance socket unusable");
                    return;
                }
            };

            loop {
                let stream = match listener.accept().await {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!(error = %e, "single-instance accept failed");
                        return;
                    }
                };
                let mut line = String::new();
                let read = tokio::time::timeout(
                    IO_TIMEOUT,
                    BufReader::new(stream).read_line(&mut line),
                )
                .await;
                match read {
                    Ok(Ok(_)) if line.trim() == SHOW => {
                        debug!("second launch forwarded");
                        on_launch();
                    }
                    Ok(Ok(_)) => debug!(request = %line.trim(), "ignoring unknown request"),
                    Ok(Err(e)) => warn!(error = %e, "single-instance read failed"),
                    Err(_) => debug!("single-instance client went quiet"),
                }
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;

    pub struct InstanceListener;

    /// No guard on this platform; every launch is primary.
    pub fn claim(_dir: &Path) -> Result<Instance> {
        Ok(Instance::Primary(InstanceListener))
    }

    impl InstanceListener {
        pub async fn serve(self, _on_launch: impl FnMut()) {
            std::future::pending::<()>().await;
        }
    }
}

pub use imp::{InstanceListener, claim};

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn second_launch_is_forwarded_to_the_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let Instance::Primary(listener) = claim(dir.path()).expect("claim") else {
            panic!("first launch must be primary");
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(listener.serve(move || {
            let _ = tx.send(());
        }));

        assert!(matches!(claim(dir.path()).expect("claim"), Instance::Secondary));
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("forwarded in time")
            .expect("listener alive");
    }

    #[test]
    fn leftover_socket_file_is_reclaimed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(SOCKET_NAME), b"").expect("seed");
        assert!(matches!(
            claim(dir.path()).expect("claim"),
            Instance::Primary(_)
        ));
    }
}
