// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where SnapIt keeps its config and storage database.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "snapit";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = resolve(
        std::env::var_os("XDG_DATA_HOME").as_deref().map(Path::new),
        std::env::var_os("HOME").as_deref().map(Path::new),
    );
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "could not create data directory");
    }
    dir
}

/// XDG data dir, then `~/.local/share`, then `/tmp`.
fn resolve(xdg_data_home: Option<&Path>, home: Option<&Path>) -> PathBuf {
    let base = match (xdg_data_home, home) {
        (Some(xdg), _) if !xdg.as_os_str().is_empty() => xdg.to_path_buf(),
        (_, Some(home)) => home.join(".local").join("share"),
        _ => PathBuf::from("/tmp"),
    };
    base.join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_xdg_then_home() {
        let xdg = Path::new("/xdg");
        let home = Path::new("/home/me");
        assert_eq!(resolve(Some(xdg), Some(home)), PathBuf::from("/xdg/snapit"));
        assert_eq!(
            resolve(None, Some(home)),
            PathBuf::from("/home/me/.local/share/snapit")
        );
        assert_eq!(
            resolve(Some(Path::new("")), Some(home)),
            PathBuf::from("/home/me/.local/share/snapit")
        );
        assert_eq!(resolve(None, None), PathBuf::from("/tmp/snapit"));
    }
}
