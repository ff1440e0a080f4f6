// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export filename generation.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Prefix of every exported file.
pub const FILENAME_PREFIX: &str = "SnapIt";

/// `SnapIt_YYYYMMDD_HHMMSS.<extension>` for the given wall-clock time.
pub fn export_filename_at(at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{FILENAME_PREFIX}_{:04}{:02}{:02}_{:02}{:02}{:02}.{extension}",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// Export filename stamped with the local clock.
pub fn export_filename(extension: &str) -> String {
    export_filename_at(Local::now().naive_local(), extension)
}
