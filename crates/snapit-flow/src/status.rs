// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status line shown at the top of the main surface.

use snapit_core::ImageExportFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Success,
    Error,
}

/// One status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub tone: Tone,
}

impl StatusMessage {
    pub fn neutral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Neutral,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Error,
        }
    }

    pub fn ready() -> Self {
        Self::neutral("Ready to capture")
    }

    pub fn document_ready() -> Self {
        Self::success("Document ready!")
    }

    pub fn pages_in_pdf(count: usize) -> Self {
        Self::neutral(format!("{count} pages in PDF"))
    }

    pub fn downloaded(format: ImageExportFormat) -> Self {
        Self::success(format!("Downloaded as {}!", format.label()))
    }

    pub fn pdf_generated(count: usize) -> Self {
        Self::success(format!("PDF with {count} pages generated!"))
    }

    pub fn download_cancelled() -> Self {
        Self::neutral("Download cancelled")
    }

    pub fn no_image() -> Self {
        Self::error("No image captured")
    }
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self::ready()
    }
}

/// "1 Page Added" / "N Pages Added".
pub fn page_count_label(count: usize) -> String {
    if count == 1 {
        "1 Page Added".to_string()
    } else {
        format!("{count} Pages Added")
    }
}
