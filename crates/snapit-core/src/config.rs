// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

use crate::{ImageExportFormat, PaperSize};

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format preselected for single-image downloads.
    pub default_image_format: ImageExportFormat,
    /// JPEG quality (1-100) for captured frames and cropped results.
    pub jpeg_quality: u8,
    /// Longest edge allowed for a cropped capture, in pixels.
    pub max_capture_edge: u32,
    /// Paper size of exported PDFs.
    pub pdf_paper_size: PaperSize,
    /// Margin on every side of an exported PDF page.
    pub pdf_margin_mm: f32,
    /// Main window size (width, height).
    pub main_window_size: (u32, u32),
    /// Capture window size (width, height).
    pub capture_window_size: (u32, u32),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_image_format: ImageExportFormat::Jpeg,
            jpeg_quality: 95,
            max_capture_edge: 4096,
            pdf_paper_size: PaperSize::A4,
            pdf_margin_mm: 10.0,
            main_window_size: (540, 720),
            capture_window_size: (800, 700),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "default_image_format": "Png", "jpeg_quality": 80 }"#)
                .expect("parse");
        assert_eq!(config.default_image_format, ImageExportFormat::Png);
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.max_capture_edge, 4096);
        assert_eq!(config.capture_window_size, (800, 700));
    }
}
