// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// snapit-document — Document processing for SnapIt.
//
// Provides the crop/rotate session behind the edit view, export encoding
// (JPEG, lossless PNG), and multi-page PDF assembly of captured pages.

pub mod image;
pub mod pdf;

pub use self::image::crop::{CropOutput, CropRegion, CropSession};
pub use self::image::processor::{ImageProcessor, reencode_as_png};
pub use pdf::writer::PdfWriter;
