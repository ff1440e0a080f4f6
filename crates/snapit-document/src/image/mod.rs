// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: crop sessions, rotation, bounded resampling, and encoding.

pub mod crop;
pub mod processor;

pub use crop::{CropOutput, CropRegion, CropSession};
pub use processor::{ImageProcessor, reencode_as_png};
