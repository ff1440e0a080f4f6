// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page layout and multi-page document assembly.

pub mod layout;
pub mod writer;

pub use layout::{Placement, fit_to_page};
pub use writer::PdfWriter;
