// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SnapIt: the two surface state machines.
//
// `CaptureFlow` drives the camera surface (Camera → Edit) and hands its
// result over shared storage. `DocumentAssemblyFlow` drives the main surface
// (Launcher → Preview → PdfReview), consuming captures and exporting them.
// Both are cheap-to-clone controllers over the capability traits.

pub mod assembly;
pub mod capture;
pub mod countdown;
pub mod status;

pub use assembly::{AssemblySnapshot, DocumentAssemblyFlow};
pub use capture::{CaptureFlow, CapturePhase, CaptureView};
pub use countdown::{Tick, run_countdown};
pub use status::{StatusMessage, Tone};
