// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for SnapIt.

use thiserror::Error;

/// Why the camera could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraFailure {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    NoDevice,

    #[error("{0}")]
    Other(String),
}

impl CameraFailure {
    /// Classify a host-reported error name (`NotAllowedError`, `NotFoundError`, ...).
    pub fn from_error_name(name: &str, detail: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => Self::NoDevice,
            _ if detail.is_empty() => Self::Other(name.to_string()),
            _ => Self::Other(detail.to_string()),
        }
    }
}

/// Top-level error type for all SnapIt operations.
#[derive(Debug, Error)]
pub enum SnapitError {
    // -- Device errors --
    #[error("camera unavailable: {0}")]
    Camera(#[from] CameraFailure),

    // -- Host-service errors --
    #[error("storage operation failed: {0}")]
    Storage(String),

    #[error("window operation failed: {0}")]
    Window(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("clipboard write failed: {0}")]
    Clipboard(String),

    #[error("host bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("page {page} could not be loaded: {reason}")]
    PageDecode { page: u32, reason: String },

    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("operation not valid in the current state: {0}")]
    InvalidState(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SnapitError>;
