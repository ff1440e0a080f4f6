// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to a short status line, flagged with
// whether trying the same action again may help.

use crate::error::{CameraFailure, SnapitError};

/// A human-readable error.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    /// Trying the same action again may work without the user changing
    /// anything.
    pub retriable: bool,
}

/// Message shown inline in the capture surface when the camera fails.
pub fn camera_message(failure: &CameraFailure) -> String {
    let reason = match failure {
        CameraFailure::PermissionDenied => {
            "Please allow camera access in your settings.".to_string()
        }
        CameraFailure::NoDevice => "No camera found on this device.".to_string(),
        CameraFailure::Other(detail) => detail.clone(),
    };
    format!("Camera access failed. {reason}")
}

/// Convert a `SnapitError` into a `HumanError`.
pub fn humanize_error(err: &SnapitError) -> HumanError {
    match err {
        SnapitError::Camera(failure) => HumanError {
            message: camera_message(failure),
            retriable: matches!(failure, CameraFailure::Other(_)),
        },

        SnapitError::Storage(_) | SnapitError::Database(_) => HumanError {
            message: "Couldn't reach local storage. Try again.".into(),
            retriable: true,
        },

        SnapitError::Window(_) => HumanError {
            message: "Failed to open camera".into(),
            retriable: true,
        },

        SnapitError::Download(_) => HumanError {
            message: "Failed to download".into(),
            retriable: true,
        },

        SnapitError::Clipboard(_) => HumanError {
            message: "Failed to copy".into(),
            retriable: true,
        },

        SnapitError::Bridge(_) => HumanError {
            message: "The app lost contact with its host. Try again.".into(),
            retriable: true,
        },

        SnapitError::PlatformUnavailable => HumanError {
            message: "This feature isn't available here.".into(),
            retriable: false,
        },

        SnapitError::ImageError(_) | SnapitError::InvalidPayload(_) => HumanError {
            message: "This image couldn't be processed.".into(),
            retriable: false,
        },

        SnapitError::PdfError(detail) => HumanError {
            message: format!("Failed to generate PDF: {detail}"),
            retriable: false,
        },

        SnapitError::PageDecode { page, .. } => HumanError {
            message: format!("Failed to generate PDF: page {page} could not be loaded"),
            retriable: false,
        },

        SnapitError::InvalidState(_) => HumanError {
            message: "That action isn't available right now.".into(),
            retriable: false,
        },

        SnapitError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "No permission to write there. Choose another folder.".into(),
                    retriable: false,
                }
            } else {
                HumanError {
                    message: "There was a problem writing the file.".into(),
                    retriable: true,
                }
            }
        }

        SnapitError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            retriable: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_denied_needs_user_action() {
        let human = humanize_error(&SnapitError::Camera(CameraFailure::PermissionDenied));
        assert!(!human.retriable);
        assert_eq!(
            human.message,
            "Camera access failed. Please allow camera access in your settings."
        );
    }

    #[test]
    fn other_camera_failures_are_retriable() {
        let human = humanize_error(&SnapitError::Camera(CameraFailure::Other(
            "Could not start video source".into(),
        )));
        assert!(human.retriable);
        assert_eq!(human.message, "Camera access failed. Could not start video source");
    }

    #[test]
    fn missing_camera_message() {
        assert_eq!(
            camera_message(&CameraFailure::NoDevice),
            "Camera access failed. No camera found on this device."
        );
    }

    #[test]
    fn page_decode_names_the_page() {
        let human = humanize_error(&SnapitError::PageDecode {
            page: 3,
            reason: "bad header".into(),
        });
        assert!(human.message.contains("page 3"));
        assert!(!human.retriable);
    }
}
