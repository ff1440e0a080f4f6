// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera of the capture window's webview, driven through `document::eval`.
//
// All calls must come from tasks of the capture window's own VirtualDom so
// the scripts run in the page that owns the `<video>` element.

use std::cell::Cell;

use dioxus::document;
use serde::Deserialize;
use snapit_bridge::CameraDevice;
use snapit_core::data_url;
use snapit_core::error::{CameraFailure, Result, SnapitError};
use tracing::debug;

/// DOM id of the live preview element.
pub const VIDEO_ELEMENT_ID: &str = "snapit-video";

const ACQUIRE_JS: &str = r#"
const video = document.getElementById("snapit-video");
try {
    const stream = await navigator.mediaDevices.getUserMedia({
        video: { width: { ideal: 1920 }, height: { ideal: 1080 }, facingMode: "environment" },
        audio: false,
    });
    window.__snapitStream = stream;
    if (video) {
        video.srcObject = stream;
        await video.play();
    }
    return { ok: true, name: "", message: "" };
} catch (e) {
    return { ok: false, name: (e && e.name) || "Error", message: (e && e.message) || String(e) };
}
"#;

const RELEASE_JS: &str = r#"
const stream = window.__snapitStream;
if (stream) {
    stream.getTracks().forEach((track) => track.stop());
    window.__snapitStream = null;
}
const video = document.getElementById("snapit-video");
if (video) { video.srcObject = null; }
"#;

#[derive(Debug, Deserialize)]
struct AcquireOutcome {
    ok: bool,
    name: String,
    message: String,
}

impl AcquireOutcome {
    fn into_result(self) -> std::result::Result<(), CameraFailure> {
        if self.ok {
            Ok(())
        } else {
            Err(CameraFailure::from_error_name(&self.name, &self.message))
        }
    }
}

/// Draw the current video frame to a canvas and export it as JPEG.
fn frame_script(jpeg_quality: u8) -> String {
    let quality = f32::from(jpeg_quality.clamp(1, 100)) / 100.0;
    format!(
        r#"
const video = document.getElementById("{VIDEO_ELEMENT_ID}");
if (!video || !video.videoWidth || !video.videoHeight) {{ return null; }}
const canvas = document.createElement("canvas");
canvas.width = video.videoWidth;
canvas.height = video.videoHeight;
canvas.getContext("2d").drawImage(video, 0, 0, canvas.width, canvas.height);
return canvas.toDataURL("image/jpeg", {quality});
"#
    )
}

fn decode_frame(frame: Option<String>) -> Result<Vec<u8>> {
    let url = frame.ok_or_else(|| SnapitError::ImageError("no video frame available".into()))?;
    let (mime, bytes) = data_url::decode(&url)?;
    if mime != "image/jpeg" {
        return Err(SnapitError::InvalidPayload(format!(
            "expected a JPEG frame, got {mime}"
        )));
    }
    Ok(bytes)
}

/// The webview's `getUserMedia` camera.
pub struct WebviewCamera {
    active: Cell<bool>,
    jpeg_quality: u8,
}

impl WebviewCamera {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            active: Cell::new(false),
            jpeg_quality,
        }
    }
}

impl CameraDevice for WebviewCamera {
    async fn acquire(&self) -> std::result::Result<(), CameraFailure> {
        let outcome = document::eval(ACQUIRE_JS)
            .join::<AcquireOutcome>()
            .await
            .map_err(|e| CameraFailure::Other(e.to_string()))?;
        debug!(ok = outcome.ok, name = %outcome.name, "getUserMedia answered");
        outcome.into_result()?;
        self.active.set(true);
        Ok(())
    }

    async fn grab_frame(&self) -> Result<Vec<u8>> {
        let frame = document::eval(&frame_script(self.jpeg_quality))
            .join::<Option<String>>()
            .await
            .map_err(|e| SnapitError::ImageError(format!("frame grab: {e}")))?;
        decode_frame(frame)
    }

    fn release(&self) {
        if self.active.replace(false) {
            debug!("stopping camera tracks");
        }
        // Sent even when inactive: an acquire may still be settling.
        let _ = document::eval(RELEASE_JS);
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}
