// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for SnapIt.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::data_url;
use crate::error::{Result, SnapitError};

// ---------------------------------------------------------------------------
// Shared storage mailbox
// ---------------------------------------------------------------------------

/// Storage key holding the encoded image (`data:` URL).
pub const KEY_CAPTURED_IMAGE: &str = "capturedImage";
/// Storage key holding the capture's [`ImageId`].
pub const KEY_IMAGE_ID: &str = "imageId";
/// Storage key holding the capture timestamp (unix millis).
pub const KEY_TIMESTAMP: &str = "timestamp";

/// The three mailbox keys. Always written together and removed together.
pub const CAPTURE_KEYS: [&str; 3] = [KEY_CAPTURED_IMAGE, KEY_IMAGE_ID, KEY_TIMESTAMP];

/// Key/value snapshot of shared storage.
pub type StorageMap = BTreeMap<String, Value>;

/// One changed key in a storage notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    pub new_value: Option<Value>,
    /// Not every backend can report this.
    pub old_value: Option<Value>,
}

/// Storage notification delivered to every listening surface.
pub type StorageChanges = BTreeMap<String, StorageChange>;

/// Build a notification from a set of written values (no old values).
pub fn changes_from_written(written: &StorageMap) -> StorageChanges {
    written
        .iter()
        .map(|(key, value)| {
            (
                key.clone(),
                StorageChange {
                    new_value: Some(value.clone()),
                    old_value: None,
                },
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Captures and pages
// ---------------------------------------------------------------------------

/// Identifier unique per capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    /// `img_<unix-millis>_<9 random chars>`.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("img_{millis}_{}", &suffix[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An encoded image handed from the capture surface to the main surface.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    /// Encoded pixels (JPEG from the capture flow).
    pub bytes: Vec<u8>,
    pub mime: String,
    pub id: ImageId,
    pub timestamp: DateTime<Utc>,
}

impl CapturedImage {
    /// A fresh JPEG capture with a newly generated id.
    pub fn new_jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "image/jpeg".into(),
            id: ImageId::generate(),
            timestamp: Utc::now(),
        }
    }

    /// The payload as a `data:` URL.
    pub fn data_url(&self) -> String {
        data_url::encode(&self.mime, &self.bytes)
    }

    /// The three mailbox entries for this capture.
    pub fn to_storage(&self) -> StorageMap {
        let mut map = StorageMap::new();
        map.insert(KEY_CAPTURED_IMAGE.into(), Value::String(self.data_url()));
        map.insert(KEY_IMAGE_ID.into(), Value::String(self.id.0.clone()));
        map.insert(
            KEY_TIMESTAMP.into(),
            Value::from(self.timestamp.timestamp_millis()),
        );
        map
    }

    /// Read a capture out of a storage snapshot.
    ///
    /// `Ok(None)` when the image or id key is absent; an error when they are
    /// present but malformed.
    pub fn from_storage(map: &StorageMap) -> Result<Option<Self>> {
        let (Some(image), Some(id)) = (map.get(KEY_CAPTURED_IMAGE), map.get(KEY_IMAGE_ID)) else {
            return Ok(None);
        };
        Self::from_values(image, id, map.get(KEY_TIMESTAMP)).map(Some)
    }

    /// Read a capture straight from a change notification, if it carries
    /// all of it.
    pub fn from_changes(changes: &StorageChanges) -> Result<Option<Self>> {
        let new_value = |key: &str| changes.get(key).and_then(|c| c.new_value.as_ref());
        let (Some(image), Some(id)) = (new_value(KEY_CAPTURED_IMAGE), new_value(KEY_IMAGE_ID))
        else {
            return Ok(None);
        };
        Self::from_values(image, id, new_value(KEY_TIMESTAMP)).map(Some)
    }

    fn from_values(image: &Value, id: &Value, timestamp: Option<&Value>) -> Result<Self> {
        let url = image
            .as_str()
            .ok_or_else(|| SnapitError::InvalidPayload("capturedImage is not a string".into()))?;
        let id = id
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SnapitError::InvalidPayload("imageId is missing or empty".into()))?;
        let (mime, bytes) = data_url::decode(url)?;
        if bytes.is_empty() {
            return Err(SnapitError::InvalidPayload("capturedImage is empty".into()));
        }

        let timestamp = timestamp
            .and_then(Value::as_i64)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Ok(Self {
            bytes,
            mime,
            id: ImageId(id.to_string()),
            timestamp,
        })
    }
}

/// One accumulated page of the multi-page document.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub image: CapturedImage,
    /// 1-based position in the document.
    pub position: u32,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Flow states
// ---------------------------------------------------------------------------

/// States of the capture surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    /// Live camera preview.
    Camera,
    /// Crop/rotate editor.
    Edit,
}

/// States of the main (document assembly) surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyState {
    Launcher,
    Preview,
    PdfReview,
}

// ---------------------------------------------------------------------------
// Host capabilities
// ---------------------------------------------------------------------------

/// Geometry of a surface to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl WindowConfig {
    /// Centre a `width`×`height` surface on a screen of the given size.
    pub fn centred(url: impl Into<String>, width: u32, height: u32, screen: (u32, u32)) -> Self {
        let left = (screen.0 as i64 - width as i64) / 2;
        let top = (screen.1 as i64 - height as i64) / 2;
        Self {
            url: url.into(),
            width,
            height,
            left: left as i32,
            top: top as i32,
        }
    }
}

/// Host-assigned handle of an opened surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

/// Identity of the surface issuing a host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Result of handing a payload to the host's save mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub success: bool,
    pub path: Option<String>,
}

impl DownloadOutcome {
    pub fn saved(path: impl Into<String>) -> Self {
        Self {
            success: true,
            path: Some(path.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            path: None,
        }
    }
}

/// Result of a best-effort delivery to an external page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl MessageOutcome {
    pub fn delivered() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Message sent to (or received from) an external browsing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMessage {
    pub action: String,
    pub image_data: Option<String>,
    pub filename: Option<String>,
}

impl PageMessage {
    /// The "attach this image" message.
    pub fn attach_image(image_data: String, filename: String) -> Self {
        Self {
            action: "attachImage".into(),
            image_data: Some(image_data),
            filename: Some(filename),
        }
    }
}

/// Static description of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub name: String,
    pub is_desktop_app: bool,
    pub is_extension: bool,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Single-image export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageExportFormat {
    Jpeg,
    /// Lossless; re-encoded from decoded pixels.
    Png,
}

impl ImageExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Standard paper sizes for PDF export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    Letter,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: std::collections::HashSet<ImageId> =
            (0..500).map(|_| ImageId::generate()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.as_str().starts_with("img_")));
    }

    #[test]
    fn storage_entries_carry_the_exact_bytes() {
        let capture = CapturedImage::new_jpeg(vec![1, 2, 3, 250, 251]);
        let map = capture.to_storage();
        assert_eq!(map.len(), 3);

        let read = CapturedImage::from_storage(&map)
            .expect("well-formed")
            .expect("present");
        assert_eq!(read.bytes, capture.bytes);
        assert_eq!(read.id, capture.id);
        assert_eq!(read.mime, "image/jpeg");
        assert_eq!(
            read.timestamp.timestamp_millis(),
            capture.timestamp.timestamp_millis()
        );
    }

    #[test]
    fn missing_keys_mean_no_capture() {
        let mut map = CapturedImage::new_jpeg(vec![9]).to_storage();
        map.remove(KEY_IMAGE_ID);
        assert!(CapturedImage::from_storage(&map).expect("ok").is_none());
        assert!(CapturedImage::from_storage(&StorageMap::new()).expect("ok").is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let mut map = StorageMap::new();
        map.insert(KEY_CAPTURED_IMAGE.into(), Value::from(42));
        map.insert(KEY_IMAGE_ID.into(), Value::from("img_1"));
        assert!(CapturedImage::from_storage(&map).is_err());
    }

    #[test]
    fn change_notification_carries_full_capture() {
        let capture = CapturedImage::new_jpeg(vec![7, 7, 7]);
        let changes = changes_from_written(&capture.to_storage());
        let read = CapturedImage::from_changes(&changes)
            .expect("well-formed")
            .expect("present");
        assert_eq!(read.id, capture.id);
        assert_eq!(read.bytes, capture.bytes);

        let mut partial = changes.clone();
        partial.remove(KEY_IMAGE_ID);
        assert!(CapturedImage::from_changes(&partial).expect("ok").is_none());
    }

    #[test]
    fn centred_window_geometry() {
        let config = WindowConfig::centred("capture", 800, 700, (1920, 1080));
        assert_eq!(config.left, 560);
        assert_eq!(config.top, 190);

        let small = WindowConfig::centred("capture", 800, 700, (640, 480));
        assert_eq!(small.left, -80);
    }
}
