// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop session: the interactive crop/rotate state behind the edit view.
//
// The crop region is always expressed in the coordinates of the *rotated*
// image, so rotating carries the region along with the pixels.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use snapit_core::error::SnapitError;
use tracing::{debug, info, instrument};

use super::processor::ImageProcessor;

/// Smallest crop box edge the editor accepts, in pixels.
pub const MIN_CROP_EDGE: u32 = 50;

/// Rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Output limits for [`CropSession::commit`].
#[derive(Debug, Clone, Copy)]
pub struct CropOutput {
    /// Longest allowed edge on both axes.
    pub max_edge: u32,
    pub jpeg_quality: u8,
}

impl Default for CropOutput {
    fn default() -> Self {
        Self {
            max_edge: 4096,
            jpeg_quality: 95,
        }
    }
}

/// One crop/rotate editing session over a captured still.
pub struct CropSession {
    original: DynamicImage,
    /// Clockwise quarter turns, 0..4.
    quarters: i32,
    region: CropRegion,
}

impl CropSession {
    /// Start a session over encoded image bytes, auto-cropped to the whole image.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn new(data: &[u8]) -> Result<Self, SnapitError> {
        let original = ImageProcessor::from_bytes(data)?.into_dynamic();
        Ok(Self::from_dynamic(original))
    }

    pub fn from_dynamic(original: DynamicImage) -> Self {
        let region = CropRegion::full(original.width(), original.height());
        Self {
            original,
            quarters: 0,
            region,
        }
    }

    /// Dimensions of the image as currently rotated.
    pub fn dimensions(&self) -> (u32, u32) {
        let (w, h) = (self.original.width(), self.original.height());
        if self.quarters % 2 == 0 { (w, h) } else { (h, w) }
    }

    pub fn region(&self) -> CropRegion {
        self.region
    }

    /// Current rotation in degrees (0, 90, 180, 270).
    pub fn rotation_degrees(&self) -> u32 {
        (self.quarters * 90) as u32
    }

    /// Rotate 90° clockwise.
    pub fn rotate_right(&mut self) {
        let (_, h) = self.dimensions();
        let r = self.region;
        self.region = CropRegion {
            x: h - (r.y + r.height),
            y: r.x,
            width: r.height,
            height: r.width,
        };
        self.quarters = (self.quarters + 1).rem_euclid(4);
        debug!(degrees = self.rotation_degrees(), "Rotated right");
    }

    /// Rotate 90° counter-clockwise.
    pub fn rotate_left(&mut self) {
        let (w, _) = self.dimensions();
        let r = self.region;
        self.region = CropRegion {
            x: r.y,
            y: w - (r.x + r.width),
            width: r.height,
            height: r.width,
        };
        self.quarters = (self.quarters - 1).rem_euclid(4);
        debug!(degrees = self.rotation_degrees(), "Rotated left");
    }

    /// Back to no rotation and the automatic full-image crop.
    pub fn reset(&mut self) {
        self.quarters = 0;
        self.region = CropRegion::full(self.original.width(), self.original.height());
    }

    /// Move/resize the crop box. The box is clamped to the image and never
    /// smaller than [`MIN_CROP_EDGE`] (or the image, if that is smaller).
    pub fn set_region(&mut self, region: CropRegion) {
        let (w, h) = self.dimensions();
        let width = region.width.max(MIN_CROP_EDGE).min(w);
        let height = region.height.max(MIN_CROP_EDGE).min(h);
        let x = region.x.min(w - width);
        let y = region.y.min(h - height);
        self.region = CropRegion {
            x,
            y,
            width,
            height,
        };
    }

    /// Render the committed region to JPEG, bounded to `output.max_edge`.
    #[instrument(skip(self), fields(quarters = self.quarters))]
    pub fn commit(&self, output: CropOutput) -> Result<Vec<u8>, SnapitError> {
        let r = self.region;
        let processed = ImageProcessor::from_dynamic(self.original.clone())
            .rotate_quarters(self.quarters)
            .crop(r.x, r.y, r.width, r.height)
            .fit_within(output.max_edge, output.max_edge)
            .flatten_onto_white();

        info!(
            width = processed.width(),
            height = processed.height(),
            "Crop committed"
        );
        processed.to_jpeg_bytes(output.jpeg_quality)
    }
}
