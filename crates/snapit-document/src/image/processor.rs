// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: quarter-turn rotation, cropping, bounded resampling, and
// JPEG/PNG encoding for captured document images.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops::FilterType};
use snapit_core::error::SnapitError;
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&frame)?
///     .rotate_quarters(1)
///     .crop(10, 10, 600, 800)
///     .fit_within(4096, 4096)
///     .to_jpeg_bytes(95)?;
/// ```
#[derive(Clone)]
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapitError> {
        let img = image::load_from_memory(data).map_err(|err| {
            SnapitError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Rotate clockwise by `quarters` × 90°. Negative values rotate
    /// counter-clockwise. Lossless.
    pub fn rotate_quarters(self, quarters: i32) -> Self {
        let image = match quarters.rem_euclid(4) {
            1 => self.image.rotate90(),
            2 => self.image.rotate180(),
            3 => self.image.rotate270(),
            _ => self.image,
        };
        Self { image }
    }

    /// Crop a rectangular region from the image.
    ///
    /// `x` and `y` are the top-left corner; values are clamped to image bounds.
    #[instrument(skip(self), fields(x, y, width, height))]
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let safe_x = x.min(img_w.saturating_sub(1));
        let safe_y = y.min(img_h.saturating_sub(1));
        let safe_w = width.min(img_w - safe_x).max(1);
        let safe_h = height.min(img_h - safe_y).max(1);

        debug!(safe_x, safe_y, safe_w, safe_h, "Cropping image");

        let cropped = self.image.crop_imm(safe_x, safe_y, safe_w, safe_h);
        Self { image: cropped }
    }

    /// Downscale to fit within `max_width` x `max_height`, preserving aspect
    /// ratio, with Lanczos3 filtering. Images already inside the bounds are
    /// left untouched.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn fit_within(self, max_width: u32, max_height: u32) -> Self {
        if self.image.width() <= max_width && self.image.height() <= max_height {
            return self;
        }
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            max_width,
            max_height,
            "Downscaling image"
        );
        let resized = self.image.resize(max_width, max_height, FilterType::Lanczos3);
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Resize complete"
        );
        Self { image: resized }
    }

    /// Composite any transparency onto a white background.
    pub fn flatten_onto_white(self) -> Self {
        if !self.image.color().has_alpha() {
            return self;
        }
        let rgba = self.image.to_rgba8();
        let mut canvas = RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
        image::imageops::overlay(&mut canvas, &rgba, 0, 0);
        Self {
            image: DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, SnapitError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, SnapitError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder).map_err(|err| {
            SnapitError::ImageError(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }
}

/// Re-encode any supported image as PNG by decoding and redrawing its pixels.
pub fn reencode_as_png(data: &[u8]) -> Result<Vec<u8>, SnapitError> {
    ImageProcessor::from_bytes(data)?.to_png_bytes()
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, SnapitError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        SnapitError::ImageError(format!("image encoding failed: {}", err))
    })?;
    Ok(buffer)
}
