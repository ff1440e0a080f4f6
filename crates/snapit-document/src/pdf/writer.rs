// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: assemble captured images into one multi-page PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use snapit_core::PaperSize;
use snapit_core::error::SnapitError;
use tracing::{debug, info, instrument, warn};

use super::layout::fit_to_page;

/// Resolution the raw image is registered at; placement scales from here.
const IMAGE_DPI: f32 = 150.0;

/// Builds multi-page image PDFs: one image per page, fitted and centred.
pub struct PdfWriter {
    paper_size: PaperSize,
    margin_mm: f32,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize, margin_mm: f32) -> Self {
        Self {
            paper_size,
            margin_mm,
            title: None,
        }
    }

    /// A4 with a 10 mm margin.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 10.0)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Create one PDF with a page per encoded image, in the given order.
    ///
    /// Every image is decoded before anything is laid out; if any fails, the
    /// whole export is abandoned with [`SnapitError::PageDecode`] naming the
    /// 1-based page.
    #[instrument(skip(self, images), fields(pages = images.len()))]
    pub fn create_from_images(&self, images: &[&[u8]]) -> Result<Vec<u8>, SnapitError> {
        if images.is_empty() {
            return Err(SnapitError::PdfError("no pages added".into()));
        }

        let decoded = images
            .iter()
            .enumerate()
            .map(|(idx, bytes)| {
                ::image::load_from_memory(bytes).map_err(|err| {
                    warn!(page = idx + 1, error = %err, "Page image failed to decode");
                    SnapitError::PageDecode {
                        page: idx as u32 + 1,
                        reason: err.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<DynamicImage>, SnapitError>>()?;

        let title = self.title.as_deref().unwrap_or("SnapIt Document");
        info!(paper = ?self.paper_size, title, "Creating multi-page PDF");

        let (page_w_mm, page_h_mm) = self.paper_size.dimensions_mm();
        let mut doc = PdfDocument::new(title);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(decoded.len());

        for (idx, dynamic_image) in decoded.into_iter().enumerate() {
            let img_width = dynamic_image.width();
            let img_height = dynamic_image.height();

            let placement =
                fit_to_page(img_width, img_height, (page_w_mm, page_h_mm), self.margin_mm);

            let rgb_image = dynamic_image.to_rgb8();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb_image.into_raw()),
                width: img_width as usize,
                height: img_height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // Native size at IMAGE_DPI, then scale to the placement box.
            let native_w_pt = img_width as f32 / IMAGE_DPI * 72.0;
            let native_h_pt = img_height as f32 / IMAGE_DPI * 72.0;
            let target_w_pt = Mm(placement.width_mm).into_pt().0;
            let target_h_pt = Mm(placement.height_mm).into_pt().0;

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Mm(placement.x_mm).into_pt()),
                    translate_y: Some(Mm(placement.y_mm).into_pt()),
                    scale_x: Some(target_w_pt / native_w_pt),
                    scale_y: Some(target_h_pt / native_h_pt),
                    dpi: Some(IMAGE_DPI),
                    rotate: None,
                },
            }];

            debug!(
                page = idx + 1,
                width_mm = placement.width_mm,
                height_mm = placement.height_mm,
                "Image placed on page"
            );
            pages.push(PdfPage::new(Mm(page_w_mm), Mm(page_h_mm), ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "PDF serialised with warnings");
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, 0, 0])));
        crate::ImageProcessor::from_dynamic(img)
            .to_jpeg_bytes(90)
            .expect("encode")
    }

    /// Pixel size of the single image drawn on each page, in page order.
    fn page_image_sizes(pdf: &lopdf::Document) -> Vec<(i64, i64)> {
        pdf.get_pages()
            .values()
            .map(|&page_id| {
                let images = pdf.get_page_images(page_id).expect("page images");
                assert_eq!(images.len(), 1, "one image per page");
                (images[0].width, images[0].height)
            })
            .collect()
    }

    #[test]
    fn one_page_per_image_in_order() {
        let wide = jpeg(30, 10, 10);
        let tall = jpeg(10, 30, 120);
        let square = jpeg(20, 20, 250);
        let pdf = PdfWriter::a4()
            .create_from_images(&[wide.as_slice(), tall.as_slice(), square.as_slice()])
            .expect("pdf");

        assert!(pdf.starts_with(b"%PDF"));
        let parsed = lopdf::Document::load_mem(&pdf).expect("parse");
        assert_eq!(parsed.get_pages().len(), 3);
        assert_eq!(page_image_sizes(&parsed), vec![(30, 10), (10, 30), (20, 20)]);
    }

    #[test]
    fn undecodable_page_aborts_with_its_number() {
        let good = jpeg(20, 20, 0);
        let err = PdfWriter::a4()
            .create_from_images(&[good.as_slice(), good.as_slice(), b"garbage".as_slice()])
            .expect_err("must fail");
        match err {
            SnapitError::PageDecode { page, .. } => assert_eq!(page, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_page_set_is_rejected() {
        assert!(PdfWriter::a4().create_from_images(&[]).is_err());
    }
}
