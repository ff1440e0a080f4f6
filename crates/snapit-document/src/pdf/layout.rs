// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fit-to-page layout for image pages.

/// Where an image lands on a page, in millimetres from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Scale an image of `img_w`×`img_h` pixels to fill the printable area of a
/// `page_mm` page (fixed `margin_mm` on every side) without distortion, and
/// centre it.
///
/// The image touches the printable area on its constraining axis, whether
/// that means shrinking or enlarging it.
pub fn fit_to_page(img_w: u32, img_h: u32, page_mm: (f32, f32), margin_mm: f32) -> Placement {
    let (page_w, page_h) = page_mm;
    let max_w = page_w - 2.0 * margin_mm;
    let max_h = page_h - 2.0 * margin_mm;

    let img_ratio = img_w.max(1) as f32 / img_h.max(1) as f32;
    let (width_mm, height_mm) = if img_ratio > max_w / max_h {
        (max_w, max_w / img_ratio)
    } else {
        (max_h * img_ratio, max_h)
    };

    Placement {
        x_mm: (page_w - width_mm) / 2.0,
        y_mm: (page_h - height_mm) / 2.0,
        width_mm,
        height_mm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: (f32, f32) = (210.0, 297.0);

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn landscape_image_is_width_bound() {
        let p = fit_to_page(1920, 1080, A4, 10.0);
        assert!(close(p.width_mm, 190.0));
        assert!(close(p.height_mm, 190.0 * 1080.0 / 1920.0));
        assert!(close(p.x_mm, 10.0));
        assert!(close(p.y_mm, (297.0 - p.height_mm) / 2.0));
    }

    #[test]
    fn portrait_image_is_height_bound() {
        let p = fit_to_page(1000, 3000, A4, 10.0);
        assert!(close(p.height_mm, 277.0));
        assert!(close(p.width_mm, 277.0 / 3.0));
        assert!(close(p.y_mm, 10.0));
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        for (w, h) in [(640, 480), (100, 1000), (4096, 17), (1, 1), (2480, 3508)] {
            let p = fit_to_page(w, h, A4, 10.0);
            let expected = w as f32 / h as f32;
            assert!(
                (p.width_mm / p.height_mm - expected).abs() / expected < 1e-3,
                "{w}x{h} distorted"
            );
            assert!(p.width_mm <= 190.0 + 1e-3 && p.height_mm <= 277.0 + 1e-3);
        }
    }

    #[test]
    fn small_images_are_enlarged() {
        let p = fit_to_page(19, 10, A4, 10.0);
        assert!(close(p.width_mm, 190.0));
    }
}
