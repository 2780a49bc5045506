//! Label placement within the despatch panel
//!
//! Given the panel, the label's natural size and the configured rotation,
//! compute a uniform scale and the transformation that draws the label
//! centered horizontally and resting on the bottom of the panel.

use crate::types::{Rect, Rotation};

/// Final placement of a label on a despatch page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    /// Uniform scale factor applied to the label
    pub scale: f32,
    /// Visual bounding box of the drawn (scaled, rotated) label
    pub drawn: Rect,
    pub rotation: Rotation,
}

impl LabelPlacement {
    /// Transformation matrix `[a b c d e f]` mapping label space (origin at
    /// the label's MediaBox corner) onto the page.
    ///
    /// Rotations are clockwise; the matrix includes the translation that
    /// brings the rotated box back onto `drawn`.
    pub fn matrix(&self, label_width: f32, label_height: f32) -> [f32; 6] {
        let s = self.scale;
        let (x, y) = (self.drawn.x, self.drawn.y);
        match self.rotation {
            Rotation::None => [s, 0.0, 0.0, s, x, y],
            Rotation::Clockwise90 => [0.0, -s, s, 0.0, x, y + s * label_width],
            Rotation::Clockwise180 => [-s, 0.0, 0.0, -s, x + s * label_width, y + s * label_height],
            Rotation::Clockwise270 => [0.0, s, -s, 0.0, x + s * label_height, y],
        }
    }
}

/// Area a label may occupy: the panel shrunk by the inset on every side
pub fn fit_area(panel: &Rect, inset: f32) -> Rect {
    panel.inset(inset)
}

/// Fit a label of natural size `width` x `height` into `area`.
///
/// The scale is uniform, `min(W / w', H / h')` where `(w', h')` is the
/// label's visual size after rotation. The label is centered horizontally
/// and anchored to the bottom of `area`.
pub fn place_label(area: &Rect, width: f32, height: f32, rotation: Rotation) -> LabelPlacement {
    let (visual_w, visual_h) = if rotation.is_quarter_turn() {
        (height, width)
    } else {
        (width, height)
    };

    let scale = calculate_fit_scale(visual_w, visual_h, area.width, area.height);
    let drawn_w = visual_w * scale;
    let drawn_h = visual_h * scale;

    LabelPlacement {
        scale,
        drawn: Rect::new(
            area.x + (area.width - drawn_w) / 2.0,
            area.y,
            drawn_w,
            drawn_h,
        ),
        rotation,
    }
}

/// Calculate scale factor for fitting source to target dimensions.
fn calculate_fit_scale(src_width: f32, src_height: f32, target_width: f32, target_height: f32) -> f32 {
    if src_width <= 0.0 || src_height <= 0.0 {
        return 0.0;
    }
    let scale_w = target_width / src_width;
    let scale_h = target_height / src_height;
    scale_w.min(scale_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.001;

    fn panel() -> Rect {
        Rect::new(36.0, 36.0, 523.28, 380.0)
    }

    fn all_rotations() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Clockwise90,
            Rotation::Clockwise180,
            Rotation::Clockwise270,
        ]
    }

    #[test]
    fn test_scale_matches_min_ratio_for_all_rotations() {
        let area = fit_area(&panel(), 10.0);
        for (w, h) in [(288.0, 432.0), (432.0, 288.0), (100.0, 100.0), (595.0, 842.0)] {
            for rotation in all_rotations() {
                let placement = place_label(&area, w, h, rotation);
                let (vw, vh) = if rotation.is_quarter_turn() { (h, w) } else { (w, h) };
                let expected = (area.width / vw).min(area.height / vh);
                assert!((placement.scale - expected).abs() < EPS);
                assert!((placement.drawn.width - vw * expected).abs() < EPS);
                assert!((placement.drawn.height - vh * expected).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_no_overflow_and_tight_on_one_axis() {
        let area = fit_area(&panel(), 10.0);
        for (w, h) in [(288.0, 432.0), (432.0, 288.0), (50.0, 10.0), (10.0, 50.0)] {
            for rotation in all_rotations() {
                let p = place_label(&area, w, h, rotation);
                assert!(p.drawn.width <= area.width + EPS);
                assert!(p.drawn.height <= area.height + EPS);
                let tight_w = (p.drawn.width - area.width).abs() < EPS;
                let tight_h = (p.drawn.height - area.height).abs() < EPS;
                assert!(tight_w || tight_h);
            }
        }
    }

    #[test]
    fn test_centered_and_bottom_anchored() {
        let area = fit_area(&panel(), 10.0);
        // 4x6 inch label rotated onto its side
        let p = place_label(&area, 288.0, 432.0, Rotation::Clockwise90);
        assert!((p.drawn.y - (36.0 + 10.0)).abs() < EPS);
        let left_gap = p.drawn.x - area.x;
        let right_gap = area.right() - p.drawn.right();
        assert!((left_gap - right_gap).abs() < EPS);
    }

    #[test]
    fn test_portrait_label_upright_is_height_limited() {
        let area = Rect::new(0.0, 0.0, 500.0, 360.0);
        let p = place_label(&area, 288.0, 432.0, Rotation::None);
        assert!((p.scale - 360.0 / 432.0).abs() < EPS);
        assert!((p.drawn.height - 360.0).abs() < EPS);
        assert!((p.drawn.x - (500.0 - 240.0) / 2.0).abs() < EPS);
    }

    /// Apply a cm matrix to a point
    fn apply(m: [f32; 6], u: f32, v: f32) -> (f32, f32) {
        (m[0] * u + m[2] * v + m[4], m[1] * u + m[3] * v + m[5])
    }

    #[test]
    fn test_matrix_maps_label_corners_onto_drawn_box() {
        let area = fit_area(&panel(), 10.0);
        let (w, h) = (288.0, 432.0);
        for rotation in all_rotations() {
            let p = place_label(&area, w, h, rotation);
            let m = p.matrix(w, h);
            let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(u, v)| apply(m, u, v));
            let min_x = corners.iter().map(|c| c.0).fold(f32::MAX, f32::min);
            let max_x = corners.iter().map(|c| c.0).fold(f32::MIN, f32::max);
            let min_y = corners.iter().map(|c| c.1).fold(f32::MAX, f32::min);
            let max_y = corners.iter().map(|c| c.1).fold(f32::MIN, f32::max);
            assert!((min_x - p.drawn.x).abs() < 0.01, "{:?}", rotation);
            assert!((max_x - p.drawn.right()).abs() < 0.01, "{:?}", rotation);
            assert!((min_y - p.drawn.y).abs() < 0.01, "{:?}", rotation);
            assert!((max_y - p.drawn.top()).abs() < 0.01, "{:?}", rotation);
        }
    }

    #[test]
    fn test_clockwise_90_moves_label_top_to_the_right() {
        let p = place_label(&Rect::new(0.0, 0.0, 100.0, 100.0), 100.0, 50.0, Rotation::Clockwise90);
        let m = p.matrix(100.0, 50.0);
        // Top-left corner of the label ends up at the top-right of the box
        let (x, y) = apply(m, 0.0, 50.0);
        assert!((x - p.drawn.right()).abs() < 0.01);
        assert!((y - p.drawn.top()).abs() < 0.01);
    }
}
