//! Collision geometry for wall items.
//!
//! DESIGN
//! ======
//! Each item occupies a rotated rectangle derived from a text-width
//! heuristic (`chars * font_size * 0.6` wide, `font_size` tall). The
//! rectangle is inflated by `COLLISION_PADDING` before rotation, so items
//! that merely come close still count as colliding. Overlap between two
//! rectangles is decided with the separating-axis theorem, which is exact
//! for convex quadrilaterals.
//!
//! The width heuristic is not glyph-accurate and is not meant to be.

use crate::state::CanvasItem;

/// World-unit buffer added to each half-extent before rotation.
pub const COLLISION_PADDING: f64 = 10.0;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

/// Four corners of a rotated rectangle, in winding order.
pub type Corners = [(f64, f64); 4];

/// Approximate `(width, height)` of `text` rendered at `font_size`.
#[must_use]
pub fn text_extent(text: &str, font_size: u32) -> (f64, f64) {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f64;
    let size = f64::from(font_size);
    (chars * size * GLYPH_WIDTH_RATIO, size)
}

/// Corners of a `width × height` rectangle centred on `(cx, cy)`, grown by
/// `padding` on every side and rotated `angle_deg` about its centre.
#[must_use]
pub fn rect_corners(cx: f64, cy: f64, width: f64, height: f64, angle_deg: f64, padding: f64) -> Corners {
    let hw = width / 2.0 + padding;
    let hh = height / 2.0 + padding;
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let local = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
    local.map(|(lx, ly)| (cx + lx * cos - ly * sin, cy + lx * sin + ly * cos))
}

/// Padded collision polygon for a placed item.
#[must_use]
pub fn item_corners(item: &CanvasItem) -> Corners {
    let (w, h) = text_extent(&item.text, item.font_size);
    rect_corners(item.x, item.y, w, h, item.rotation, COLLISION_PADDING)
}

fn project(corners: &Corners, ax: f64, ay: f64) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &(x, y) in corners {
        let dot = x * ax + y * ay;
        lo = lo.min(dot);
        hi = hi.max(dot);
    }
    (lo, hi)
}

/// True unless some edge normal of either polygon separates them.
///
/// Touching intervals count as overlap; only a strict gap separates.
#[must_use]
pub fn intersects(a: &Corners, b: &Corners) -> bool {
    for poly in [a, b] {
        for i in 0..poly.len() {
            let (x1, y1) = poly[i];
            let (x2, y2) = poly[(i + 1) % poly.len()];
            let (ax, ay) = (y2 - y1, x1 - x2);
            let (min_a, max_a) = project(a, ax, ay);
            let (min_b, max_b) = project(b, ax, ay);
            if max_a < min_b || max_b < min_a {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;
