//! Placement engine — randomized collision-free positioning on the wall.
//!
//! ALGORITHM
//! =========
//! Rejection sampling inside an annulus centred on the origin:
//!
//! - `expansion = 0` for the first 100 attempts, then `5 * (attempt - 100)`
//! - `outer = 500 + 10 * N + expansion`, `inner = max(0, outer - 500)`
//! - radius `r = sqrt(u * (outer² - inner²) + inner²)` for uniform `u`, so
//!   points are uniform by area rather than by radius
//!
//! Each candidate gets a random rotation, font size and palette colour, and
//! is accepted on the first draw whose padded polygon clears every existing
//! item. The ring drifts outward as the wall fills and as attempts fail.
//! Nothing already placed is ever moved.
//!
//! Cost is O(N) per attempt and O(N · attempts) in the worst case.

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::DEFAULT_PLACEMENT_MAX_ATTEMPTS;
use crate::geometry::{self, COLLISION_PADDING, Corners};
use crate::state::CanvasItem;

/// Width of the sampling ring in world units.
const RING_WIDTH: f64 = 500.0;
/// Outer radius growth per existing item.
const RADIUS_PER_ITEM: f64 = 10.0;
/// Attempts before the ring starts expanding.
const EXPANSION_GRACE: u32 = 100;
/// Outer radius growth per attempt past the grace period.
const EXPANSION_STEP: f64 = 5.0;

pub const MIN_ROTATION: f64 = -70.0;
pub const MAX_ROTATION: f64 = 70.0;
pub const MIN_FONT_SIZE: u32 = 24;
pub const MAX_FONT_SIZE: u32 = 64;

pub const PALETTE: [&str; 8] = ["#FF6B6B", "#4ECDC4", "#FFE66D", "#1A535C", "#FF9F1C", "#6A4C93", "#8AC926", "#1982C4"];

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("the wall is congested here, try again (no free spot after {attempts} attempts)")]
    Congested { attempts: u32 },
}

impl crate::frame::ErrorCode for PlacementError {
    fn error_code(&self) -> &'static str {
        "E_CONGESTED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// `(inner, outer)` radii of the sampling ring for a wall of `existing`
/// items on the given zero-based attempt.
#[must_use]
pub fn sampling_annulus(existing: usize, attempt: u32) -> (f64, f64) {
    let expansion = if attempt <= EXPANSION_GRACE {
        0.0
    } else {
        EXPANSION_STEP * f64::from(attempt - EXPANSION_GRACE)
    };
    #[allow(clippy::cast_precision_loss)]
    let outer = RING_WIDTH + RADIUS_PER_ITEM * existing as f64 + expansion;
    let inner = (outer - RING_WIDTH).max(0.0);
    (inner, outer)
}

/// Map `u ∈ [0, 1)` to a radius that is area-uniform over the ring.
#[must_use]
pub fn ring_radius(u: f64, inner: f64, outer: f64) -> f64 {
    (u * (outer * outer - inner * inner) + inner * inner).sqrt()
}

#[derive(Debug, Clone, Copy)]
pub struct PlacementEngine {
    max_attempts: u32,
}

impl PlacementEngine {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Find a spot for `text` that clears every item in `existing`.
    ///
    /// # Errors
    ///
    /// Returns `Congested` when the attempt budget runs out.
    pub fn place<R: Rng>(
        &self,
        rng: &mut R,
        text: &str,
        existing: &[CanvasItem],
        timestamp: i64,
    ) -> Result<CanvasItem, PlacementError> {
        let obstacles: Vec<Corners> = existing.iter().map(geometry::item_corners).collect();

        for attempt in 0..self.max_attempts {
            let (inner, outer) = sampling_annulus(existing.len(), attempt);
            let angle = rng.random_range(0.0..TAU);
            let radius = ring_radius(rng.random::<f64>(), inner, outer);
            let (sin, cos) = angle.sin_cos();
            let x = radius * cos;
            let y = radius * sin;
            let rotation = rng.random_range(MIN_ROTATION..=MAX_ROTATION);
            let font_size = rng.random_range(MIN_FONT_SIZE..=MAX_FONT_SIZE);
            let color = PALETTE[rng.random_range(0..PALETTE.len())];

            let (w, h) = geometry::text_extent(text, font_size);
            let candidate = geometry::rect_corners(x, y, w, h, rotation, COLLISION_PADDING);
            if obstacles.iter().all(|o| !geometry::intersects(&candidate, o)) {
                tracing::debug!(attempt, existing = existing.len(), "placement accepted");
                return Ok(CanvasItem {
                    text: text.to_owned(),
                    x,
                    y,
                    rotation,
                    font_size,
                    color: color.to_owned(),
                    timestamp,
                });
            }
        }

        Err(PlacementError::Congested { attempts: self.max_attempts })
    }
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEMENT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
#[path = "placement_test.rs"]
mod tests;
