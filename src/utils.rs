//! Utility functions for box/grid bookkeeping.

pub mod safe_cast;

use crate::detection::DetectionBox;
use safe_cast::{i32_clamp_to_usize, i32_to_usize};

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)` in grid indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelBounds {
    #[must_use]
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Bounds of `bbox` if it lies entirely inside a `max_width` x `max_height` grid
///
/// The box covers columns `xmin..xmax` and rows `ymin..ymax`.
#[must_use]
pub fn box_within_grid(bbox: &DetectionBox, max_width: usize, max_height: usize) -> Option<PixelBounds> {
    let x0 = i32_to_usize(bbox.xmin).ok()?;
    let y0 = i32_to_usize(bbox.ymin).ok()?;
    let x1 = i32_to_usize(bbox.xmax).ok()?;
    let y1 = i32_to_usize(bbox.ymax).ok()?;

    if x0 > x1 || y0 > y1 || x1 > max_width || y1 > max_height {
        return None;
    }

    Some(PixelBounds { x0, y0, x1, y1 })
}

/// Intersect `bbox` with a `max_width` x `max_height` grid
///
/// Returns `None` if nothing of the box is left.
#[must_use]
pub fn clamp_box_to_grid(bbox: &DetectionBox, max_width: usize, max_height: usize) -> Option<PixelBounds> {
    let bounds = PixelBounds {
        x0: i32_clamp_to_usize(bbox.xmin, max_width),
        y0: i32_clamp_to_usize(bbox.ymin, max_height),
        x1: i32_clamp_to_usize(bbox.xmax, max_width),
        y1: i32_clamp_to_usize(bbox.ymax, max_height),
    };

    if bounds.x0 >= bounds.x1 || bounds.y0 >= bounds.y1 {
        return None;
    }

    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(xmin: i32, xmax: i32, ymin: i32, ymax: i32) -> DetectionBox {
        DetectionBox {
            class: "door".to_string(),
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    #[test]
    fn test_box_within_grid() {
        let bounds = box_within_grid(&bbox(10, 50, 20, 40), 640, 480).unwrap();
        assert_eq!(bounds, PixelBounds { x0: 10, y0: 20, x1: 50, y1: 40 });
        assert_eq!(bounds.width(), 40);
        assert_eq!(bounds.height(), 20);

        // Touching the far edge is fine, the upper bound is exclusive
        assert!(box_within_grid(&bbox(600, 640, 0, 480), 640, 480).is_some());
    }

    #[test]
    fn test_box_within_grid_rejects_overflow() {
        assert!(box_within_grid(&bbox(600, 641, 0, 10), 640, 480).is_none());
        assert!(box_within_grid(&bbox(-1, 10, 0, 10), 640, 480).is_none());
        assert!(box_within_grid(&bbox(640, 700, 0, 10), 640, 480).is_none());
        assert!(box_within_grid(&bbox(0, 10, 0, 481), 640, 480).is_none());
    }

    #[test]
    fn test_clamp_box_to_grid() {
        let bounds = clamp_box_to_grid(&bbox(-20, 700, 470, 500), 640, 480).unwrap();
        assert_eq!(bounds, PixelBounds { x0: 0, y0: 470, x1: 640, y1: 480 });
    }

    #[test]
    fn test_clamp_box_to_grid_empty() {
        // Entirely to the right of the grid
        assert!(clamp_box_to_grid(&bbox(640, 700, 0, 10), 640, 480).is_none());
        // Zero-area box
        assert!(clamp_box_to_grid(&bbox(10, 10, 0, 10), 640, 480).is_none());
        // Entirely above the grid
        assert!(clamp_box_to_grid(&bbox(0, 10, -30, -5), 640, 480).is_none());
    }
}
