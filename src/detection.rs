//! Detection boxes as produced by the 2D object detector.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned detection box in pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionBox {
    /// Class label reported by the detector
    #[serde(alias = "Class")]
    pub class: String,
    pub xmin: i32,
    pub xmax: i32,
    pub ymin: i32,
    pub ymax: i32,
}

impl DetectionBox {
    /// Create a detection box
    ///
    /// # Errors
    ///
    /// Returns an error if `xmin > xmax` or `ymin > ymax`.
    pub fn new(class: impl Into<String>, xmin: i32, xmax: i32, ymin: i32, ymax: i32) -> Result<Self> {
        let bbox = Self {
            class: class.into(),
            xmin,
            xmax,
            ymin,
            ymax,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check the ordering invariant on the pixel extent
    ///
    /// # Errors
    ///
    /// Returns an error if `xmin > xmax` or `ymin > ymax`.
    pub fn validate(&self) -> Result<()> {
        if self.xmin > self.xmax || self.ymin > self.ymax {
            return Err(Error::InvalidInput(format!(
                "Box for '{}' has inverted extent: x [{}, {}], y [{}, {}]",
                self.class, self.xmin, self.xmax, self.ymin, self.ymax
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn width(&self) -> i64 {
        i64::from(self.xmax) - i64::from(self.xmin)
    }

    #[must_use]
    pub fn height(&self) -> i64 {
        i64::from(self.ymax) - i64::from(self.ymin)
    }

    /// Vertical midpoint row, `(ymin + ymax) / 2`
    #[must_use]
    pub fn v_mean(&self) -> f64 {
        (f64::from(self.ymin) + f64::from(self.ymax)) * 0.5
    }
}

/// Ordered list of boxes from one detector run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    /// Capture time of the image the boxes were detected in
    #[serde(default)]
    pub stamp_ns: u64,
    #[serde(alias = "bounding_boxes")]
    pub boxes: Vec<DetectionBox>,
}

impl DetectionBatch {
    #[must_use]
    pub fn new(stamp_ns: u64, boxes: Vec<DetectionBox>) -> Self {
        Self { stamp_ns, boxes }
    }
}
