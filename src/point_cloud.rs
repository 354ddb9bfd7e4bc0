//! Organized point clouds and region extraction.
//!
//! A [`PointCloudFrame`] is a row-major `width x height` grid aligned with the
//! color image, so pixel `(u, v)` of a detection box addresses cell
//! `v * width + u`. Cells without a depth return hold NaN coordinates.
//!
//! [`extract_region`] crops the grid to a detection box. The crop keeps the
//! grid layout, so an index into the region (as returned by the plane fitter)
//! maps back to a source pixel through [`RegionCloud::source_pixel`].

use crate::{
    detection::DetectionBox,
    geometry::RigidTransform,
    utils::{box_within_grid, clamp_box_to_grid, safe_cast::f64_to_f32, PixelBounds},
    Error, Result,
};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// One cloud cell: position in meters plus color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointXYZRGB {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub rgb: [u8; 3],
}

impl PointXYZRGB {
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, rgb: [0, 0, 0] }
    }

    #[must_use]
    pub fn with_rgb(x: f32, y: f32, z: f32, rgb: [u8; 3]) -> Self {
        Self { x, y, z, rgb }
    }

    /// Cell with no depth return
    #[must_use]
    pub fn invalid() -> Self {
        Self::new(f32::NAN, f32::NAN, f32::NAN)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        Point3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

/// How boxes that stick out of the cloud grid are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionPolicy {
    /// Any part outside the grid fails the box
    #[default]
    Reject,
    /// Keep the part of the box that overlaps the grid
    Clamp,
}

/// Organized point cloud in a named reference frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CloudRepr", into = "CloudRepr")]
pub struct PointCloudFrame {
    frame_id: String,
    stamp_ns: u64,
    width: usize,
    height: usize,
    points: Vec<PointXYZRGB>,
}

impl PointCloudFrame {
    /// Create a cloud from row-major points
    ///
    /// # Errors
    ///
    /// Returns an error if `points.len() != width * height`.
    pub fn new(
        frame_id: impl Into<String>,
        stamp_ns: u64,
        width: usize,
        height: usize,
        points: Vec<PointXYZRGB>,
    ) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| Error::InvalidInput(format!("Cloud size {width}x{height} overflows")))?;
        if points.len() != expected {
            return Err(Error::InvalidInput(format!(
                "Cloud {width}x{height} needs {expected} points, got {}",
                points.len()
            )));
        }
        Ok(Self {
            frame_id: frame_id.into(),
            stamp_ns,
            width,
            height,
            points,
        })
    }

    /// Build a cloud by evaluating `f(u, v)` for every cell
    pub fn from_fn<F>(frame_id: impl Into<String>, stamp_ns: u64, width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> PointXYZRGB,
    {
        let mut points = Vec::with_capacity(width * height);
        for v in 0..height {
            for u in 0..width {
                points.push(f(u, v));
            }
        }
        Self {
            frame_id: frame_id.into(),
            stamp_ns,
            width,
            height,
            points,
        }
    }

    #[must_use]
    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    #[must_use]
    pub fn stamp_ns(&self) -> u64 {
        self.stamp_ns
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn points(&self) -> &[PointXYZRGB] {
        &self.points
    }

    /// Cell at column `u`, row `v`
    #[must_use]
    pub fn at(&self, u: usize, v: usize) -> Option<&PointXYZRGB> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.points.get(v * self.width + u)
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }

    /// Re-express every valid point through `transform`, keeping the grid layout
    ///
    /// # Errors
    ///
    /// Returns an error if a transformed coordinate does not fit in `f32`.
    pub fn transformed(&self, transform: &RigidTransform, frame_id: impl Into<String>) -> Result<Self> {
        let points = self
            .points
            .iter()
            .map(|p| {
                if !p.is_valid() {
                    return Ok(*p);
                }
                let q = transform.apply_point(&p.position());
                Ok(PointXYZRGB::with_rgb(
                    f64_to_f32(q.x)?,
                    f64_to_f32(q.y)?,
                    f64_to_f32(q.z)?,
                    p.rgb,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            frame_id: frame_id.into(),
            stamp_ns: self.stamp_ns,
            width: self.width,
            height: self.height,
            points,
        })
    }
}

/// Wire form: invalid cells travel as `null` since JSON has no NaN
#[derive(Serialize, Deserialize)]
struct CloudRepr {
    frame_id: String,
    #[serde(default)]
    stamp_ns: u64,
    width: usize,
    height: usize,
    points: Vec<Option<PointXYZRGB>>,
}

impl TryFrom<CloudRepr> for PointCloudFrame {
    type Error = Error;

    fn try_from(repr: CloudRepr) -> Result<Self> {
        let points = repr
            .points
            .into_iter()
            .map(|p| p.unwrap_or_else(PointXYZRGB::invalid))
            .collect();
        Self::new(repr.frame_id, repr.stamp_ns, repr.width, repr.height, points)
    }
}

impl From<PointCloudFrame> for CloudRepr {
    fn from(frame: PointCloudFrame) -> Self {
        Self {
            frame_id: frame.frame_id,
            stamp_ns: frame.stamp_ns,
            width: frame.width,
            height: frame.height,
            points: frame.points.into_iter().map(|p| p.is_valid().then_some(p)).collect(),
        }
    }
}

/// Rectangular crop of a [`PointCloudFrame`]
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCloud {
    bounds: PixelBounds,
    points: Vec<PointXYZRGB>,
}

impl RegionCloud {
    /// Grid area of the source cloud this region covers
    #[must_use]
    pub fn bounds(&self) -> PixelBounds {
        self.bounds
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.bounds.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.bounds.height()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[PointXYZRGB] {
        &self.points
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PointXYZRGB> {
        self.points.get(index)
    }

    /// Source cloud pixel `(u, v)` of region index `index`
    #[must_use]
    pub fn source_pixel(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.points.len()).then(|| {
            let w = self.bounds.width();
            (self.bounds.x0 + index % w, self.bounds.y0 + index / w)
        })
    }

    /// Positions of all cells, NaN for invalid ones
    #[must_use]
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.points.iter().map(PointXYZRGB::position).collect()
    }

    /// Points at `indices`, in the order given
    ///
    /// # Errors
    ///
    /// Returns an error if an index is outside the region.
    pub fn select(&self, indices: &[usize]) -> Result<Vec<PointXYZRGB>> {
        indices
            .iter()
            .map(|&i| {
                self.points.get(i).copied().ok_or_else(|| {
                    Error::InvalidInput(format!("Inlier index {i} outside region of {} points", self.points.len()))
                })
            })
            .collect()
    }
}

/// Crop `frame` to the pixel extent of `bbox`.
///
/// # Errors
///
/// Returns [`Error::OutOfRangeBox`] if the box leaves the grid (under
/// [`RegionPolicy::Reject`]), has no overlap with it (under
/// [`RegionPolicy::Clamp`]), or has zero area.
pub fn extract_region(frame: &PointCloudFrame, bbox: &DetectionBox, policy: RegionPolicy) -> Result<RegionCloud> {
    let bounds = match policy {
        RegionPolicy::Reject => box_within_grid(bbox, frame.width, frame.height),
        RegionPolicy::Clamp => clamp_box_to_grid(bbox, frame.width, frame.height),
    }
    .filter(|b| !b.is_empty())
    .ok_or(Error::OutOfRangeBox {
        xmin: bbox.xmin,
        xmax: bbox.xmax,
        ymin: bbox.ymin,
        ymax: bbox.ymax,
        width: frame.width,
        height: frame.height,
    })?;

    let mut points = Vec::with_capacity(bounds.width() * bounds.height());
    for v in bounds.y0..bounds.y1 {
        let row = v * frame.width;
        points.extend_from_slice(&frame.points[row + bounds.x0..row + bounds.x1]);
    }

    Ok(RegionCloud { bounds, points })
}
