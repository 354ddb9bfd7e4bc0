//! Plane-constrained localization of a detected object in the sensor frame.
//!
//! Two estimators resolve the anchor point of an object from its fitted plane:
//!
//! - [`LocalizationStrategy::MeanOfInliers`] averages the inlier positions.
//! - [`LocalizationStrategy::ProjectedMidpoint`] back-projects the left and
//!   right box edges at the box's middle row onto the plane and takes the
//!   midpoint. Points far from the box edges do not move the anchor.
//!
//! Either way the normal is the plane's `(A, B, C)`, not normalized.

use crate::{
    detection::DetectionBox,
    geometry::{back_project_onto_plane, CameraIntrinsics, Plane},
    plane_fit::PlaneFit,
    point_cloud::RegionCloud,
    Error, Result,
};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Anchor point selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalizationStrategy {
    /// Mean of the plane inliers
    MeanOfInliers,
    /// Midpoint of the box edges projected onto the plane
    #[default]
    ProjectedMidpoint,
}

impl std::str::FromStr for LocalizationStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mean" | "mean_of_inliers" => Ok(Self::MeanOfInliers),
            "midpoint" | "projected_midpoint" => Ok(Self::ProjectedMidpoint),
            _ => Err(Error::InvalidInput(format!("Unknown localization strategy: {s}"))),
        }
    }
}

/// Anchor and normal of an object in the sensor frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEstimate {
    pub anchor: Point3<f64>,
    pub normal: Vector3<f64>,
}

/// Arithmetic mean of the region points at `inliers`
///
/// # Errors
///
/// Returns [`Error::EmptyInlierSet`] if `inliers` is empty, or an error if an
/// index is outside the region or points at an invalid cell.
pub fn mean_of_inliers(region: &RegionCloud, inliers: &[usize]) -> Result<Point3<f64>> {
    if inliers.is_empty() {
        return Err(Error::EmptyInlierSet);
    }

    let mut sum = Vector3::zeros();
    for &index in inliers {
        let point = region.get(index).ok_or_else(|| {
            Error::InvalidInput(format!("Inlier index {index} outside region of {} points", region.len()))
        })?;
        if !point.is_valid() {
            return Err(Error::InvalidInput(format!("Inlier {index} has no depth")));
        }
        sum += point.position().coords;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = sum / inliers.len() as f64;
    Ok(Point3::from(mean))
}

/// Midpoint of the box's left and right edges projected onto `plane`
///
/// Both edges are sampled at the middle row `(ymin + ymax) / 2`.
///
/// # Errors
///
/// Returns [`Error::DegenerateProjection`] if either edge ray misses the plane.
pub fn projected_midpoint(plane: &Plane, intrinsics: &CameraIntrinsics, bbox: &DetectionBox) -> Result<Point3<f64>> {
    let v_mean = bbox.v_mean();
    let left = back_project_onto_plane(plane, intrinsics, f64::from(bbox.xmin), v_mean)?;
    let right = back_project_onto_plane(plane, intrinsics, f64::from(bbox.xmax), v_mean)?;
    Ok(nalgebra::center(&left, &right))
}

/// Resolve anchor and normal for one box
///
/// # Errors
///
/// Propagates the estimator's error; also fails with
/// [`Error::DegenerateProjection`] if the anchor is not finite.
pub fn localize(
    strategy: LocalizationStrategy,
    region: &RegionCloud,
    fit: &PlaneFit,
    bbox: &DetectionBox,
    intrinsics: &CameraIntrinsics,
) -> Result<SensorEstimate> {
    let anchor = match strategy {
        LocalizationStrategy::MeanOfInliers => mean_of_inliers(region, &fit.inliers)?,
        LocalizationStrategy::ProjectedMidpoint => projected_midpoint(&fit.plane, intrinsics, bbox)?,
    };

    if !anchor.coords.iter().all(|c| c.is_finite()) {
        return Err(Error::DegenerateProjection(format!("non-finite anchor {anchor:?}")));
    }

    Ok(SensorEstimate {
        anchor,
        normal: fit.plane.normal(),
    })
}
