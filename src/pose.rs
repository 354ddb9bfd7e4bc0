//! Output pose records and heading synthesis.

use crate::{constants::EPSILON, transform::WorldEstimate, Error, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// World-frame planar pose of one detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPose {
    /// Class label of the source box
    #[serde(rename = "objClass", alias = "class")]
    pub class: String,
    pub x: f64,
    pub y: f64,
    /// Heading in radians, in `(-pi, pi]`
    pub angle: f64,
}

/// Heading of `normal` projected onto the world XY plane
///
/// World Z is assumed to point up. Positive scaling of `normal` does not
/// change the result; negation shifts it by `pi`.
///
/// # Errors
///
/// Returns [`Error::DegenerateProjection`] if the normal is (nearly) vertical
/// or not finite.
pub fn heading_angle(normal: &Vector3<f64>) -> Result<f64> {
    let horizontal = normal.x.hypot(normal.y);
    if !horizontal.is_finite() || horizontal <= EPSILON * normal.norm().max(1.0) {
        return Err(Error::DegenerateProjection(format!(
            "normal {:?} has no horizontal component",
            normal.as_slice()
        )));
    }
    let angle = normal.y.atan2(normal.x);
    // atan2 can return -pi exactly; fold it onto +pi
    Ok(if angle <= -PI { PI } else { angle })
}

/// Assemble the output record from a world-frame estimate
///
/// # Errors
///
/// Returns [`Error::DegenerateProjection`] if the heading is undefined or the
/// position is not finite.
pub fn synthesize(class: &str, estimate: &WorldEstimate) -> Result<ObjectPose> {
    let angle = heading_angle(&estimate.normal)?;
    let (x, y) = (estimate.anchor.x, estimate.anchor.y);
    if !x.is_finite() || !y.is_finite() {
        return Err(Error::DegenerateProjection(format!("non-finite position ({x}, {y})")));
    }
    Ok(ObjectPose {
        class: class.to_string(),
        x,
        y,
        angle,
    })
}
