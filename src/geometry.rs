//! Geometric primitives: planes, pinhole back-projection and rigid transforms.
//!
//! Everything here is pure and stateless. Points are `nalgebra::Point3<f64>`,
//! directions are `nalgebra::Vector3<f64>`, and the distinction matters:
//! [`RigidTransform::apply_point`] translates, [`RigidTransform::rotate_vector`]
//! does not.

use crate::{constants::PROJECTION_EPSILON, Error, Result};
use nalgebra::{Point3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Plane `A*x + B*y + C*z + D = 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Plane {
    /// Create a plane from its four coefficients
    ///
    /// # Errors
    ///
    /// Returns an error if `(A, B, C)` is zero or any coefficient is not finite.
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Result<Self> {
        if ![a, b, c, d].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Plane coefficients must be finite, got ({a}, {b}, {c}, {d})"
            )));
        }
        if a == 0.0 && b == 0.0 && c == 0.0 {
            return Err(Error::InvalidInput("Plane normal (A, B, C) must not be zero".to_string()));
        }
        Ok(Self { a, b, c, d })
    }

    /// Un-normalized normal `(A, B, C)`
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    /// Coefficients as `[A, B, C, D]`
    #[must_use]
    pub fn coefficients(&self) -> [f64; 4] {
        [self.a, self.b, self.c, self.d]
    }

    /// Evaluate `A*x + B*y + C*z + D`
    #[must_use]
    pub fn evaluate(&self, p: &Point3<f64>) -> f64 {
        self.normal().dot(&p.coords) + self.d
    }

    /// Euclidean distance from a point to the plane
    #[must_use]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.evaluate(p).abs() / self.normal().norm()
    }

    /// Same plane with the normal flipped
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            a: -self.a,
            b: -self.b,
            c: -self.c,
            d: -self.d,
        }
    }
}

/// Pinhole camera intrinsics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    #[must_use]
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Direction of the camera ray through pixel `(u, v)`, with unit depth
    #[must_use]
    pub fn ray_through(&self, u: f64, v: f64) -> Vector3<f64> {
        Vector3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0)
    }

    /// Validate intrinsics
    ///
    /// # Errors
    ///
    /// Returns an error if a focal length is not strictly positive or any value is not finite.
    pub fn validate(&self) -> Result<()> {
        if ![self.fx, self.fy, self.cx, self.cy].iter().all(|v| v.is_finite()) {
            return Err(Error::ConfigError("Camera intrinsics must be finite".to_string()));
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(Error::ConfigError(format!(
                "Focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            )));
        }
        Ok(())
    }
}

/// Intersect the camera ray through pixel `(u, v)` with `plane`.
///
/// Closed form:
/// `z = -(D*fx*fy) / (fy*A*(u-cx) + fx*B*(v-cy) + C*fx*fy)`,
/// `x = (u-cx)*z/fx`, `y = (v-cy)*z/fy`.
/// Dividing numerator and denominator by `fx*fy` gives `z = -D / (n . ray)`,
/// which is what is evaluated below.
///
/// # Errors
///
/// Returns [`Error::DegenerateProjection`] if the ray is parallel (or nearly
/// parallel) to the plane or the result is not finite.
pub fn back_project_onto_plane(
    plane: &Plane,
    intrinsics: &CameraIntrinsics,
    u: f64,
    v: f64,
) -> Result<Point3<f64>> {
    let normal = plane.normal();
    let ray = intrinsics.ray_through(u, v);
    let denom = normal.dot(&ray);

    if !denom.is_finite() || denom.abs() <= PROJECTION_EPSILON * normal.norm() * ray.norm() {
        return Err(Error::DegenerateProjection(format!(
            "ray through pixel ({u}, {v}) is parallel to the plane"
        )));
    }

    let z = -plane.d / denom;
    let point = Point3::new(ray.x * z, ray.y * z, z);

    if !point.coords.iter().all(|c| c.is_finite()) {
        return Err(Error::DegenerateProjection(format!(
            "non-finite intersection for pixel ({u}, {v})"
        )));
    }

    Ok(point)
}

/// Rigid transform `p' = R*p + t`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransformRepr", into = "TransformRepr")]
pub struct RigidTransform {
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    #[must_use]
    pub fn from_parts(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self { rotation, translation }
    }

    /// Rotation of `yaw` radians about +Z followed by `translation`
    #[must_use]
    pub fn from_yaw(yaw: f64, translation: Vector3<f64>) -> Self {
        Self {
            rotation: Rotation3::from_axis_angle(&Vector3::z_axis(), yaw),
            translation,
        }
    }

    /// Build from a translation and a quaternion `[x, y, z, w]`
    ///
    /// # Errors
    ///
    /// Returns an error if the quaternion is zero or any value is not finite.
    pub fn from_quaternion(translation: [f64; 3], rotation: [f64; 4]) -> Result<Self> {
        let [x, y, z, w] = rotation;
        let norm = (x * x + y * y + z * z + w * w).sqrt();
        if !norm.is_finite() || norm < 1e-10 || !translation.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Invalid transform: translation {translation:?}, rotation {rotation:?}"
            )));
        }
        let q = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        Ok(Self {
            rotation: q.to_rotation_matrix(),
            translation: Vector3::from(translation),
        })
    }

    #[must_use]
    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    #[must_use]
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// `R*p + t`
    #[must_use]
    pub fn apply_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    /// `R*v`; directions are translation-invariant
    #[must_use]
    pub fn rotate_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * vector
    }

    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// `self * other`: applies `other` first
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }
}

/// Wire form: translation plus quaternion `[x, y, z, w]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TransformRepr {
    translation: [f64; 3],
    rotation: [f64; 4],
}

impl TryFrom<TransformRepr> for RigidTransform {
    type Error = Error;

    fn try_from(repr: TransformRepr) -> Result<Self> {
        Self::from_quaternion(repr.translation, repr.rotation)
    }
}

impl From<RigidTransform> for TransformRepr {
    fn from(tf: RigidTransform) -> Self {
        let q = UnitQuaternion::from_rotation_matrix(&tf.rotation);
        Self {
            translation: [tf.translation.x, tf.translation.y, tf.translation.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::new(500.0, 500.0, 150.0, 150.0)
    }

    #[test]
    fn test_plane_rejects_zero_normal() {
        assert!(Plane::new(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(Plane::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(Plane::new(0.0, 0.0, 1.0, -2.0).is_ok());
    }

    #[test]
    fn test_back_project_fronto_parallel() {
        // z = 2 plane, principal point maps straight ahead
        let plane = Plane::new(0.0, 0.0, 1.0, -2.0).unwrap();
        let p = back_project_onto_plane(&plane, &intrinsics(), 150.0, 150.0).unwrap();
        assert!((p - Point3::new(0.0, 0.0, 2.0)).norm() < 1e-12);

        let p = back_project_onto_plane(&plane, &intrinsics(), 400.0, 150.0).unwrap();
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_back_project_matches_closed_form() {
        let (a, b, c, d) = (0.3, -0.2, 0.9, -1.7);
        let plane = Plane::new(a, b, c, d).unwrap();
        let k = CameraIntrinsics::new(527.1, 527.7, 306.5, 222.4);
        let (u, v) = (120.0, 300.0);
        let z = -(d * k.fx * k.fy) / (k.fy * a * (u - k.cx) + k.fx * b * (v - k.cy) + c * k.fx * k.fy);
        let p = back_project_onto_plane(&plane, &k, u, v).unwrap();
        assert!((p.z - z).abs() < 1e-9);
        assert!((p.x - (u - k.cx) * z / k.fx).abs() < 1e-9);
        assert!((p.y - (v - k.cy) * z / k.fy).abs() < 1e-9);
    }

    #[test]
    fn test_back_project_parallel_ray_is_degenerate() {
        // x = 2 plane, the optical axis column never meets it
        let plane = Plane::new(1.0, 0.0, 0.0, -2.0).unwrap();
        let result = back_project_onto_plane(&plane, &intrinsics(), 150.0, 120.0);
        assert!(matches!(result, Err(Error::DegenerateProjection(_))));
    }

    #[test]
    fn test_rotate_vector_ignores_translation() {
        let tf = RigidTransform::from_yaw(FRAC_PI_2, Vector3::new(10.0, -4.0, 7.0));
        let v = tf.rotate_vector(&Vector3::x());
        assert!((v - Vector3::y()).norm() < 1e-12);

        let p = tf.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(10.0, -3.0, 7.0)).norm() < 1e-12);
    }

    #[test]
    fn test_quaternion_wire_form() {
        let tf = RigidTransform::from_yaw(0.7, Vector3::new(1.0, 2.0, 3.0));
        let json = serde_json::to_string(&tf).unwrap();
        let back: RigidTransform = serde_json::from_str(&json).unwrap();
        let p = Point3::new(0.4, -1.0, 2.5);
        assert!((tf.apply_point(&p) - back.apply_point(&p)).norm() < 1e-12);

        let zero = r#"{"translation":[0,0,0],"rotation":[0,0,0,0]}"#;
        assert!(serde_json::from_str::<RigidTransform>(zero).is_err());
    }

    #[test]
    fn test_compose_applies_right_first() {
        let a = RigidTransform::from_yaw(FRAC_PI_2, Vector3::zeros());
        let b = RigidTransform::from_yaw(0.0, Vector3::new(1.0, 0.0, 0.0));
        let p = a.compose(&b).apply_point(&Point3::origin());
        assert!((p - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_back_projection_on_plane_and_ray(
            a in -1.0f64..1.0,
            b in -1.0f64..1.0,
            c in 0.2f64..1.0,
            d in -5.0f64..-0.5,
            u in 0.0f64..640.0,
            v in 0.0f64..480.0,
        ) {
            let plane = Plane::new(a, b, c, d).unwrap();
            let k = CameraIntrinsics::new(527.0, 527.0, 320.0, 240.0);
            if let Ok(p) = back_project_onto_plane(&plane, &k, u, v) {
                let scale = p.coords.norm().max(1.0);
                prop_assert!(plane.evaluate(&p).abs() < 1e-8 * scale);
                // Reprojects onto the same pixel
                if p.z.abs() > 1e-6 {
                    prop_assert!((k.fx * p.x / p.z + k.cx - u).abs() < 1e-6);
                    prop_assert!((k.fy * p.y / p.z + k.cy - v).abs() < 1e-6);
                }
            }
        }

        #[test]
        fn prop_transform_round_trip(
            yaw in -3.0f64..3.0,
            tx in -10.0f64..10.0,
            ty in -10.0f64..10.0,
            tz in -10.0f64..10.0,
            px in -5.0f64..5.0,
            py in -5.0f64..5.0,
            pz in -5.0f64..5.0,
        ) {
            let tf = RigidTransform::from_parts(
                Rotation3::from_euler_angles(0.3, -0.2, yaw),
                Vector3::new(tx, ty, tz),
            );
            let p = Point3::new(px, py, pz);
            let back = tf.inverse().apply_point(&tf.apply_point(&p));
            prop_assert!((back - p).norm() < 1e-9);

            let v = Vector3::new(px, py, pz);
            let rotated = tf.rotate_vector(&v);
            let untranslated = RigidTransform::from_parts(*tf.rotation(), Vector3::zeros());
            prop_assert!((rotated - untranslated.rotate_vector(&v)).norm() < 1e-12);
            prop_assert!((tf.inverse().rotate_vector(&rotated) - v).norm() < 1e-9);
        }
    }
}
