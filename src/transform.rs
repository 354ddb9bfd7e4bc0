//! Coordinate frame lookup and the sensor -> world frame transformer.
//!
//! [`TransformProvider`] is the seam to whatever publishes frame relations.
//! [`TransformBuffer`] is an in-process provider: a tree of latest-known
//! parent/child transforms that lookups can block on until a path between
//! the two frames exists or the timeout passes.

use crate::{geometry::RigidTransform, localizer::SensorEstimate, Error, Result};
use log::debug;
use nalgebra::{Point3, Vector3};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of rigid transforms between named frames
pub trait TransformProvider: Send + Sync {
    /// Latest transform mapping `source` coordinates into `target`
    ///
    /// Blocks for at most `timeout` waiting for the relation to become known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransformUnavailable`] if no transform is known in time.
    fn lookup(&self, target: &str, source: &str, timeout: Duration) -> Result<RigidTransform>;
}

/// Latest-known frame tree with blocking lookups
#[derive(Default)]
pub struct TransformBuffer {
    /// `(parent, child)` -> transform mapping child coordinates into parent
    edges: Mutex<HashMap<(String, String), RigidTransform>>,
    updated: Condvar,
}

impl TransformBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the transform mapping `child` coordinates into `parent`
    pub fn set_transform(&self, parent: impl Into<String>, child: impl Into<String>, transform: RigidTransform) {
        let (parent, child) = (parent.into(), child.into());
        debug!("Transform update {parent} <- {child}");
        self.edges.lock().insert((parent, child), transform);
        self.updated.notify_all();
    }

    /// Number of known parent/child relations
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.lock().is_empty()
    }

    /// Breadth-first walk from `source` to `target`, treating edges as undirected
    fn resolve(
        edges: &HashMap<(String, String), RigidTransform>,
        target: &str,
        source: &str,
    ) -> Option<RigidTransform> {
        if target == source {
            return Some(RigidTransform::identity());
        }

        // Each entry carries the transform from `source` into the entry's frame
        let mut queue = VecDeque::from([(source.to_string(), RigidTransform::identity())]);
        let mut visited = HashSet::from([source.to_string()]);

        while let Some((frame, frame_from_source)) = queue.pop_front() {
            for ((parent, child), tf) in edges {
                let (next, next_from_frame) = if *child == frame {
                    (parent, *tf)
                } else if *parent == frame {
                    (child, tf.inverse())
                } else {
                    continue;
                };
                if !visited.insert(next.clone()) {
                    continue;
                }
                let next_from_source = next_from_frame.compose(&frame_from_source);
                if next == target {
                    return Some(next_from_source);
                }
                queue.push_back((next.clone(), next_from_source));
            }
        }

        None
    }
}

impl TransformProvider for TransformBuffer {
    fn lookup(&self, target: &str, source: &str, timeout: Duration) -> Result<RigidTransform> {
        let deadline = Instant::now() + timeout;
        let mut edges = self.edges.lock();
        loop {
            if let Some(tf) = Self::resolve(&edges, target, source) {
                return Ok(tf);
            }
            if self.updated.wait_until(&mut edges, deadline).timed_out() {
                return Self::resolve(&edges, target, source).ok_or_else(|| Error::TransformUnavailable {
                    source_frame: source.to_string(),
                    target_frame: target.to_string(),
                    reason: format!("no path between frames after {} ms", timeout.as_millis()),
                });
            }
        }
    }
}

/// Anchor and normal of an object in the world frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldEstimate {
    pub anchor: Point3<f64>,
    pub normal: Vector3<f64>,
}

/// Apply `world_from_sensor`: the anchor is moved, the normal only rotated
#[must_use]
pub fn transform_estimate(estimate: &SensorEstimate, world_from_sensor: &RigidTransform) -> WorldEstimate {
    WorldEstimate {
        anchor: world_from_sensor.apply_point(&estimate.anchor),
        normal: world_from_sensor.rotate_vector(&estimate.normal),
    }
}

/// Moves estimates from the sensor frame into the world frame
pub struct FrameTransformer {
    provider: Arc<dyn TransformProvider>,
    world_frame: String,
    sensor_frame: String,
    timeout: Duration,
}

impl FrameTransformer {
    #[must_use]
    pub fn new(
        provider: Arc<dyn TransformProvider>,
        world_frame: impl Into<String>,
        sensor_frame: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            world_frame: world_frame.into(),
            sensor_frame: sensor_frame.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn world_frame(&self) -> &str {
        &self.world_frame
    }

    /// Fresh world <- sensor lookup; never cached across boxes
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransformUnavailable`] if the lookup times out.
    pub fn world_from_sensor(&self) -> Result<RigidTransform> {
        self.provider.lookup(&self.world_frame, &self.sensor_frame, self.timeout)
    }

    /// Look up the current transform and apply it to `estimate`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransformUnavailable`] if the lookup times out.
    pub fn to_world(&self, estimate: &SensorEstimate) -> Result<(WorldEstimate, RigidTransform)> {
        let world_from_sensor = self.world_from_sensor()?;
        Ok((transform_estimate(estimate, &world_from_sensor), world_from_sensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use std::thread;

    fn offset(x: f64, y: f64, z: f64) -> RigidTransform {
        RigidTransform::from_yaw(0.0, Vector3::new(x, y, z))
    }

    #[test]
    fn test_same_frame_is_identity() {
        let buffer = TransformBuffer::new();
        let tf = buffer.lookup("map", "map", Duration::ZERO).unwrap();
        assert_eq!(tf, RigidTransform::identity());
    }

    #[test]
    fn test_direct_and_inverse_lookup() {
        let buffer = TransformBuffer::new();
        buffer.set_transform("map", "camera", offset(1.0, 2.0, 3.0));

        let map_from_camera = buffer.lookup("map", "camera", Duration::ZERO).unwrap();
        let p = map_from_camera.apply_point(&Point3::origin());
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-12);

        let camera_from_map = buffer.lookup("camera", "map", Duration::ZERO).unwrap();
        let q = camera_from_map.apply_point(&Point3::origin());
        assert!((q - Point3::new(-1.0, -2.0, -3.0)).norm() < 1e-12);
    }

    #[test]
    fn test_chained_lookup() {
        let buffer = TransformBuffer::new();
        buffer.set_transform("map", "base_link", RigidTransform::from_yaw(FRAC_PI_2, Vector3::new(5.0, 0.0, 0.0)));
        buffer.set_transform("base_link", "camera", offset(1.0, 0.0, 0.5));

        let tf = buffer.lookup("map", "camera", Duration::ZERO).unwrap();
        let p = tf.apply_point(&Point3::origin());
        assert!((p - Point3::new(5.0, 1.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn test_missing_transform_times_out() {
        let buffer = TransformBuffer::new();
        buffer.set_transform("map", "odom", RigidTransform::identity());
        let start = Instant::now();
        let result = buffer.lookup("map", "camera", Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
        match result {
            Err(Error::TransformUnavailable { source_frame, target_frame, .. }) => {
                assert_eq!(source_frame, "camera");
                assert_eq!(target_frame, "map");
            }
            other => panic!("Expected TransformUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_wakes_on_update() {
        let buffer = Arc::new(TransformBuffer::new());
        let writer = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.set_transform("map", "camera", offset(0.0, 0.0, 1.0));
        });

        let tf = buffer.lookup("map", "camera", Duration::from_secs(5)).unwrap();
        assert!((tf.translation().z - 1.0).abs() < 1e-12);
        handle.join().unwrap();
    }

    #[test]
    fn test_transform_estimate_rotates_normal_only() {
        let estimate = SensorEstimate {
            anchor: Point3::new(2.0, 0.0, 0.0),
            normal: Vector3::new(1.0, 0.0, 0.0),
        };
        let tf = RigidTransform::from_yaw(FRAC_PI_2, Vector3::new(0.0, 0.0, 10.0));
        let world = transform_estimate(&estimate, &tf);
        assert!((world.anchor - Point3::new(0.0, 2.0, 10.0)).norm() < 1e-12);
        assert!((world.normal - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_frame_transformer_lookup_failure() {
        let buffer: Arc<dyn TransformProvider> = Arc::new(TransformBuffer::new());
        let transformer = FrameTransformer::new(buffer, "map", "camera", Duration::from_millis(5));
        let estimate = SensorEstimate {
            anchor: Point3::origin(),
            normal: Vector3::x(),
        };
        assert!(matches!(
            transformer.to_world(&estimate),
            Err(Error::TransformUnavailable { .. })
        ));
    }
}
