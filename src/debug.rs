//! Best-effort visualization outputs: the heading arrow and the inlier cloud.

use crate::{
    config::TopicsConfig,
    constants::{ARROW_COLOR_RGBA, ARROW_LENGTH_FACTOR, ARROW_NAMESPACE, ARROW_SCALE},
    geometry::RigidTransform,
    point_cloud::{PointCloudFrame, PointXYZRGB},
    transform::WorldEstimate,
    Result,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Arrow from the object anchor along its (scaled) normal, in the world frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowMarker {
    pub namespace: String,
    /// Position of the box within its batch
    pub id: usize,
    pub frame_id: String,
    pub start: [f64; 3],
    pub end: [f64; 3],
    /// Shaft diameter, head diameter, head length
    pub scale: [f64; 3],
    pub color: [f32; 4],
}

impl ArrowMarker {
    /// Arrow of length `0.8 * |normal|` starting at the anchor
    #[must_use]
    pub fn from_estimate(id: usize, frame_id: &str, estimate: &WorldEstimate) -> Self {
        let end = estimate.anchor + estimate.normal * ARROW_LENGTH_FACTOR;
        Self {
            namespace: ARROW_NAMESPACE.to_string(),
            id,
            frame_id: frame_id.to_string(),
            start: estimate.anchor.coords.into(),
            end: end.coords.into(),
            scale: ARROW_SCALE,
            color: ARROW_COLOR_RGBA,
        }
    }
}

/// Plane inliers re-expressed in the world frame as an unorganized cloud
///
/// # Errors
///
/// Returns an error if a transformed coordinate does not fit in `f32`.
pub fn inlier_cloud(
    inliers: &[PointXYZRGB],
    world_from_sensor: &RigidTransform,
    world_frame: &str,
    stamp_ns: u64,
) -> Result<PointCloudFrame> {
    let sensor = PointCloudFrame::new("", stamp_ns, inliers.len(), 1, inliers.to_vec())?;
    sensor.transformed(world_from_sensor, world_frame)
}

/// Receiver for visualization outputs
pub trait DebugSink: Send + Sync {
    fn publish_marker(&self, marker: &ArrowMarker);

    fn publish_inliers(&self, cloud: &PointCloudFrame);
}

/// Writes visualization outputs to the debug log, labelled by stream name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDebugSink {
    pub marker_topic: String,
    pub inliers_topic: String,
}

impl LogDebugSink {
    #[must_use]
    pub fn from_topics(topics: &TopicsConfig) -> Self {
        Self {
            marker_topic: topics.marker.clone(),
            inliers_topic: topics.inliers.clone(),
        }
    }
}

impl Default for LogDebugSink {
    fn default() -> Self {
        Self::from_topics(&TopicsConfig::default())
    }
}

impl DebugSink for LogDebugSink {
    fn publish_marker(&self, marker: &ArrowMarker) {
        match serde_json::to_string(marker) {
            Ok(json) => debug!("[{}] marker {json}", self.marker_topic),
            Err(e) => debug!("[{}] marker {} not serializable: {e}", self.marker_topic, marker.id),
        }
    }

    fn publish_inliers(&self, cloud: &PointCloudFrame) {
        debug!(
            "[{}] inlier cloud in '{}': {} points ({} valid)",
            self.inliers_topic,
            cloud.frame_id(),
            cloud.points().len(),
            cloud.valid_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_arrow_marker_geometry() {
        let estimate = WorldEstimate {
            anchor: Point3::new(1.0, 2.0, 0.5),
            normal: Vector3::new(0.0, 2.0, 0.0),
        };
        let marker = ArrowMarker::from_estimate(3, "map", &estimate);
        assert_eq!(marker.namespace, "arrows");
        assert_eq!(marker.id, 3);
        assert_eq!(marker.start, [1.0, 2.0, 0.5]);
        assert!((marker.end[1] - 3.6).abs() < 1e-12);
        assert_eq!(marker.scale, [0.02, 0.05, 0.1]);
        assert_eq!(marker.color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_inlier_cloud_in_world_frame() {
        let inliers = vec![PointXYZRGB::with_rgb(1.0, 0.0, 0.0, [9, 8, 7]), PointXYZRGB::new(2.0, 0.0, 0.0)];
        let tf = RigidTransform::from_yaw(FRAC_PI_2, Vector3::new(0.0, 0.0, 1.0));
        let cloud = inlier_cloud(&inliers, &tf, "map", 42).unwrap();

        assert_eq!(cloud.frame_id(), "map");
        assert_eq!(cloud.stamp_ns(), 42);
        assert_eq!((cloud.width(), cloud.height()), (2, 1));
        let p = cloud.points()[0];
        assert!(p.x.abs() < 1e-6 && (p.y - 1.0).abs() < 1e-6 && (p.z - 1.0).abs() < 1e-6);
        assert_eq!(p.rgb, [9, 8, 7]);
    }

    #[test]
    fn test_log_sink_labels_from_topics() {
        let mut topics = TopicsConfig::default();
        topics.marker = "door_arrows".to_string();
        topics.inliers = "door_inliers".to_string();
        let sink = LogDebugSink::from_topics(&topics);
        assert_eq!(sink.marker_topic, "door_arrows");
        assert_eq!(sink.inliers_topic, "door_inliers");

        let defaults = LogDebugSink::default();
        assert_eq!(defaults.marker_topic, "raw_marker");
        assert_eq!(defaults.inliers_topic, "camera/qhd/points_inliers");

        // Publishing never fails, even without a logger installed
        sink.publish_marker(&ArrowMarker::from_estimate(
            0,
            "map",
            &WorldEstimate {
                anchor: Point3::origin(),
                normal: Vector3::x(),
            },
        ));
        sink.publish_inliers(&inlier_cloud(&[], &RigidTransform::identity(), "map", 0).unwrap());
    }

    #[test]
    fn test_empty_inlier_cloud() {
        let cloud = inlier_cloud(&[], &RigidTransform::identity(), "map", 0).unwrap();
        assert!(cloud.points().is_empty());
    }
}
