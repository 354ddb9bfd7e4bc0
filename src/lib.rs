//! Object pose projection from 2D detections and organized point clouds.
//!
//! This library turns 2D detection boxes into planar world poses `(x, y, angle)`
//! for flat objects such as doors:
//! - `nalgebra` for the geometry
//! - RANSAC for plane segmentation inside the detection box
//! - a frame tree for sensor -> world transforms
//!
//! The projection pipeline consists of:
//! 1. Crop the buffered point cloud to the detection box
//! 2. Fit the dominant plane of the crop
//! 3. Pick an anchor point (mean of inliers, or box edges projected onto the plane)
//! 4. Move anchor and plane normal into the world frame
//! 5. Report the heading of the normal in the world XY plane
//!
//! # Examples
//!
//! ## Projecting one door
//!
//! ```
//! use object_projector::{
//!     config::Config,
//!     detection::{DetectionBatch, DetectionBox},
//!     geometry::RigidTransform,
//!     point_cloud::{PointCloudFrame, PointXYZRGB},
//!     pose::ObjectPose,
//!     projector::{PoseSink, Projector},
//!     transform::TransformBuffer,
//! };
//! use std::sync::Arc;
//!
//! struct Print;
//!
//! impl PoseSink for Print {
//!     fn publish(&self, pose: &ObjectPose) -> object_projector::Result<()> {
//!         println!("{} at ({:.2}, {:.2}) facing {:.2}", pose.class, pose.x, pose.y, pose.angle);
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.camera.fx = 500.0;
//! config.camera.fy = 500.0;
//! config.camera.cx = 150.0;
//! config.camera.cy = 150.0;
//!
//! // Optical frame: z forward, x right, y down
//! let transforms = Arc::new(TransformBuffer::new());
//! let map_from_optical = RigidTransform::from_quaternion([0.0; 3], [-0.5, 0.5, -0.5, 0.5])?;
//! transforms.set_transform("map", "camera_rgb_optical_frame", map_from_optical);
//!
//! let projector = Projector::new(config, transforms, Arc::new(Print))?;
//!
//! // A wall 2 m in front of the camera
//! let cloud = PointCloudFrame::from_fn("camera_rgb_optical_frame", 0, 300, 300, |u, v| {
//!     let z = 2.0_f32;
//!     PointXYZRGB::new((u as f32 - 150.0) * z / 500.0, (v as f32 - 150.0) * z / 500.0, z)
//! });
//! projector.on_cloud(cloud)?;
//!
//! let batch = DetectionBatch::new(1, vec![DetectionBox::new("door", 100, 200, 100, 200)?]);
//! let report = projector.on_detections(&batch)?;
//! assert_eq!(report.poses.len(), 1);
//! assert!(report.poses[0].angle.abs() < 1e-6);
//! # Ok(())
//! # }
//! ```
//!
//! ## Plane fitting on its own
//!
//! ```
//! use nalgebra::Point3;
//! use object_projector::plane_fit::{PlaneFitter, RansacPlaneFitter};
//!
//! let points: Vec<_> = (0..100)
//!     .map(|i| Point3::new(f64::from(i % 10) * 0.1, f64::from(i / 10) * 0.1, 3.0))
//!     .collect();
//! let fit = RansacPlaneFitter::default().fit(&points).unwrap();
//! assert_eq!(fit.inliers.len(), 100);
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// Planes, camera intrinsics, rigid transforms and ray/plane intersection
pub mod geometry;

/// Detection boxes and batches
pub mod detection;

/// Organized point clouds and region extraction
pub mod point_cloud;

/// RANSAC plane segmentation
pub mod plane_fit;

/// Anchor and normal estimation in the sensor frame
pub mod localizer;

/// Frame lookups and sensor -> world transformation
pub mod transform;

/// Heading synthesis and output records
pub mod pose;

/// Class-keyed estimator registry
pub mod estimators;

/// Latest-wins cloud buffer
pub mod buffer;

/// Visualization outputs
pub mod debug;

/// Streaming dispatch of clouds and detection batches
pub mod projector;

/// Grid and numeric helpers
pub mod utils;

pub use error::{Error, Result};
