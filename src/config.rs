//! Configuration management for the object projector

use crate::{
    constants::{
        DEFAULT_CLOUD_TIMEOUT_MS, DEFAULT_CX, DEFAULT_CY, DEFAULT_DETECTIONS_TOPIC, DEFAULT_FX, DEFAULT_FY,
        DEFAULT_INLIERS_TOPIC, DEFAULT_LOOKUP_TIMEOUT_MS, DEFAULT_MARKER_TOPIC, DEFAULT_OBJECTS_TOPIC,
        DEFAULT_POINTCLOUD_TOPIC, DEFAULT_RANSAC_CONFIDENCE, DEFAULT_RANSAC_DISTANCE_THRESHOLD,
        DEFAULT_RANSAC_MAX_ITERATIONS, DEFAULT_RANSAC_SEED, DEFAULT_SENSOR_FRAME, DEFAULT_WORLD_FRAME,
    },
    geometry::{CameraIntrinsics, RigidTransform},
    localizer::LocalizationStrategy,
    plane_fit::RansacPlaneFitter,
    point_cloud::RegionPolicy,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference frames
    pub frames: FramesConfig,

    /// Stream identifiers
    pub topics: TopicsConfig,

    /// Pinhole intrinsics of the depth camera
    pub camera: CameraConfig,

    /// Anchor selection
    pub localization: LocalizationConfig,

    /// Plane segmentation parameters
    pub ransac: RansacConfig,

    /// Transform lookup behavior
    pub transforms: TransformsConfig,

    /// Box cropping behavior
    pub region: RegionConfig,

    /// Visualization outputs
    pub debug: DebugConfig,
}

/// Frame names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    /// Camera optical frame the pipeline works in
    pub sensor_frame: String,

    /// Frame poses are reported in
    pub world_frame: String,
}

/// Input and output stream names, used to label log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Organized point clouds
    pub pointcloud: String,
    /// Detection batches
    pub detections: String,
    /// Object poses
    pub objects: String,
    /// Label for published inlier clouds
    pub inliers: String,
    /// Label for published arrow markers
    pub marker: String,
}

/// Camera intrinsics in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// `mean_of_inliers` or `projected_midpoint`
    pub strategy: LocalizationStrategy,
}

/// RANSAC parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Inlier distance in meters
    pub distance_threshold: f64,

    /// Maximum number of hypotheses
    pub max_iterations: usize,

    /// Probability of drawing at least one all-inlier sample (0.0-1.0)
    pub confidence: f64,

    /// RNG seed
    pub seed: u64,

    /// Least-squares refit on the final inliers
    pub optimize_coefficients: bool,
}

/// A transform known at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransform {
    pub parent: String,
    pub child: String,
    /// Maps child coordinates into the parent frame
    pub transform: RigidTransform,
}

/// Transform lookup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformsConfig {
    /// Wait for world <- sensor per box
    pub lookup_timeout_ms: u64,

    /// Wait for sensor <- cloud frame per cloud
    pub cloud_timeout_ms: u64,

    /// Relations preloaded into the transform buffer
    #[serde(rename = "static")]
    pub static_transforms: Vec<StaticTransform>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// `reject` or `clamp`
    pub policy: RegionPolicy,
}

/// Visualization outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Publish the heading arrow per pose
    pub markers: bool,

    /// Publish the plane inliers per pose
    pub inliers: bool,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            sensor_frame: DEFAULT_SENSOR_FRAME.to_string(),
            world_frame: DEFAULT_WORLD_FRAME.to_string(),
        }
    }
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            pointcloud: DEFAULT_POINTCLOUD_TOPIC.to_string(),
            detections: DEFAULT_DETECTIONS_TOPIC.to_string(),
            objects: DEFAULT_OBJECTS_TOPIC.to_string(),
            inliers: DEFAULT_INLIERS_TOPIC.to_string(),
            marker: DEFAULT_MARKER_TOPIC.to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fx: DEFAULT_FX,
            fy: DEFAULT_FY,
            cx: DEFAULT_CX,
            cy: DEFAULT_CY,
        }
    }
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_RANSAC_DISTANCE_THRESHOLD,
            max_iterations: DEFAULT_RANSAC_MAX_ITERATIONS,
            confidence: DEFAULT_RANSAC_CONFIDENCE,
            seed: DEFAULT_RANSAC_SEED,
            optimize_coefficients: true,
        }
    }
}

impl Default for TransformsConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            cloud_timeout_ms: DEFAULT_CLOUD_TIMEOUT_MS,
            static_transforms: Vec::new(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            markers: true,
            inliers: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_yaml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// YAML rendering of this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    #[must_use]
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::new(self.camera.fx, self.camera.fy, self.camera.cx, self.camera.cy)
    }

    /// Plane fitter built from the `ransac` section
    #[must_use]
    pub fn ransac_fitter(&self) -> RansacPlaneFitter {
        RansacPlaneFitter {
            distance_threshold: self.ransac.distance_threshold,
            max_iterations: self.ransac.max_iterations,
            confidence: self.ransac.confidence,
            seed: self.ransac.seed,
            optimize_coefficients: self.ransac.optimize_coefficients,
        }
    }

    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.transforms.lookup_timeout_ms)
    }

    #[must_use]
    pub fn cloud_timeout(&self) -> Duration {
        Duration::from_millis(self.transforms.cloud_timeout_ms)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.frames.sensor_frame.is_empty() || self.frames.world_frame.is_empty() {
            return Err(Error::ConfigError("Frame names must not be empty".to_string()));
        }

        self.intrinsics()
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid camera intrinsics: {e}")))?;

        // RANSAC parameters
        if !self.ransac.distance_threshold.is_finite() || self.ransac.distance_threshold <= 0.0 {
            return Err(Error::ConfigError(
                "RANSAC distance threshold must be greater than 0".to_string(),
            ));
        }
        if self.ransac.max_iterations == 0 {
            return Err(Error::ConfigError(
                "RANSAC max iterations must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.ransac.confidence) {
            return Err(Error::ConfigError(
                "RANSAC confidence must be in [0.0, 1.0)".to_string(),
            ));
        }

        for st in &self.transforms.static_transforms {
            if st.parent.is_empty() || st.child.is_empty() || st.parent == st.child {
                return Err(Error::ConfigError(format!(
                    "Static transform '{}' <- '{}' needs two distinct frames",
                    st.parent, st.child
                )));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Object Projector Configuration

# Reference frames
frames:
  sensor_frame: "camera_rgb_optical_frame"
  world_frame: "map"

# Stream names
topics:
  pointcloud: "camera/depth_registered/points"
  detections: "darknet_ros/bounding_boxes"
  objects: "objects_raw"
  inliers: "camera/qhd/points_inliers"
  marker: "raw_marker"

# Astra intrinsics
camera:
  fx: 527.135883
  fy: 527.76315129
  cx: 306.5405905
  cy: 222.41208797

# Anchor selection: mean_of_inliers or projected_midpoint
localization:
  strategy: projected_midpoint

# Plane segmentation
ransac:
  distance_threshold: 0.03
  max_iterations: 1000
  confidence: 0.99
  seed: 1234567
  optimize_coefficients: true

# Transform lookups
transforms:
  lookup_timeout_ms: 3000
  cloud_timeout_ms: 10000
  static:
    - parent: "base_link"
      child: "camera_rgb_optical_frame"
      transform:
        translation: [0.1, 0.0, 0.4]
        rotation: [-0.5, 0.5, -0.5, 0.5]

# Boxes leaving the cloud grid: reject or clamp
region:
  policy: reject

# Visualization outputs
debug:
  markers: true
  inliers: true
"#;
