//! Constants used throughout the application

/// Camera optical frame the pipeline works in
pub const DEFAULT_SENSOR_FRAME: &str = "camera_rgb_optical_frame";

/// Fixed world frame poses are reported in
pub const DEFAULT_WORLD_FRAME: &str = "map";

/// Default topic identifiers
pub const DEFAULT_POINTCLOUD_TOPIC: &str = "camera/depth_registered/points";
pub const DEFAULT_DETECTIONS_TOPIC: &str = "darknet_ros/bounding_boxes";
pub const DEFAULT_OBJECTS_TOPIC: &str = "objects_raw";
pub const DEFAULT_INLIERS_TOPIC: &str = "camera/qhd/points_inliers";
pub const DEFAULT_MARKER_TOPIC: &str = "raw_marker";

/// Astra camera intrinsics
pub const DEFAULT_FX: f64 = 527.135_883;
pub const DEFAULT_FY: f64 = 527.763_151_29;
pub const DEFAULT_CX: f64 = 306.540_590_5;
pub const DEFAULT_CY: f64 = 222.412_087_97;

/// Class label handled by the planar estimator
pub const DOOR_CLASS: &str = "door";

/// RANSAC defaults
pub const DEFAULT_RANSAC_DISTANCE_THRESHOLD: f64 = 0.03;
pub const DEFAULT_RANSAC_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_RANSAC_CONFIDENCE: f64 = 0.99;
pub const DEFAULT_RANSAC_SEED: u64 = 1_234_567;

/// Minimal sample size for a plane hypothesis
pub const PLANE_MIN_SAMPLES: usize = 3;

/// Transform wait timeouts in milliseconds
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_CLOUD_TIMEOUT_MS: u64 = 10_000;

/// Debug arrow marker
pub const ARROW_LENGTH_FACTOR: f64 = 0.8;
pub const ARROW_SCALE: [f64; 3] = [0.02, 0.05, 0.1];
pub const ARROW_COLOR_RGBA: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
pub const ARROW_NAMESPACE: &str = "arrows";

/// Denominators below this magnitude are treated as a ray parallel to the plane
pub const PROJECTION_EPSILON: f64 = 1e-9;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
