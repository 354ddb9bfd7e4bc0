//! Error types for the object projector library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// The world <- sensor transform could not be resolved in time
    #[error("Transform unavailable from '{source_frame}' to '{target_frame}': {reason}")]
    TransformUnavailable {
        /// Frame the data is expressed in
        source_frame: String,
        /// Frame the data should be expressed in
        target_frame: String,
        /// Why the lookup failed
        reason: String,
    },

    /// The plane fit produced no inliers to average
    #[error("Empty inlier set: cannot average zero points")]
    EmptyInlierSet,

    /// Camera ray (nearly) parallel to the plane, or non-finite geometry
    #[error("Degenerate projection: {0}")]
    DegenerateProjection(String),

    /// Detection box does not fit inside the buffered cloud
    #[error("Box [{xmin}, {xmax}] x [{ymin}, {ymax}] out of range for {width}x{height} cloud")]
    OutOfRangeBox {
        /// Left pixel column
        xmin: i32,
        /// Right pixel column
        xmax: i32,
        /// Top pixel row
        ymin: i32,
        /// Bottom pixel row
        ymax: i32,
        /// Cloud grid width
        width: usize,
        /// Cloud grid height
        height: usize,
    },

    /// No estimator is registered for this class label
    #[error("Unsupported class '{0}': not implemented")]
    UnsupportedClass(String),

    /// A detection batch arrived before any point cloud
    #[error("No point cloud buffered yet")]
    NoCloud,

    /// RANSAC did not find a consensus plane
    #[error("Plane fit error: {0}")]
    PlaneFit(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON event or output encoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-friendly tag, used in batch reports and log lines
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransformUnavailable { .. } => "transform_unavailable",
            Self::EmptyInlierSet => "empty_inlier_set",
            Self::DegenerateProjection(_) => "degenerate_projection",
            Self::OutOfRangeBox { .. } => "out_of_range_box",
            Self::UnsupportedClass(_) => "unsupported_class",
            Self::NoCloud => "no_cloud",
            Self::PlaneFit(_) => "plane_fit",
            Self::InvalidInput(_) => "invalid_input",
            Self::ConfigError(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
