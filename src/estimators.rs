//! Class-specific estimators and the registry that dispatches on class label.
//!
//! Adding support for a new object class means registering another
//! [`ObjectEstimator`] under its label; the dispatch site in the projector
//! does not change.

use crate::{
    constants::DOOR_CLASS,
    detection::DetectionBox,
    geometry::{CameraIntrinsics, RigidTransform},
    localizer::{localize, LocalizationStrategy},
    plane_fit::PlaneFitter,
    point_cloud::{extract_region, PointCloudFrame, PointXYZRGB, RegionPolicy},
    pose::{synthesize, ObjectPose},
    transform::{FrameTransformer, WorldEstimate},
    Error, Result,
};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything one successful box produced
#[derive(Debug, Clone)]
pub struct Estimation {
    pub pose: ObjectPose,
    /// Anchor and normal in the world frame
    pub world: WorldEstimate,
    /// Transform used for this box
    pub world_from_sensor: RigidTransform,
    /// Plane inliers, sensor frame
    pub inliers: Vec<PointXYZRGB>,
}

/// Estimator for one family of object classes
pub trait ObjectEstimator: Send + Sync {
    /// Name for logs
    fn name(&self) -> &str;

    /// Estimate the world pose of the object inside `bbox`
    ///
    /// # Errors
    ///
    /// Any per-box failure; the caller skips the box.
    fn estimate(&self, cloud: &PointCloudFrame, bbox: &DetectionBox, transformer: &FrameTransformer)
        -> Result<Estimation>;
}

/// Plane-based estimator for flat objects such as doors
pub struct PlanarObjectEstimator {
    strategy: LocalizationStrategy,
    intrinsics: CameraIntrinsics,
    region_policy: RegionPolicy,
    fitter: Arc<dyn PlaneFitter>,
}

impl PlanarObjectEstimator {
    #[must_use]
    pub fn new(
        strategy: LocalizationStrategy,
        intrinsics: CameraIntrinsics,
        region_policy: RegionPolicy,
        fitter: Arc<dyn PlaneFitter>,
    ) -> Self {
        Self {
            strategy,
            intrinsics,
            region_policy,
            fitter,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> LocalizationStrategy {
        self.strategy
    }
}

impl ObjectEstimator for PlanarObjectEstimator {
    fn name(&self) -> &str {
        "planar"
    }

    fn estimate(
        &self,
        cloud: &PointCloudFrame,
        bbox: &DetectionBox,
        transformer: &FrameTransformer,
    ) -> Result<Estimation> {
        let region = extract_region(cloud, bbox, self.region_policy)?;
        let fit = self.fitter.fit(&region.positions())?;
        debug!("Inliers count: {} of {}", fit.inliers.len(), region.len());

        let estimate = localize(self.strategy, &region, &fit, bbox, &self.intrinsics)?;
        let (world, world_from_sensor) = transformer.to_world(&estimate)?;
        let pose = synthesize(&bbox.class, &world)?;

        Ok(Estimation {
            pose,
            world,
            world_from_sensor,
            inliers: region.select(&fit.inliers)?,
        })
    }
}

/// Estimators keyed by class label
#[derive(Default)]
pub struct EstimatorRegistry {
    estimators: HashMap<String, Arc<dyn ObjectEstimator>>,
}

impl EstimatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the planar estimator bound to `"door"`
    #[must_use]
    pub fn with_planar_doors(planar: PlanarObjectEstimator) -> Self {
        let mut registry = Self::new();
        registry.register(DOOR_CLASS, Arc::new(planar));
        registry
    }

    /// Bind `estimator` to `class`, replacing any previous binding
    pub fn register(&mut self, class: impl Into<String>, estimator: Arc<dyn ObjectEstimator>) {
        self.estimators.insert(class.into(), estimator);
    }

    /// Estimator for `class`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedClass`] if nothing is registered for it.
    pub fn get(&self, class: &str) -> Result<&dyn ObjectEstimator> {
        self.estimators
            .get(class)
            .map(AsRef::as_ref)
            .ok_or_else(|| Error::UnsupportedClass(class.to_string()))
    }

    /// Registered class labels, sorted
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.estimators.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }
}
