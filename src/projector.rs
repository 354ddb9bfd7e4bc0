//! Streaming front end: buffers clouds and turns detection batches into poses.
//!
//! Clouds and detection batches arrive independently. [`Projector::on_cloud`]
//! swaps the latest cloud into a [`CloudBuffer`]; [`Projector::on_detections`]
//! takes one snapshot of it and runs every box of the batch against that
//! snapshot, in arrival order. A box that fails is logged and skipped; the
//! rest of the batch still runs.

use crate::{
    buffer::CloudBuffer,
    config::Config,
    debug::{inlier_cloud, ArrowMarker, DebugSink},
    detection::{DetectionBatch, DetectionBox},
    estimators::{Estimation, EstimatorRegistry, PlanarObjectEstimator},
    plane_fit::PlaneFitter,
    point_cloud::PointCloudFrame,
    pose::ObjectPose,
    transform::{FrameTransformer, TransformProvider},
    Error, Result,
};
use log::{debug, info, warn};
use std::sync::Arc;

/// Receiver for synthesized poses
pub trait PoseSink: Send + Sync {
    /// Publish one pose
    ///
    /// # Errors
    ///
    /// Returns an error if the pose could not be delivered.
    fn publish(&self, pose: &ObjectPose) -> Result<()>;
}

/// A box that produced no pose
#[derive(Debug)]
pub struct BoxFailure {
    /// Position of the box within its batch
    pub index: usize,
    /// Class label of the box
    pub class: String,
    /// Why the box was skipped
    pub error: Error,
}

/// Outcome of one detection batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Capture time of the batch
    pub stamp_ns: u64,
    /// Capture time of the cloud the batch ran against
    pub cloud_stamp_ns: u64,
    /// Published poses, in box order
    pub poses: Vec<ObjectPose>,
    /// Skipped boxes, in box order
    pub failures: Vec<BoxFailure>,
}

impl BatchReport {
    /// Boxes seen in the batch
    #[must_use]
    pub fn total(&self) -> usize {
        self.poses.len() + self.failures.len()
    }

    /// Failures of one error kind, see [`Error::kind`]
    pub fn failures_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a BoxFailure> + 'a {
        self.failures.iter().filter(move |f| f.error.kind() == kind)
    }
}

/// Door/object pose projector
pub struct Projector {
    config: Config,
    buffer: CloudBuffer,
    transforms: Arc<dyn TransformProvider>,
    transformer: FrameTransformer,
    registry: EstimatorRegistry,
    pose_sink: Arc<dyn PoseSink>,
    debug_sink: Option<Arc<dyn DebugSink>>,
}

impl Projector {
    /// Projector with the RANSAC fitter described by `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if `config` does not validate.
    pub fn new(config: Config, transforms: Arc<dyn TransformProvider>, pose_sink: Arc<dyn PoseSink>) -> Result<Self> {
        let fitter = Arc::new(config.ransac_fitter());
        Self::with_fitter(config, transforms, fitter, pose_sink)
    }

    /// Projector with a caller-supplied plane fitter for doors
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if `config` does not validate.
    pub fn with_fitter(
        config: Config,
        transforms: Arc<dyn TransformProvider>,
        fitter: Arc<dyn PlaneFitter>,
        pose_sink: Arc<dyn PoseSink>,
    ) -> Result<Self> {
        let planar = PlanarObjectEstimator::new(
            config.localization.strategy,
            config.intrinsics(),
            config.region.policy,
            fitter,
        );
        Self::with_registry(config, transforms, EstimatorRegistry::with_planar_doors(planar), pose_sink)
    }

    /// Projector with a caller-supplied estimator registry
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if `config` does not validate.
    pub fn with_registry(
        config: Config,
        transforms: Arc<dyn TransformProvider>,
        registry: EstimatorRegistry,
        pose_sink: Arc<dyn PoseSink>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Projector ready: {} <- {}, strategy {:?}, classes {:?}",
            config.frames.world_frame,
            config.frames.sensor_frame,
            config.localization.strategy,
            registry.classes()
        );

        let transformer = FrameTransformer::new(
            Arc::clone(&transforms),
            config.frames.world_frame.clone(),
            config.frames.sensor_frame.clone(),
            config.lookup_timeout(),
        );

        Ok(Self {
            config,
            buffer: CloudBuffer::new(),
            transforms,
            transformer,
            registry,
            pose_sink,
            debug_sink: None,
        })
    }

    /// Also publish arrow markers and inlier clouds, as enabled in the config
    #[must_use]
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Currently buffered cloud
    #[must_use]
    pub fn latest_cloud(&self) -> Option<Arc<PointCloudFrame>> {
        self.buffer.snapshot()
    }

    /// Buffer a new cloud, moving it into the sensor frame first if needed
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransformUnavailable`] if the cloud's frame cannot be
    /// related to the sensor frame in time. The previous cloud stays buffered.
    pub fn on_cloud(&self, frame: PointCloudFrame) -> Result<()> {
        let sensor_frame = &self.config.frames.sensor_frame;
        let frame = if frame.frame_id() == sensor_frame {
            frame
        } else {
            let sensor_from_cloud = self
                .transforms
                .lookup(sensor_frame, frame.frame_id(), self.config.cloud_timeout())
                .map_err(|e| {
                    warn!("Dropping cloud from '{}': {e}", frame.frame_id());
                    e
                })?;
            frame.transformed(&sensor_from_cloud, sensor_frame.clone())?
        };

        debug!(
            "Buffered cloud {}x{} ({} valid) at {}",
            frame.width(),
            frame.height(),
            frame.valid_count(),
            frame.stamp_ns()
        );
        self.buffer.replace(frame);
        Ok(())
    }

    /// Run every box of `batch` against the latest cloud
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCloud`] if no cloud has been buffered yet. Per-box
    /// failures do not fail the batch; they are listed in the report.
    pub fn on_detections(&self, batch: &DetectionBatch) -> Result<BatchReport> {
        let cloud = self.buffer.snapshot().ok_or(Error::NoCloud)?;

        let mut report = BatchReport {
            stamp_ns: batch.stamp_ns,
            cloud_stamp_ns: cloud.stamp_ns(),
            ..BatchReport::default()
        };

        for (index, bbox) in batch.boxes.iter().enumerate() {
            match self.process_box(&cloud, index, bbox) {
                Ok(pose) => report.poses.push(pose),
                Err(error) => {
                    warn!("Skipping box {index} ('{}'): {error}", bbox.class);
                    report.failures.push(BoxFailure {
                        index,
                        class: bbox.class.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Batch {}: {} of {} boxes projected",
            batch.stamp_ns,
            report.poses.len(),
            report.total()
        );
        Ok(report)
    }

    fn process_box(&self, cloud: &PointCloudFrame, index: usize, bbox: &DetectionBox) -> Result<ObjectPose> {
        let estimator = self.registry.get(&bbox.class)?;
        let estimation = estimator.estimate(cloud, bbox, &self.transformer)?;
        self.pose_sink.publish(&estimation.pose)?;
        self.publish_debug(index, cloud.stamp_ns(), &estimation);
        Ok(estimation.pose)
    }

    fn publish_debug(&self, index: usize, stamp_ns: u64, estimation: &Estimation) {
        let Some(sink) = &self.debug_sink else {
            return;
        };
        let world_frame = self.transformer.world_frame();

        if self.config.debug.markers {
            sink.publish_marker(&ArrowMarker::from_estimate(index, world_frame, &estimation.world));
        }
        if self.config.debug.inliers {
            match inlier_cloud(&estimation.inliers, &estimation.world_from_sensor, world_frame, stamp_ns) {
                Ok(cloud) => sink.publish_inliers(&cloud),
                Err(e) => debug!("Inlier cloud for box {index} not published: {e}"),
            }
        }
    }
}
