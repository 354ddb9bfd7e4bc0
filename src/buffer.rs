//! Latest-wins point cloud slot shared between the cloud and detection paths.

use crate::point_cloud::PointCloudFrame;
use parking_lot::RwLock;
use std::sync::Arc;

/// Single-slot cloud buffer
///
/// Writers swap in a new `Arc`; readers clone the `Arc` and release the lock
/// before doing any work, so a batch always sees one complete cloud.
#[derive(Debug, Default)]
pub struct CloudBuffer {
    slot: RwLock<Option<Arc<PointCloudFrame>>>,
}

impl CloudBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffered cloud, returning the previous one
    pub fn replace(&self, frame: PointCloudFrame) -> Option<Arc<PointCloudFrame>> {
        let frame = Arc::new(frame);
        self.slot.write().replace(frame)
    }

    /// Current cloud, if any has arrived
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<PointCloudFrame>> {
        self.slot.read().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.read().is_none()
    }
}
