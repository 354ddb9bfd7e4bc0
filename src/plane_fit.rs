//! RANSAC plane segmentation.
//!
//! The pipeline only depends on the [`PlaneFitter`] trait: given the positions
//! of a region cloud, return plane coefficients and the indices of the points
//! consistent with the plane. [`RansacPlaneFitter`] is the stock implementation.

use crate::{
    constants::{
        DEFAULT_RANSAC_CONFIDENCE, DEFAULT_RANSAC_DISTANCE_THRESHOLD, DEFAULT_RANSAC_MAX_ITERATIONS,
        DEFAULT_RANSAC_SEED, EPSILON, PLANE_MIN_SAMPLES,
    },
    geometry::Plane,
    Error, Result,
};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rand::{rngs::StdRng, seq::index, SeedableRng};

/// Fitted plane plus the indices of its inliers, in ascending order
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneFit {
    pub plane: Plane,
    pub inliers: Vec<usize>,
}

/// Plane segmentation primitive
pub trait PlaneFitter: Send + Sync {
    /// Fit the dominant plane of `points`
    ///
    /// Non-finite points must never be reported as inliers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlaneFit`] if no plane can be found.
    fn fit(&self, points: &[Point3<f64>]) -> Result<PlaneFit>;
}

/// RANSAC plane fitter with an optional least-squares refinement
#[derive(Debug, Clone, PartialEq)]
pub struct RansacPlaneFitter {
    /// Maximum point-to-plane distance of an inlier
    pub distance_threshold: f64,
    /// Upper bound on the number of hypotheses
    pub max_iterations: usize,
    /// Desired probability of drawing one all-inlier sample
    pub confidence: f64,
    /// RNG seed, fixed so results are reproducible
    pub seed: u64,
    /// Refit the plane to all inliers of the best hypothesis
    pub optimize_coefficients: bool,
}

impl Default for RansacPlaneFitter {
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

impl RansacPlaneFitter {
    #[must_use]
    pub fn new(distance_threshold: f64) -> Self {
        Self {
            distance_threshold,
            ..Self::default()
        }
    }

    /// Unit-normal plane through three points, `None` if they are collinear
    fn plane_through(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Option<Plane> {
        let normal = (p1 - p0).cross(&(p2 - p0));
        let norm = normal.norm();
        if !norm.is_finite() || norm < EPSILON {
            return None;
        }
        let n = normal / norm;
        Plane::new(n.x, n.y, n.z, -n.dot(&p0.coords)).ok()
    }

    /// Total least-squares plane through `indices`
    fn refit(points: &[Point3<f64>], indices: &[usize]) -> Option<Plane> {
        if indices.len() < PLANE_MIN_SAMPLES {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = indices.len() as f64;
        let centroid = indices.iter().fold(Vector3::zeros(), |acc, &i| acc + points[i].coords) / count;
        let covariance = indices.iter().fold(Matrix3::zeros(), |acc, &i| {
            let d = points[i].coords - centroid;
            acc + d * d.transpose()
        });

        let eigen = SymmetricEigen::new(covariance);
        let normal = eigen.eigenvectors.column(eigen.eigenvalues.imin()).into_owned();
        Plane::new(normal.x, normal.y, normal.z, -normal.dot(&centroid)).ok()
    }

    fn inliers_of(&self, plane: &Plane, points: &[Point3<f64>], candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&i| plane.distance(&points[i]) <= self.distance_threshold)
            .collect()
    }

    /// Iteration bound needed to hit `confidence` at the current inlier ratio
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn required_iterations(&self, inlier_ratio: f64, iterations_so_far: usize) -> usize {
        if self.confidence <= 0.0 || inlier_ratio <= 0.0 {
            return self.max_iterations;
        }
        let denom = (1.0 - inlier_ratio.powi(3)).max(1e-12).ln();
        if denom >= 0.0 {
            return self.max_iterations;
        }
        let needed = ((1.0 - self.confidence).ln() / denom).ceil();
        if !needed.is_finite() {
            return self.max_iterations;
        }
        (needed as usize).clamp(iterations_so_far, self.max_iterations)
    }
}

impl PlaneFitter for RansacPlaneFitter {
    fn fit(&self, points: &[Point3<f64>]) -> Result<PlaneFit> {
        let valid: Vec<usize> = (0..points.len())
            .filter(|&i| points[i].coords.iter().all(|c| c.is_finite()))
            .collect();

        if valid.len() < PLANE_MIN_SAMPLES {
            return Err(Error::PlaneFit(format!(
                "need at least {PLANE_MIN_SAMPLES} valid points, got {}",
                valid.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<PlaneFit> = None;
        let mut max_iterations = self.max_iterations;
        let mut iterations = 0;

        while iterations < max_iterations {
            iterations += 1;

            let sample = index::sample(&mut rng, valid.len(), PLANE_MIN_SAMPLES);
            let [a, b, c] = [sample.index(0), sample.index(1), sample.index(2)].map(|k| &points[valid[k]]);
            let Some(plane) = Self::plane_through(a, b, c) else {
                continue;
            };

            let inliers = self.inliers_of(&plane, points, &valid);
            if best.as_ref().map_or(true, |b| inliers.len() > b.inliers.len()) {
                #[allow(clippy::cast_precision_loss)]
                let ratio = inliers.len() as f64 / valid.len() as f64;
                max_iterations = self.required_iterations(ratio, iterations);
                best = Some(PlaneFit { plane, inliers });
            }
        }

        let mut best = best.ok_or_else(|| Error::PlaneFit("all samples were degenerate".to_string()))?;
        log::debug!(
            "RANSAC kept {} of {} valid points after {} iterations",
            best.inliers.len(),
            valid.len(),
            iterations
        );

        if self.optimize_coefficients {
            if let Some(refined) = Self::refit(points, &best.inliers) {
                let inliers = self.inliers_of(&refined, points, &valid);
                if inliers.len() >= best.inliers.len() {
                    best = PlaneFit { plane: refined, inliers };
                }
            }
        }

        // Orient the normal away from the sensor origin
        if best.plane.d > 0.0 {
            best.plane = best.plane.flipped();
        }

        Ok(best)
    }
}
