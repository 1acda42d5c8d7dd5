//! Seeded k-means over boundary points, for inputs that arrive without cluster labels.

use crate::context::EvolutionContext;
use crate::error::ConfigError;
use crate::geometry::Point;
use crate::preprocess::{BoundaryPointSet, ClusterAssignment};
use rand::seq::index;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    /// Defaults to the number of entries when left out.
    pub clusters: Option<usize>,
    pub max_iterations: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            clusters: None,
            max_iterations: 100,
        }
    }
}

fn nearest(point: &Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (cluster, centroid) in centroids.iter().enumerate() {
        let distance = centroid.distance(point);
        if distance < best_distance {
            best = cluster;
            best_distance = distance;
        }
    }
    best
}

/// Lloyd iterations from `k` distinct random points. A cluster that runs empty is
/// reseeded with the point farthest from its current centroid.
pub fn kmeans(
    points: &BoundaryPointSet,
    k: usize,
    max_iterations: usize,
    ctx: &mut EvolutionContext,
) -> Result<ClusterAssignment, ConfigError> {
    if k == 0 {
        return Err(ConfigError::NonPositive { field: "clusters" });
    }
    if k > points.len() {
        return Err(ConfigError::TooManyClusters {
            clusters: k,
            points: points.len(),
        });
    }

    let coords: Vec<Point> = points.iter().map(|p| p.to_point()).collect();
    let mut centroids: Vec<Point> = index::sample(ctx.rng(), coords.len(), k)
        .into_iter()
        .map(|i| coords[i])
        .collect();
    let mut labels: Vec<usize> = vec![usize::MAX; coords.len()];

    for iteration in 0..max_iterations {
        let next: Vec<usize> = coords
            .par_iter()
            .map(|point| nearest(point, &centroids))
            .collect();
        let changed = next != labels;
        labels = next;

        let mut sums = vec![(0.0, 0.0, 0usize); k];
        for (point, &cluster) in coords.iter().zip(&labels) {
            sums[cluster].0 += point.x;
            sums[cluster].1 += point.y;
            sums[cluster].2 += 1;
        }

        for (cluster, (sx, sy, n)) in sums.into_iter().enumerate() {
            if n > 0 {
                centroids[cluster] = Point::new(sx / n as f64, sy / n as f64);
            } else {
                let farthest = coords
                    .iter()
                    .zip(&labels)
                    .map(|(point, &owner)| (point, centroids[owner].distance(point)))
                    .fold((coords[0], f64::NEG_INFINITY), |best, (point, d)| {
                        if d > best.1 {
                            (*point, d)
                        } else {
                            best
                        }
                    });
                centroids[cluster] = farthest.0;
            }
        }

        if !changed {
            debug!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    // Final assignment against the last centroids.
    let labels: Vec<Option<usize>> = coords
        .par_iter()
        .map(|point| Some(nearest(point, &centroids)))
        .collect();

    ClusterAssignment::from_labels(points, labels)
}
