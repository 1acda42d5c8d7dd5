//! The boundary/cluster data the optimizer consumes.
//!
//! Boundary points come from an external color-mask/contour step and cluster labels
//! from an external clustering step (or from [`crate::clustering`]). Both are wrapped
//! once, validated, and then shared read-only for the whole run.

use crate::error::{ConfigError, LayoutResult};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

/// Ordered, non-empty, immutable boundary samples. Cloning shares the storage.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryPointSet {
    points: Arc<[GridPoint]>,
}

impl BoundaryPointSet {
    pub fn new(points: Vec<GridPoint>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::EmptyDomain("boundary point set"));
        }
        Ok(Self {
            points: points.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<GridPoint> {
        self.points.get(index).copied()
    }

    pub fn as_slice(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridPoint> {
        self.points.iter()
    }
}

/// Per-point cluster id (`None` for noise) plus one centroid per cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterAssignment {
    labels: Arc<[Option<usize>]>,
    centroids: Arc<[Point]>,
}

impl ClusterAssignment {
    /// Centroids are the mean of each cluster's member points. Cluster ids must be
    /// dense: every id below the largest one needs at least one member.
    pub fn from_labels(
        points: &BoundaryPointSet,
        labels: Vec<Option<usize>>,
    ) -> Result<Self, ConfigError> {
        if labels.len() != points.len() {
            return Err(ConfigError::LabelMismatch {
                labels: labels.len(),
                points: points.len(),
            });
        }

        let clusters = match labels.iter().flatten().max() {
            None => return Err(ConfigError::EmptyDomain("clusters")),
            Some(&max) if max >= points.len() => {
                // more ids than points means some cluster must be empty
                return Err(ConfigError::TooManyClusters {
                    clusters: max.saturating_add(1),
                    points: points.len(),
                });
            }
            Some(&max) => max + 1,
        };

        let mut sums = vec![(0.0, 0.0, 0usize); clusters];
        for (point, label) in points.iter().zip(&labels) {
            if let Some(cluster) = label {
                let entry = &mut sums[*cluster];
                entry.0 += point.x as f64;
                entry.1 += point.y as f64;
                entry.2 += 1;
            }
        }

        let centroids = sums
            .into_iter()
            .enumerate()
            .map(|(cluster, (sx, sy, n))| {
                if n == 0 {
                    Err(ConfigError::EmptyCluster(cluster))
                } else {
                    Ok(Point::new(sx / n as f64, sy / n as f64))
                }
            })
            .collect::<Result<Vec<Point>, ConfigError>>()?;

        Ok(Self {
            labels: labels.into(),
            centroids: centroids.into(),
        })
    }

    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    pub fn label(&self, point_index: usize) -> Option<usize> {
        self.labels.get(point_index).copied().flatten()
    }

    pub fn labels(&self) -> &[Option<usize>] {
        &self.labels
    }

    pub fn centroid(&self, cluster: usize) -> Point {
        self.centroids[cluster]
    }

    pub fn centroids(&self) -> &[Point] {
        &self.centroids
    }

    pub fn nearest_centroid(&self, point: &Point) -> (usize, f64) {
        self.centroids
            .iter()
            .enumerate()
            .map(|(cluster, centroid)| (cluster, centroid.distance(point)))
            .fold((0, f64::INFINITY), |best, candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, label)| **label == Some(cluster))
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Deserialize)]
struct PointRecord {
    x: i32,
    y: i32,
    #[serde(default)]
    cluster: Option<i64>,
}

/// Boundary points read from an external source, with labels when every row had one.
#[derive(Clone, Debug)]
pub struct LabeledPoints {
    pub points: BoundaryPointSet,
    pub labels: Option<Vec<Option<usize>>>,
}

/// Reads `x,y[,cluster]` rows with a header. Negative cluster ids mark noise.
pub fn read_points_csv<R: Read>(reader: R) -> LayoutResult<LabeledPoints> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    let mut labels = Vec::new();
    let mut labelled_rows = 0;

    for record in csv_reader.deserialize() {
        let record: PointRecord = record?;
        points.push(GridPoint::new(record.x, record.y));
        if record.cluster.is_some() {
            labelled_rows += 1;
        }
        labels.push(
            record
                .cluster
                .and_then(|cluster| usize::try_from(cluster).ok()),
        );
    }

    let labels = (labelled_rows > 0 && labelled_rows == points.len()).then_some(labels);
    Ok(LabeledPoints {
        points: BoundaryPointSet::new(points)?,
        labels,
    })
}

pub fn load_points_csv<P: AsRef<Path>>(path: P) -> LayoutResult<LabeledPoints> {
    read_points_csv(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> BoundaryPointSet {
        BoundaryPointSet::new(vec![
            GridPoint::new(0, 0),
            GridPoint::new(2, 0),
            GridPoint::new(10, 10),
            GridPoint::new(12, 10),
        ])
        .unwrap()
    }

    #[test]
    fn empty_boundary_is_rejected() {
        assert_eq!(
            BoundaryPointSet::new(vec![]),
            Err(ConfigError::EmptyDomain("boundary point set"))
        );
    }

    #[test]
    fn centroids_are_member_means() {
        let points = square();
        let clusters =
            ClusterAssignment::from_labels(&points, vec![Some(0), Some(0), Some(1), Some(1)])
                .unwrap();
        assert_eq!(clusters.cluster_count(), 2);
        assert_eq!(clusters.centroid(0), Point::new(1.0, 0.0));
        assert_eq!(clusters.centroid(1), Point::new(11.0, 10.0));
        assert_eq!(clusters.members(1).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(clusters.nearest_centroid(&Point::new(9.0, 9.0)).0, 1);
    }

    #[test]
    fn noise_is_excluded_from_centroids() {
        let points = square();
        let clusters =
            ClusterAssignment::from_labels(&points, vec![Some(0), Some(0), None, None]).unwrap();
        assert_eq!(clusters.cluster_count(), 1);
        assert_eq!(clusters.label(2), None);
    }

    #[test]
    fn gaps_in_cluster_ids_are_rejected() {
        let points = square();
        assert_eq!(
            ClusterAssignment::from_labels(&points, vec![Some(0), Some(0), Some(2), Some(2)]),
            Err(ConfigError::EmptyCluster(1))
        );
        assert!(matches!(
            ClusterAssignment::from_labels(&points, vec![Some(0)]),
            Err(ConfigError::LabelMismatch { .. })
        ));
    }

    #[test]
    fn csv_with_and_without_labels() {
        let labelled = "x,y,cluster\n0,0,0\n4,0,0\n9,9,-1\n";
        let parsed = read_points_csv(labelled.as_bytes()).unwrap();
        assert_eq!(parsed.points.len(), 3);
        assert_eq!(parsed.labels, Some(vec![Some(0), Some(0), None]));

        let bare = "x,y\n1,2\n3,4\n";
        let parsed = read_points_csv(bare.as_bytes()).unwrap();
        assert_eq!(parsed.points.get(1), Some(GridPoint::new(3, 4)));
        assert_eq!(parsed.labels, None);
    }

    #[test]
    fn cluster_ids_beyond_the_point_count_are_rejected() {
        let parsed =
            read_points_csv("x,y,cluster\n0,0,0\n1,1,9223372036854775807\n".as_bytes()).unwrap();
        let labels = parsed.labels.unwrap();
        assert_eq!(
            ClusterAssignment::from_labels(&parsed.points, labels),
            Err(ConfigError::TooManyClusters {
                clusters: 9223372036854775808,
                points: 2,
            })
        );

        let points = square();
        assert!(matches!(
            ClusterAssignment::from_labels(&points, vec![Some(0), Some(usize::MAX), None, None]),
            Err(ConfigError::TooManyClusters { points: 4, .. })
        ));
    }

    #[test]
    fn csv_without_rows_is_an_empty_domain() {
        let err = read_points_csv("x,y\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::LayoutError::Config(ConfigError::EmptyDomain(_))
        ));
    }
}
