//! Entrance selection: pick boundary points that sit close to cluster centroids.

use crate::clustering::KMeansParams;
use crate::config::GaParams;
use crate::context::EvolutionContext;
use crate::error::ConfigError;
use crate::genetic_algorithm::{Direction, Fitness, GeneSampler, Strategies};
use crate::geometry::Point;
use crate::operators::{RepeatInitializer, ResampleMutation, TournamentSelection};
use crate::preprocess::{BoundaryPointSet, ClusterAssignment, GridPoint};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which centroid a chosen point is measured against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidBinding {
    /// Gene `i` is the entrance of cluster `i`.
    #[default]
    Position,
    /// The chosen point's own cluster; noise points use the nearest centroid.
    PointLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntranceConfig {
    pub entries: usize,
    #[serde(default)]
    pub binding: CentroidBinding,
    /// CSV of `x,y[,cluster]`; the built-in outline is used when absent.
    #[serde(default)]
    pub points: Option<PathBuf>,
    #[serde(default)]
    pub kmeans: KMeansParams,
}

impl EntranceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries == 0 {
            return Err(ConfigError::EmptyDomain("entries"));
        }
        if self.kmeans.clusters == Some(0) {
            return Err(ConfigError::NonPositive { field: "kmeans.clusters" });
        }
        Ok(())
    }

    pub fn cluster_count(&self) -> usize {
        self.kmeans.clusters.unwrap_or(self.entries)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexSampler {
    pub len: usize,
}

impl GeneSampler<usize> for IndexSampler {
    fn sample(&self, ctx: &mut EvolutionContext) -> usize {
        ctx.index(self.len)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EntranceBreakdown {
    pub distances: Vec<f64>,
    pub total: f64,
}

#[derive(Clone, Debug)]
pub struct ClusterDistanceFitness {
    pub points: BoundaryPointSet,
    pub clusters: ClusterAssignment,
    pub binding: CentroidBinding,
}

impl ClusterDistanceFitness {
    fn distance(&self, position: usize, point_index: usize) -> f64 {
        let point = self.points.as_slice()[point_index].to_point();
        match self.binding {
            CentroidBinding::Position => self.clusters.centroid(position).distance(&point),
            CentroidBinding::PointLabel => match self.clusters.label(point_index) {
                Some(cluster) => self.clusters.centroid(cluster).distance(&point),
                None => self.clusters.nearest_centroid(&point).1,
            },
        }
    }

    pub fn breakdown(&self, genes: &[usize]) -> EntranceBreakdown {
        let distances: Vec<f64> = genes
            .iter()
            .enumerate()
            .map(|(position, &index)| self.distance(position, index))
            .collect();
        let total = distances.iter().sum();
        EntranceBreakdown { distances, total }
    }
}

impl Fitness<usize> for ClusterDistanceFitness {
    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    fn evaluate(&self, genes: &[usize]) -> f64 {
        genes
            .iter()
            .enumerate()
            .map(|(position, &index)| self.distance(position, index))
            .sum()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EntryRecord {
    pub entry: usize,
    pub point_index: usize,
    pub x: i32,
    pub y: i32,
    pub cluster: Option<usize>,
    pub distance: f64,
}

/// A validated entrance run over immutable boundary and cluster data.
#[derive(Clone, Debug)]
pub struct EntranceProblem {
    config: EntranceConfig,
    fitness: ClusterDistanceFitness,
}

impl EntranceProblem {
    pub fn new(
        config: EntranceConfig,
        points: BoundaryPointSet,
        clusters: ClusterAssignment,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.binding == CentroidBinding::Position && config.entries > clusters.cluster_count()
        {
            return Err(ConfigError::TooFewClusters {
                entries: config.entries,
                clusters: clusters.cluster_count(),
            });
        }
        if clusters.labels().len() != points.len() {
            return Err(ConfigError::LabelMismatch {
                labels: clusters.labels().len(),
                points: points.len(),
            });
        }

        let fitness = ClusterDistanceFitness {
            points,
            clusters,
            binding: config.binding,
        };
        Ok(Self { config, fitness })
    }

    pub fn config(&self) -> &EntranceConfig {
        &self.config
    }

    pub fn points(&self) -> &BoundaryPointSet {
        &self.fitness.points
    }

    pub fn clusters(&self) -> &ClusterAssignment {
        &self.fitness.clusters
    }

    pub fn strategies(&self, ga: &GaParams) -> Strategies<usize> {
        let sampler = IndexSampler {
            len: self.fitness.points.len(),
        };

        Strategies {
            initializer: Box::new(RepeatInitializer {
                sampler,
                length: self.config.entries,
            }),
            fitness: Box::new(self.fitness.clone()),
            crossover: ga.crossover.strategy(),
            mutation: Box::new(ResampleMutation {
                sampler,
                indpb: ga.gene_mutation_probability,
            }),
            selection: Box::new(TournamentSelection {
                size: ga.tournament_size,
            }),
        }
    }

    pub fn breakdown(&self, genes: &[usize]) -> EntranceBreakdown {
        self.fitness.breakdown(genes)
    }

    pub fn is_usable(&self, genes: &[usize]) -> bool {
        !genes.is_empty() && genes.iter().all(|&index| index < self.fitness.points.len())
    }

    /// For every cluster, the member point closest to its centroid.
    pub fn reference_entries(&self) -> Vec<usize> {
        let clusters = &self.fitness.clusters;
        (0..clusters.cluster_count())
            .filter_map(|cluster| {
                let centroid = clusters.centroid(cluster);
                clusters.members(cluster).min_by(|&a, &b| {
                    let da = self.point(a).distance(&centroid);
                    let db = self.point(b).distance(&centroid);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .collect()
    }

    /// The best score any individual could reach under the `position` binding:
    /// each entry independently takes the boundary point closest to its centroid.
    pub fn lower_bound(&self) -> f64 {
        let clusters = &self.fitness.clusters;
        (0..self.config.entries.min(clusters.cluster_count()))
            .map(|cluster| {
                let centroid = clusters.centroid(cluster);
                self.fitness
                    .points
                    .iter()
                    .map(|p| p.to_point().distance(&centroid))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum()
    }

    fn point(&self, index: usize) -> Point {
        self.fitness.points.as_slice()[index].to_point()
    }

    pub fn records(&self, genes: &[usize]) -> Vec<EntryRecord> {
        let breakdown = self.breakdown(genes);
        genes
            .iter()
            .zip(breakdown.distances)
            .enumerate()
            .map(|(entry, (&point_index, distance))| {
                let GridPoint { x, y } = self.fitness.points.as_slice()[point_index];
                EntryRecord {
                    entry,
                    point_index,
                    x,
                    y,
                    cluster: self.fitness.clusters.label(point_index),
                    distance,
                }
            })
            .collect()
    }
}
