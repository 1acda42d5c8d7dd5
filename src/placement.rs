//! Rectangular store placement inside a fixed footprint.

use crate::affinity::{AffinityTable, CompiledAffinity};
use crate::config::GaParams;
use crate::context::EvolutionContext;
use crate::error::ConfigError;
use crate::genetic_algorithm::{Direction, Fitness, GeneSampler, Mutation, Strategies};
use crate::geometry::Rect;
use crate::operators::{RepeatInitializer, TournamentSelection};
use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// One store slot: a rectangle plus an optional index into the category vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorePlot {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub category: Option<usize>,
}

impl StorePlot {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn diagonal(&self) -> f64 {
        (self.width as f64).hypot(self.height as f64)
    }

    pub fn contains(&self, plot: &StorePlot) -> bool {
        plot.x >= 0.0
            && plot.y >= 0.0
            && plot.x + plot.width <= self.width as f64
            && plot.y + plot.height <= self.height as f64
    }
}

/// Inclusive bounds for store width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: u32,
    pub max: u32,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self { min: 5, max: 10 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementWeights {
    pub spacing: f64,
    pub area: f64,
    pub overlap: f64,
    /// Two stores are connected when their centers are closer than this.
    pub connection_threshold: f64,
    pub deadend: f64,
}

impl Default for PlacementWeights {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            area: 1.0,
            overlap: 1000.0,
            connection_threshold: 15.0,
            deadend: 25.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianParams {
    pub mu: f64,
    pub sigma: f64,
    /// Chance that a mutated store also draws a new category.
    pub category_probability: f64,
}

impl Default for GaussianParams {
    fn default() -> Self {
        Self {
            mu: 0.0,
            sigma: 1.0,
            category_probability: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub footprint: Footprint,
    pub slots: usize,
    #[serde(default)]
    pub size_range: SizeRange,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub affinity: AffinityTable,
    #[serde(default)]
    pub weights: PlacementWeights,
    #[serde(default)]
    pub mutation: GaussianParams,
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.footprint.width == 0 || self.footprint.height == 0 {
            return Err(ConfigError::EmptyDomain("footprint"));
        }
        if self.slots == 0 {
            return Err(ConfigError::EmptyDomain("store slots"));
        }

        let SizeRange { min, max } = self.size_range;
        if min > max || max > self.footprint.width || max > self.footprint.height {
            return Err(ConfigError::SizeRange {
                min,
                max,
                width: self.footprint.width,
                height: self.footprint.height,
            });
        }

        if !self.mutation.sigma.is_finite() || self.mutation.sigma < 0.0 {
            return Err(ConfigError::InvalidSigma(self.mutation.sigma));
        }
        if !(0.0..=1.0).contains(&self.mutation.category_probability) {
            return Err(ConfigError::InvalidProbability {
                field: "mutation.category_probability",
                value: self.mutation.category_probability,
            });
        }

        // An overlapping pair must always cost more than the best a pair can earn.
        let largest = max as f64;
        let pair_reward = self.weights.spacing.max(0.0) * self.footprint.diagonal()
            + self.weights.area.max(0.0) * 2.0 * largest * largest;
        if !(self.weights.overlap > pair_reward) {
            return Err(ConfigError::OverlapNotDominant {
                penalty: self.weights.overlap,
                pair_reward,
            });
        }

        Ok(())
    }
}

// Draws a store exactly like the initial population does
#[derive(Clone, Copy, Debug)]
pub struct PlotSampler {
    pub footprint: Footprint,
    pub size: SizeRange,
    pub categories: usize,
}

impl GeneSampler<StorePlot> for PlotSampler {
    fn sample(&self, ctx: &mut EvolutionContext) -> StorePlot {
        let rng = ctx.rng();
        let width = rng.gen_range(self.size.min..=self.size.max);
        let height = rng.gen_range(self.size.min..=self.size.max);
        let x = rng.gen_range(0..=self.footprint.width - width);
        let y = rng.gen_range(0..=self.footprint.height - height);
        let category = (self.categories > 0).then(|| rng.gen_range(0..self.categories));

        StorePlot {
            x: x as f64,
            y: y as f64,
            width: width as f64,
            height: height as f64,
            category,
        }
    }
}

/// Gaussian perturbation of every numeric field, then clamping back into the footprint.
#[derive(Clone, Debug)]
pub struct GaussianMutation {
    pub footprint: Footprint,
    pub size: SizeRange,
    pub categories: usize,
    pub noise: Normal<f64>,
    pub indpb: f64,
    pub category_probability: f64,
}

impl GaussianMutation {
    /// Size first, then position using the clamped size.
    pub fn clamp(&self, plot: &mut StorePlot) {
        plot.width = plot.width.clamp(self.size.min as f64, self.size.max as f64);
        plot.height = plot.height.clamp(self.size.min as f64, self.size.max as f64);
        plot.x = plot.x.clamp(0.0, self.footprint.width as f64 - plot.width);
        plot.y = plot.y.clamp(0.0, self.footprint.height as f64 - plot.height);
    }
}

impl Mutation<StorePlot> for GaussianMutation {
    fn mutate(&self, genes: &mut [StorePlot], ctx: &mut EvolutionContext) {
        for plot in genes.iter_mut() {
            if !ctx.chance(self.indpb) {
                continue;
            }

            let rng = ctx.rng();
            plot.x += self.noise.sample(rng);
            plot.y += self.noise.sample(rng);
            plot.width += self.noise.sample(rng);
            plot.height += self.noise.sample(rng);
            self.clamp(plot);

            if self.categories > 0 && ctx.chance(self.category_probability) {
                plot.category = Some(ctx.index(self.categories));
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PlacementBreakdown {
    pub spacing: f64,
    pub area: f64,
    pub overlapping_pairs: usize,
    pub overlap_penalty: f64,
    pub deadends: usize,
    pub deadend_penalty: f64,
    pub affinity_bonus: f64,
    pub affinity_penalty: f64,
    pub total: f64,
}

pub fn total_spacing(plots: &[StorePlot]) -> f64 {
    plots
        .iter()
        .tuple_combinations()
        .map(|(a, b)| a.rect().center().distance(&b.rect().center()))
        .sum()
}

pub fn total_area(plots: &[StorePlot]) -> f64 {
    plots.iter().map(|plot| plot.rect().area()).sum()
}

pub fn overlapping_pairs(plots: &[StorePlot]) -> usize {
    plots
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| a.rect().intersects(&b.rect()))
        .count()
}

/// Undirected graph with one node per store; an edge joins stores whose centers
/// are closer than `threshold`.
pub fn proximity_graph(plots: &[StorePlot], threshold: f64) -> UnGraph<usize, f64> {
    let mut graph = UnGraph::with_capacity(plots.len(), plots.len());
    let nodes: Vec<NodeIndex> = (0..plots.len()).map(|i| graph.add_node(i)).collect();

    for ((i, a), (j, b)) in plots.iter().enumerate().tuple_combinations() {
        let distance = a.rect().center().distance(&b.rect().center());
        if distance < threshold {
            graph.add_edge(nodes[i], nodes[j], distance);
        }
    }

    graph
}

/// Stores with at most one neighbour in the proximity graph.
pub fn count_deadends(plots: &[StorePlot], threshold: f64) -> usize {
    let graph = proximity_graph(plots, threshold);
    graph
        .node_indices()
        .filter(|&node| graph.neighbors(node).count() <= 1)
        .count()
}

#[derive(Clone, Debug)]
pub struct PlacementFitness {
    pub weights: PlacementWeights,
    pub affinity: CompiledAffinity,
}

impl PlacementFitness {
    pub fn breakdown(&self, plots: &[StorePlot]) -> PlacementBreakdown {
        let spacing = total_spacing(plots);
        let area = total_area(plots);
        let overlapping_pairs = overlapping_pairs(plots);
        let deadends = count_deadends(plots, self.weights.connection_threshold);
        let affinity = self.affinity.score(plots);

        let overlap_penalty = overlapping_pairs as f64 * self.weights.overlap;
        let deadend_penalty = deadends as f64 * self.weights.deadend;
        let total = self.weights.spacing * spacing + self.weights.area * area
            - overlap_penalty
            - deadend_penalty
            + affinity.bonus
            - affinity.penalty;

        PlacementBreakdown {
            spacing,
            area,
            overlapping_pairs,
            overlap_penalty,
            deadends,
            deadend_penalty,
            affinity_bonus: affinity.bonus,
            affinity_penalty: affinity.penalty,
            total,
        }
    }
}

impl Fitness<StorePlot> for PlacementFitness {
    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    fn evaluate(&self, genes: &[StorePlot]) -> f64 {
        self.breakdown(genes).total
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StoreRecord {
    pub slot: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub category: Option<String>,
}

/// A validated placement run: configuration plus the compiled affinity table.
#[derive(Clone, Debug)]
pub struct PlacementProblem {
    config: PlacementConfig,
    fitness: PlacementFitness,
}

impl PlacementProblem {
    pub fn new(config: PlacementConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let affinity = config.affinity.compile(&config.categories)?;
        let fitness = PlacementFitness {
            weights: config.weights,
            affinity,
        };
        Ok(Self { config, fitness })
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn sampler(&self) -> PlotSampler {
        PlotSampler {
            footprint: self.config.footprint,
            size: self.config.size_range,
            categories: self.config.categories.len(),
        }
    }

    pub fn mutation(&self, indpb: f64) -> Result<GaussianMutation, ConfigError> {
        let params = self.config.mutation;
        let noise = Normal::new(params.mu, params.sigma)
            .map_err(|_| ConfigError::InvalidSigma(params.sigma))?;

        Ok(GaussianMutation {
            footprint: self.config.footprint,
            size: self.config.size_range,
            categories: self.config.categories.len(),
            noise,
            indpb,
            category_probability: params.category_probability,
        })
    }

    pub fn strategies(&self, ga: &GaParams) -> Result<Strategies<StorePlot>, ConfigError> {
        Ok(Strategies {
            initializer: Box::new(RepeatInitializer {
                sampler: self.sampler(),
                length: self.config.slots,
            }),
            fitness: Box::new(self.fitness.clone()),
            crossover: ga.crossover.strategy(),
            mutation: Box::new(self.mutation(ga.gene_mutation_probability)?),
            selection: Box::new(TournamentSelection {
                size: ga.tournament_size,
            }),
        })
    }

    pub fn breakdown(&self, plots: &[StorePlot]) -> PlacementBreakdown {
        self.fitness.breakdown(plots)
    }

    /// A layout is usable when it has stores, all of them inside the footprint,
    /// and no two of them overlap.
    pub fn is_usable(&self, plots: &[StorePlot]) -> bool {
        !plots.is_empty()
            && plots.iter().all(|plot| self.config.footprint.contains(plot))
            && overlapping_pairs(plots) == 0
    }

    pub fn records(&self, plots: &[StorePlot]) -> Vec<StoreRecord> {
        plots
            .iter()
            .enumerate()
            .map(|(slot, plot)| StoreRecord {
                slot,
                x: plot.x,
                y: plot.y,
                width: plot.width,
                height: plot.height,
                category: plot
                    .category
                    .and_then(|c| self.config.categories.get(c).cloned()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::AffinityRule;

    fn square(x: f64, y: f64, side: f64) -> StorePlot {
        StorePlot {
            x,
            y,
            width: side,
            height: side,
            category: None,
        }
    }

    fn config() -> PlacementConfig {
        PlacementConfig {
            footprint: Footprint {
                width: 50,
                height: 50,
            },
            slots: 4,
            size_range: SizeRange::default(),
            categories: vec![],
            affinity: AffinityTable::default(),
            weights: PlacementWeights::default(),
            mutation: GaussianParams::default(),
        }
    }

    #[test]
    fn isolated_stores_are_all_deadends() {
        let plots: Vec<StorePlot> = (0..4).map(|i| square(i as f64 * 12.0, 0.0, 6.0)).collect();
        // centers 12 apart with a threshold of 10: no edges
        assert_eq!(count_deadends(&plots, 10.0), 4);

        let fitness = PlacementFitness {
            weights: PlacementWeights {
                connection_threshold: 10.0,
                ..Default::default()
            },
            affinity: CompiledAffinity::default(),
        };
        let breakdown = fitness.breakdown(&plots);
        assert_eq!(breakdown.deadend_penalty, 4.0 * 25.0);
    }

    #[test]
    fn chain_has_two_deadends() {
        let plots: Vec<StorePlot> = (0..3).map(|i| square(i as f64 * 8.0, 0.0, 5.0)).collect();
        // a - b - c: the ends have degree one, the middle degree two
        assert_eq!(count_deadends(&plots, 10.0), 2);

        let graph = proximity_graph(&plots, 10.0);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn overlap_penalty_dominates() {
        let fitness = PlacementFitness {
            weights: PlacementWeights::default(),
            affinity: CompiledAffinity::default(),
        };
        let apart = vec![square(0.0, 0.0, 5.0), square(20.0, 20.0, 5.0)];
        let stacked = vec![square(0.0, 0.0, 10.0), square(1.0, 1.0, 10.0)];

        let stacked_breakdown = fitness.breakdown(&stacked);
        assert_eq!(stacked_breakdown.overlapping_pairs, 1);
        assert_eq!(stacked_breakdown.overlap_penalty, 1000.0);
        assert!(fitness.evaluate(&apart) > fitness.evaluate(&stacked));
    }

    #[test]
    fn breakdown_sums_its_terms() {
        let fitness = PlacementFitness {
            weights: PlacementWeights::default(),
            affinity: CompiledAffinity::default(),
        };
        let plots = vec![square(0.0, 0.0, 6.0), square(30.0, 40.0, 6.0)];
        let b = fitness.breakdown(&plots);

        assert!((b.spacing - 50.0).abs() < 1e-9);
        assert_eq!(b.area, 72.0);
        assert_eq!(b.deadends, 2);
        assert!((b.total - (50.0 + 72.0 - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn sampler_respects_footprint() {
        let problem = PlacementProblem::new(config()).unwrap();
        let sampler = problem.sampler();
        let mut ctx = EvolutionContext::seeded(17);

        for _ in 0..500 {
            let plot = sampler.sample(&mut ctx);
            assert!(problem.config().footprint.contains(&plot));
            assert!((5.0..=10.0).contains(&plot.width));
            assert!((5.0..=10.0).contains(&plot.height));
            assert_eq!(plot.x.fract(), 0.0);
            assert_eq!(plot.category, None);
        }
    }

    #[test]
    fn mutation_clamps_back_into_bounds() {
        let mut cfg = config();
        cfg.mutation.sigma = 25.0;
        let problem = PlacementProblem::new(cfg).unwrap();
        let mutation = problem.mutation(1.0).unwrap();
        let mut ctx = EvolutionContext::seeded(23);

        let mut plots = vec![square(0.0, 0.0, 5.0), square(40.0, 40.0, 10.0)];
        for _ in 0..200 {
            mutation.mutate(&mut plots, &mut ctx);
            for plot in &plots {
                assert!((5.0..=10.0).contains(&plot.width));
                assert!((5.0..=10.0).contains(&plot.height));
                assert!(plot.x >= 0.0 && plot.y >= 0.0);
                assert!(plot.x + plot.width <= 50.0);
                assert!(plot.y + plot.height <= 50.0);
            }
        }
    }

    #[test]
    fn validation_rejects_bad_domains() {
        let mut cfg = config();
        cfg.footprint.width = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyDomain("footprint")));

        let mut cfg = config();
        cfg.size_range = SizeRange { min: 8, max: 6 };
        assert!(matches!(cfg.validate(), Err(ConfigError::SizeRange { .. })));

        let mut cfg = config();
        cfg.weights.overlap = 100.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OverlapNotDominant { .. })
        ));
    }

    #[test]
    fn affinity_flows_into_the_total() {
        let mut cfg = config();
        cfg.categories = vec!["cinema".into(), "food".into()];
        cfg.affinity =
            AffinityTable::default().with_rule("cinema", AffinityRule::Unique { penalty: 40.0 });
        let problem = PlacementProblem::new(cfg).unwrap();

        let mut a = square(0.0, 0.0, 6.0);
        let mut b = square(30.0, 40.0, 6.0);
        a.category = Some(0);
        b.category = Some(0);
        let both_cinemas = problem.breakdown(&[a, b]);
        b.category = Some(1);
        let one_cinema = problem.breakdown(&[a, b]);

        assert_eq!(both_cinemas.affinity_penalty, 40.0);
        assert_eq!(one_cinema.affinity_penalty, 0.0);
        assert!((one_cinema.total - both_cinemas.total - 40.0).abs() < 1e-9);

        let records = problem.records(&[a, b]);
        assert_eq!(records[0].category.as_deref(), Some("cinema"));
        assert_eq!(records[1].category.as_deref(), Some("food"));
    }
}
