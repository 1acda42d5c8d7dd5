//! Wires a [`RunConfig`] to the matching problem, runs the optimizer and decodes the result.

use crate::assignment::{AssignmentProblem, Slot};
use crate::clustering::kmeans;
use crate::config::{GaParams, ProblemConfig, RunConfig};
use crate::context::EvolutionContext;
use crate::demo_data::boundary_outline;
use crate::entrance::{EntranceConfig, EntranceProblem};
use crate::error::LayoutResult;
use crate::export::{LayoutRecord, LayoutReport};
use crate::genetic_algorithm::{Gene, Strategies};
use crate::genetic_optimizer::{Evolution, GeneticOptimizer, Observer};
use crate::placement::{PlacementProblem, StorePlot};
use crate::preprocess::{load_points_csv, BoundaryPointSet, ClusterAssignment, LabeledPoints};
use std::time::Instant;
use tracing::{info, warn};

fn evolve<G: Gene>(
    ga: &GaParams,
    strategies: Strategies<G>,
    ctx: &mut EvolutionContext,
    observer: &mut dyn Observer<G>,
) -> LayoutResult<Evolution<G>> {
    let optimizer = GeneticOptimizer::new(ga.clone(), strategies)?;
    let start = Instant::now();
    let evolution = optimizer.optimize(ctx, observer);
    info!(
        "{} generations finished in {:.3}s",
        ga.generations,
        start.elapsed().as_secs_f64()
    );
    Ok(evolution)
}

fn report<G>(
    variant: &'static str,
    ga: &GaParams,
    ctx: &EvolutionContext,
    evolution: &Evolution<G>,
    usable: bool,
    layout: LayoutRecord,
) -> LayoutReport {
    if !usable {
        warn!("best {} layout breaks a hard constraint", variant);
    }
    LayoutReport {
        variant,
        seed: ctx.seed(),
        direction: evolution.direction,
        fitness: evolution.best.score(evolution.direction),
        generations: ga.generations,
        population_size: ga.population_size,
        usable,
        best_seen_fitness: evolution
            .best_seen
            .as_ref()
            .map(|c| c.score(evolution.direction)),
        layout,
        history: evolution.history.clone(),
    }
}

/// Boundary points from the configured CSV or the built-in outline, with cluster
/// labels taken from the input when present and from k-means otherwise.
pub fn load_boundary(
    config: &EntranceConfig,
    ctx: &mut EvolutionContext,
) -> LayoutResult<(BoundaryPointSet, ClusterAssignment)> {
    let LabeledPoints { points, labels } = match &config.points {
        Some(path) => load_points_csv(path)?,
        None => LabeledPoints {
            points: BoundaryPointSet::new(boundary_outline())?,
            labels: None,
        },
    };

    let clusters = match labels {
        Some(labels) => ClusterAssignment::from_labels(&points, labels)?,
        None => kmeans(
            &points,
            config.cluster_count(),
            config.kmeans.max_iterations,
            ctx,
        )?,
    };
    info!(
        "{} boundary points in {} clusters",
        points.len(),
        clusters.cluster_count()
    );

    Ok((points, clusters))
}

/// Hands out the observer matching each variant's gene type.
pub trait ObserverSet {
    fn assignment(&mut self) -> &mut dyn Observer<Slot>;
    fn placement(&mut self) -> &mut dyn Observer<StorePlot>;
    fn entrance(&mut self) -> &mut dyn Observer<usize>;
}

impl<T> ObserverSet for T
where
    T: Observer<Slot> + Observer<StorePlot> + Observer<usize>,
{
    fn assignment(&mut self) -> &mut dyn Observer<Slot> {
        self
    }

    fn placement(&mut self) -> &mut dyn Observer<StorePlot> {
        self
    }

    fn entrance(&mut self) -> &mut dyn Observer<usize> {
        self
    }
}

/// Validates the configuration, runs one variant to completion and returns its report.
/// The seed comes from the configuration or, when absent, from the OS.
pub fn run(config: &RunConfig, observer: &mut dyn ObserverSet) -> LayoutResult<LayoutReport> {
    config.validate()?;
    let mut ctx = match config.seed {
        Some(seed) => EvolutionContext::seeded(seed),
        None => EvolutionContext::from_entropy(),
    };
    info!(
        "running {} variant with seed {}",
        config.problem.name(),
        ctx.seed()
    );

    let ga = &config.ga;
    match &config.problem {
        ProblemConfig::Assignment(problem) => {
            let problem = AssignmentProblem::new(problem.clone())?;
            let evolution = evolve(ga, problem.strategies(ga), &mut ctx, observer.assignment())?;
            let genes = &evolution.best.genes;
            let layout = LayoutRecord::Assignment {
                genes: genes.clone(),
                floors: problem.floor_records(genes),
                breakdown: problem.breakdown(genes),
            };
            Ok(report(
                "assignment",
                ga,
                &ctx,
                &evolution,
                problem.is_usable(genes),
                layout,
            ))
        }
        ProblemConfig::Placement(problem) => {
            let problem = PlacementProblem::new(problem.clone())?;
            let evolution = evolve(ga, problem.strategies(ga)?, &mut ctx, observer.placement())?;
            let genes = &evolution.best.genes;
            let layout = LayoutRecord::Placement {
                footprint: problem.config().footprint,
                stores: problem.records(genes),
                breakdown: problem.breakdown(genes),
            };
            Ok(report(
                "placement",
                ga,
                &ctx,
                &evolution,
                problem.is_usable(genes),
                layout,
            ))
        }
        ProblemConfig::Entrance(problem) => {
            let (points, clusters) = load_boundary(problem, &mut ctx)?;
            let problem = EntranceProblem::new(problem.clone(), points, clusters)?;
            let evolution = evolve(ga, problem.strategies(ga), &mut ctx, observer.entrance())?;
            let genes = &evolution.best.genes;
            let reference = problem.reference_entries();
            let layout = LayoutRecord::Entrance {
                entries: problem.records(genes),
                breakdown: problem.breakdown(genes),
                reference: problem.records(&reference),
                lower_bound: problem.lower_bound(),
            };
            Ok(report(
                "entrance",
                ga,
                &ctx,
                &evolution,
                problem.is_usable(genes),
                layout,
            ))
        }
    }
}
