use crate::config::GaParams;
use crate::context::EvolutionContext;
use crate::error::ConfigError;
use crate::genetic_algorithm::{best_index, Chromosome, Direction, Gene, Strategies};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
}

impl GenerationStats {
    pub fn from_population<G>(
        generation: usize,
        population: &[Chromosome<G>],
        direction: Direction,
    ) -> Self {
        let scores: Vec<f64> = population.iter().map(|c| c.score(direction)).collect();
        let best = scores
            .iter()
            .copied()
            .fold(direction.worst(), |acc, s| if direction.is_better(s, acc) { s } else { acc });
        let worst = scores
            .iter()
            .copied()
            .fold(best, |acc, s| if direction.is_better(acc, s) { s } else { acc });
        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        Self {
            generation,
            best,
            mean,
            worst,
        }
    }
}

/// Watches the run after every generation. Termination is owned by the optimizer.
pub trait Observer<G> {
    fn observe(&mut self, stats: &GenerationStats, population: &[Chromosome<G>]);
}

/// Logs one line per generation, every `every` generations.
#[derive(Debug, Clone)]
pub struct ProgressLogger {
    pub every: usize,
}

impl Default for ProgressLogger {
    fn default() -> Self {
        Self { every: 1 }
    }
}

impl<G> Observer<G> for ProgressLogger {
    fn observe(&mut self, stats: &GenerationStats, _population: &[Chromosome<G>]) {
        if self.every == 0 || stats.generation % self.every != 0 {
            return;
        }
        info!(
            "{} - best: {:.4}, mean: {:.4}, worst: {:.4}",
            format!("Generation {:3}", stats.generation).bold().red(),
            stats.best,
            stats.mean,
            stats.worst,
        );
    }
}

/// Discards everything; for callers that only want the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl<G> Observer<G> for Silent {
    fn observe(&mut self, _stats: &GenerationStats, _population: &[Chromosome<G>]) {}
}

/// Outcome of a run: the final population and its best member.
#[derive(Debug, Clone)]
pub struct Evolution<G> {
    pub population: Vec<Chromosome<G>>,
    pub best: Chromosome<G>,
    /// Only filled when `track_best_seen` is on.
    pub best_seen: Option<Chromosome<G>>,
    pub history: Vec<GenerationStats>,
    pub direction: Direction,
}

#[derive(Debug)]
pub struct GeneticOptimizer<G> {
    params: GaParams,
    strategies: Strategies<G>,
}

impl<G: Gene> GeneticOptimizer<G> {
    pub fn new(params: GaParams, strategies: Strategies<G>) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params, strategies })
    }

    pub fn params(&self) -> &GaParams {
        &self.params
    }

    pub fn direction(&self) -> Direction {
        self.strategies.fitness.direction()
    }

    pub fn generate(&self, ctx: &mut EvolutionContext) -> Vec<Chromosome<G>> {
        (0..self.params.population_size)
            .map(|_| Chromosome::new(self.strategies.initializer.generate(ctx)))
            .collect()
    }

    /// Scores every chromosome that has no fitness yet.
    pub fn evaluate(&self, population: &mut [Chromosome<G>]) {
        let fitness = &self.strategies.fitness;
        population
            .par_iter_mut()
            .filter(|chromosome| !chromosome.is_evaluated())
            .for_each(|chromosome| {
                chromosome.fitness = Some(fitness.evaluate(&chromosome.genes));
            });
    }

    /// Clones the population and applies crossover to neighbouring pairs, then mutation.
    pub fn vary(
        &self,
        population: &[Chromosome<G>],
        ctx: &mut EvolutionContext,
    ) -> Vec<Chromosome<G>> {
        let mut offspring = population.to_vec();

        for pair in offspring.chunks_exact_mut(2) {
            if ctx.chance(self.params.crossover_probability) {
                let (a, b) = self
                    .strategies
                    .crossover
                    .crossover(&pair[0].genes, &pair[1].genes, ctx);
                pair[0] = Chromosome::new(a);
                pair[1] = Chromosome::new(b);
            }
        }

        for child in offspring.iter_mut() {
            if ctx.chance(self.params.mutation_probability) {
                self.strategies.mutation.mutate(&mut child.genes, ctx);
                child.fitness = None;
            }
        }

        offspring
    }

    /// Best `elitism` chromosomes of an evaluated population, best first.
    pub fn elitism(&self, population: &[Chromosome<G>]) -> Vec<Chromosome<G>> {
        let direction = self.direction();
        let mut ranked: Vec<&Chromosome<G>> = population.iter().collect();
        // stable sort keeps earlier chromosomes ahead on ties
        ranked.sort_by(|a, b| direction.compare(b.score(direction), a.score(direction)));
        ranked
            .into_iter()
            .take(self.params.elitism)
            .cloned()
            .collect()
    }

    pub fn select(
        &self,
        previous: &[Chromosome<G>],
        offspring: &[Chromosome<G>],
        ctx: &mut EvolutionContext,
    ) -> Vec<Chromosome<G>> {
        let mut next = self.elitism(previous);
        let remaining = self.params.population_size - next.len();
        next.extend(
            self.strategies
                .selection
                .select(offspring, remaining, self.direction(), ctx),
        );
        next
    }

    pub fn optimize(
        &self,
        ctx: &mut EvolutionContext,
        observer: &mut dyn Observer<G>,
    ) -> Evolution<G> {
        let direction = self.direction();
        let mut population = self.generate(ctx);
        self.evaluate(&mut population);
        debug!(
            "initial population of {} evaluated (seed {})",
            population.len(),
            ctx.seed()
        );

        let mut best_seen = self
            .params
            .track_best_seen
            .then(|| best_index(&population, direction).map(|i| population[i].clone()))
            .flatten();
        let mut history = Vec::with_capacity(self.params.generations);

        for generation in 1..=self.params.generations {
            let mut offspring = self.vary(&population, ctx);
            self.evaluate(&mut offspring);
            population = self.select(&population, &offspring, ctx);

            let stats = GenerationStats::from_population(generation, &population, direction);
            observer.observe(&stats, &population);
            history.push(stats);

            if let Some(seen) = best_seen.as_mut() {
                if let Some(i) = best_index(&population, direction) {
                    if direction.is_better(population[i].score(direction), seen.score(direction)) {
                        *seen = population[i].clone();
                    }
                }
            }
        }

        // population_size > 0 is validated, so the final population is never empty
        let best = best_index(&population, direction)
            .map(|i| population[i].clone())
            .unwrap_or_else(|| Chromosome::new(Vec::new()));

        Evolution {
            population,
            best,
            best_seen,
            history,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetic_algorithm::{Fitness, GeneSampler};
    use crate::operators::{
        RepeatInitializer, ResampleMutation, SinglePointCrossover, TournamentSelection,
    };

    #[derive(Debug, Clone, Copy)]
    struct Bits;

    impl GeneSampler<bool> for Bits {
        fn sample(&self, ctx: &mut EvolutionContext) -> bool {
            ctx.chance(0.5)
        }
    }

    // One-max: count the set bits
    #[derive(Debug)]
    struct OneMax;

    impl Fitness<bool> for OneMax {
        fn direction(&self) -> Direction {
            Direction::Maximize
        }

        fn evaluate(&self, genes: &[bool]) -> f64 {
            genes.iter().filter(|&&b| b).count() as f64
        }
    }

    fn optimizer(params: GaParams) -> GeneticOptimizer<bool> {
        let strategies = Strategies {
            initializer: Box::new(RepeatInitializer {
                sampler: Bits,
                length: 20,
            }),
            fitness: Box::new(OneMax),
            crossover: Box::new(SinglePointCrossover),
            mutation: Box::new(ResampleMutation {
                sampler: Bits,
                indpb: 0.05,
            }),
            selection: Box::new(TournamentSelection { size: 3 }),
        };
        GeneticOptimizer::new(params, strategies).unwrap()
    }

    struct Recorder {
        sizes: Vec<usize>,
        all_evaluated: bool,
    }

    impl Observer<bool> for Recorder {
        fn observe(&mut self, _stats: &GenerationStats, population: &[Chromosome<bool>]) {
            self.sizes.push(population.len());
            self.all_evaluated &= population.iter().all(Chromosome::is_evaluated);
        }
    }

    #[test]
    fn population_size_is_preserved_every_generation() {
        let params = GaParams {
            population_size: 11,
            generations: 15,
            elitism: 2,
            ..Default::default()
        };
        let mut recorder = Recorder {
            sizes: Vec::new(),
            all_evaluated: true,
        };
        let evolution = optimizer(params).optimize(&mut EvolutionContext::seeded(3), &mut recorder);

        assert_eq!(recorder.sizes, vec![11; 15]);
        assert!(recorder.all_evaluated);
        assert_eq!(evolution.history.len(), 15);
        assert_eq!(evolution.history.last().unwrap().generation, 15);
    }

    #[test]
    fn same_seed_same_run() {
        let params = GaParams {
            population_size: 20,
            generations: 10,
            ..Default::default()
        };
        let a = optimizer(params.clone()).optimize(&mut EvolutionContext::seeded(99), &mut Silent);
        let b = optimizer(params).optimize(&mut EvolutionContext::seeded(99), &mut Silent);

        assert_eq!(a.best, b.best);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn elitism_never_loses_the_best() {
        let params = GaParams {
            population_size: 10,
            generations: 30,
            elitism: 1,
            mutation_probability: 1.0,
            ..Default::default()
        };
        let evolution = optimizer(params).optimize(&mut EvolutionContext::seeded(8), &mut Silent);
        let bests: Vec<f64> = evolution.history.iter().map(|s| s.best).collect();
        assert!(bests.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn best_seen_is_at_least_the_final_best() {
        let params = GaParams {
            population_size: 8,
            generations: 12,
            track_best_seen: true,
            ..Default::default()
        };
        let evolution = optimizer(params).optimize(&mut EvolutionContext::seeded(17), &mut Silent);
        let seen = evolution.best_seen.expect("tracking enabled");
        assert!(seen.score(Direction::Maximize) >= evolution.best.score(Direction::Maximize));
    }

    #[test]
    fn stats_follow_direction() {
        let population = vec![
            Chromosome {
                genes: vec![true],
                fitness: Some(1.0),
            },
            Chromosome {
                genes: vec![false],
                fitness: Some(3.0),
            },
        ];
        let max = GenerationStats::from_population(1, &population, Direction::Maximize);
        assert_eq!((max.best, max.worst, max.mean), (3.0, 1.0, 2.0));
        let min = GenerationStats::from_population(1, &population, Direction::Minimize);
        assert_eq!((min.best, min.worst), (1.0, 3.0));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = GaParams {
            population_size: 0,
            ..Default::default()
        };
        let strategies = optimizer(GaParams::default()).strategies;
        assert!(GeneticOptimizer::new(params, strategies).is_err());
    }
}
