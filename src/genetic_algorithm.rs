use crate::context::EvolutionContext;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;

// Anything that can sit in a genome
pub trait Gene: Send + Sync + Debug + Clone {}

impl<T: Send + Sync + Debug + Clone> Gene for T {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Orders two scores so that `Ordering::Greater` means `a` is the better one.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Direction::Maximize => ord,
            Direction::Minimize => ord.reverse(),
        }
    }

    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Greater
    }

    pub fn worst(self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }
}

// A single candidate solution together with its (lazily computed) fitness
#[derive(Clone, Debug, PartialEq)]
pub struct Chromosome<G> {
    pub genes: Vec<G>,
    pub fitness: Option<f64>,
}

impl<G> Chromosome<G> {
    pub fn new(genes: Vec<G>) -> Self {
        Self {
            genes,
            fitness: None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Unevaluated chromosomes rank below everything else.
    pub fn score(&self, direction: Direction) -> f64 {
        self.fitness.unwrap_or_else(|| direction.worst())
    }
}

/// Index of the best chromosome; ties go to the earliest one.
pub fn best_index<G>(population: &[Chromosome<G>], direction: Direction) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, chromosome) in population.iter().enumerate() {
        let better = match best {
            None => true,
            Some(b) => direction.is_better(
                chromosome.score(direction),
                population[b].score(direction),
            ),
        };
        if better {
            best = Some(i);
        }
    }
    best
}

// Draws one random genome for the variant
pub trait Initializer<G>: Send + Sync + Debug {
    fn generate(&self, ctx: &mut EvolutionContext) -> Vec<G>;
}

// Scores a genome; must be a pure function of the genome and immutable run data
pub trait Fitness<G>: Send + Sync + Debug {
    fn direction(&self) -> Direction;
    fn evaluate(&self, genes: &[G]) -> f64;
}

// Recombines two parents into two children of the same length
pub trait Crossover<G>: Send + Sync + Debug {
    fn crossover(&self, a: &[G], b: &[G], ctx: &mut EvolutionContext) -> (Vec<G>, Vec<G>);
}

// Perturbs a genome in place, keeping every gene inside its domain
pub trait Mutation<G>: Send + Sync + Debug {
    fn mutate(&self, genes: &mut [G], ctx: &mut EvolutionContext);
}

// Picks `count` survivors out of an evaluated pool
pub trait Selection<G>: Send + Sync + Debug {
    fn select(
        &self,
        pool: &[Chromosome<G>],
        count: usize,
        direction: Direction,
        ctx: &mut EvolutionContext,
    ) -> Vec<Chromosome<G>>;
}

// Draws a single valid gene; shared by initializers and resampling mutations
pub trait GeneSampler<G>: Send + Sync + Debug {
    fn sample(&self, ctx: &mut EvolutionContext) -> G;
}

/// The strategy objects one variant is composed of.
#[derive(Debug)]
pub struct Strategies<G> {
    pub initializer: Box<dyn Initializer<G>>,
    pub fitness: Box<dyn Fitness<G>>,
    pub crossover: Box<dyn Crossover<G>>,
    pub mutation: Box<dyn Mutation<G>>,
    pub selection: Box<dyn Selection<G>>,
}
