//! Store-type-to-floor assignment under per-floor capacity ceilings.
//!
//! The genome has one slot per potential store instance (`sum(max_count)` slots),
//! each holding a store type or [`Slot::Empty`]. Position `i` belongs to floor
//! `i % floors`, so every individual shares one length and crossover and
//! stride-based floor slicing stay well defined.

use crate::config::GaParams;
use crate::context::EvolutionContext;
use crate::error::ConfigError;
use crate::genetic_algorithm::{
    Direction, Fitness, GeneSampler, Initializer, Mutation, Strategies,
};
use crate::operators::{ResampleMutation, ShuffleIndexesMutation, TournamentSelection};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Empty,
    Store(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreType {
    pub name: String,
    pub capacity: u32,
    pub min_count: usize,
    pub max_count: usize,
    /// 1-based floor number.
    pub preferred_floor: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentWeights {
    pub preferred_bonus: f64,
    pub placed_bonus: f64,
    pub overflow_penalty: f64,
    pub count_penalty: f64,
}

impl Default for AssignmentWeights {
    fn default() -> Self {
        Self {
            preferred_bonus: 5.0,
            placed_bonus: 1.0,
            overflow_penalty: 10.0,
            count_penalty: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotMutation {
    /// Redraw a slot from the initialization domain.
    #[default]
    Resample,
    /// Swap slots between positions, keeping instance counts.
    Shuffle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    pub floor_capacities: Vec<u32>,
    pub store_types: Vec<StoreType>,
    #[serde(default)]
    pub weights: AssignmentWeights,
    #[serde(default)]
    pub mutation: SlotMutation,
}

impl AssignmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.floor_capacities.is_empty() {
            return Err(ConfigError::EmptyDomain("floors"));
        }
        if self.store_types.is_empty() {
            return Err(ConfigError::EmptyDomain("store types"));
        }

        let floors = self.floor_capacities.len();
        for store in &self.store_types {
            if store.min_count > store.max_count {
                return Err(ConfigError::InfeasibleBound {
                    store_type: store.name.clone(),
                    min: store.min_count,
                    max: store.max_count,
                });
            }
            if store.preferred_floor == 0 || store.preferred_floor > floors {
                return Err(ConfigError::UnknownFloor {
                    store_type: store.name.clone(),
                    floor: store.preferred_floor,
                    floors,
                });
            }
        }

        if self.genome_length() == 0 {
            return Err(ConfigError::EmptyDomain("assignment genome"));
        }

        Ok(())
    }

    pub fn genome_length(&self) -> usize {
        self.store_types.iter().map(|store| store.max_count).sum()
    }
}

// Draws per-type counts inside their bounds, pads with empty slots, shuffles
#[derive(Debug)]
pub struct AssignmentInitializer {
    types: Arc<[StoreType]>,
    length: usize,
}

impl Initializer<Slot> for AssignmentInitializer {
    fn generate(&self, ctx: &mut EvolutionContext) -> Vec<Slot> {
        let rng = ctx.rng();
        let mut genes = Vec::with_capacity(self.length);

        for (index, store) in self.types.iter().enumerate() {
            let count = rng.gen_range(store.min_count..=store.max_count);
            genes.extend(std::iter::repeat(Slot::Store(index)).take(count));
        }
        genes.resize(self.length, Slot::Empty);
        genes.shuffle(rng);

        genes
    }
}

// Uniform over every store type plus the empty slot
#[derive(Debug, Clone, Copy)]
pub struct SlotSampler {
    pub types: usize,
}

impl GeneSampler<Slot> for SlotSampler {
    fn sample(&self, ctx: &mut EvolutionContext) -> Slot {
        let draw = ctx.index(self.types + 1);
        if draw == self.types {
            Slot::Empty
        } else {
            Slot::Store(draw)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AssignmentBreakdown {
    pub preferred_placements: usize,
    pub other_placements: usize,
    pub overflows: usize,
    pub shortfall: usize,
    pub excess: usize,
    pub floor_usage: Vec<u32>,
    pub counts: Vec<usize>,
    pub total: f64,
}

impl AssignmentBreakdown {
    pub fn is_feasible(&self) -> bool {
        self.overflows == 0 && self.shortfall == 0 && self.excess == 0
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentFitness {
    types: Arc<[StoreType]>,
    floor_capacities: Arc<[u32]>,
    weights: AssignmentWeights,
}

impl AssignmentFitness {
    pub fn breakdown(&self, genes: &[Slot]) -> AssignmentBreakdown {
        let floors = self.floor_capacities.len();
        let mut breakdown = AssignmentBreakdown {
            floor_usage: vec![0; floors],
            counts: vec![0; self.types.len()],
            ..Default::default()
        };
        let mut total = 0.0;

        for floor in 0..floors {
            for slot in genes.iter().skip(floor).step_by(floors) {
                let Slot::Store(index) = *slot else {
                    continue;
                };
                let store = &self.types[index];
                breakdown.counts[index] += 1;

                let usage = breakdown.floor_usage[floor]
                    .checked_add(store.capacity)
                    .filter(|&usage| usage <= self.floor_capacities[floor]);
                if let Some(usage) = usage {
                    breakdown.floor_usage[floor] = usage;
                    if store.preferred_floor == floor + 1 {
                        breakdown.preferred_placements += 1;
                        total += self.weights.preferred_bonus;
                    } else {
                        breakdown.other_placements += 1;
                        total += self.weights.placed_bonus;
                    }
                } else {
                    breakdown.overflows += 1;
                    total -= self.weights.overflow_penalty;
                }
            }
        }

        for (store, &count) in self.types.iter().zip(&breakdown.counts) {
            if count < store.min_count {
                let missing = store.min_count - count;
                breakdown.shortfall += missing;
                total -= self.weights.count_penalty * missing as f64;
            } else if count > store.max_count {
                let extra = count - store.max_count;
                breakdown.excess += extra;
                total -= self.weights.count_penalty * extra as f64;
            }
        }

        breakdown.total = total;
        breakdown
    }
}

impl Fitness<Slot> for AssignmentFitness {
    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    fn evaluate(&self, genes: &[Slot]) -> f64 {
        self.breakdown(genes).total
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FloorRecord {
    /// 1-based.
    pub floor: usize,
    pub capacity: u32,
    pub usage: u32,
    pub stores: Vec<String>,
}

/// A validated assignment run.
#[derive(Debug, Clone)]
pub struct AssignmentProblem {
    config: AssignmentConfig,
    fitness: AssignmentFitness,
}

impl AssignmentProblem {
    pub fn new(config: AssignmentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fitness = AssignmentFitness {
            types: config.store_types.clone().into(),
            floor_capacities: config.floor_capacities.clone().into(),
            weights: config.weights,
        };
        Ok(Self { config, fitness })
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    pub fn genome_length(&self) -> usize {
        self.config.genome_length()
    }

    pub fn initializer(&self) -> AssignmentInitializer {
        AssignmentInitializer {
            types: self.fitness.types.clone(),
            length: self.genome_length(),
        }
    }

    pub fn mutation(&self, indpb: f64) -> Box<dyn Mutation<Slot>> {
        match self.config.mutation {
            SlotMutation::Resample => Box::new(ResampleMutation {
                sampler: SlotSampler {
                    types: self.config.store_types.len(),
                },
                indpb,
            }),
            SlotMutation::Shuffle => Box::new(ShuffleIndexesMutation { indpb }),
        }
    }

    pub fn strategies(&self, ga: &GaParams) -> Strategies<Slot> {
        Strategies {
            initializer: Box::new(self.initializer()),
            fitness: Box::new(self.fitness.clone()),
            crossover: ga.crossover.strategy(),
            mutation: self.mutation(ga.gene_mutation_probability),
            selection: Box::new(TournamentSelection {
                size: ga.tournament_size,
            }),
        }
    }

    pub fn breakdown(&self, genes: &[Slot]) -> AssignmentBreakdown {
        self.fitness.breakdown(genes)
    }

    pub fn is_usable(&self, genes: &[Slot]) -> bool {
        genes.iter().any(|slot| *slot != Slot::Empty) && self.breakdown(genes).is_feasible()
    }

    /// Store names per floor, in genome order, mirroring the floor pass of the fitness.
    pub fn floor_records(&self, genes: &[Slot]) -> Vec<FloorRecord> {
        let floors = self.config.floor_capacities.len();
        let breakdown = self.breakdown(genes);

        (0..floors)
            .map(|floor| FloorRecord {
                floor: floor + 1,
                capacity: self.config.floor_capacities[floor],
                usage: breakdown.floor_usage[floor],
                stores: genes
                    .iter()
                    .skip(floor)
                    .step_by(floors)
                    .filter_map(|slot| match slot {
                        Slot::Store(index) => Some(self.config.store_types[*index].name.clone()),
                        Slot::Empty => None,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str, capacity: u32, min: usize, max: usize, floor: usize) -> StoreType {
        StoreType {
            name: name.to_string(),
            capacity,
            min_count: min,
            max_count: max,
            preferred_floor: floor,
        }
    }

    fn problem() -> AssignmentProblem {
        AssignmentProblem::new(AssignmentConfig {
            floor_capacities: vec![30, 30, 30],
            store_types: vec![
                store("cinema", 15, 0, 1, 3),
                store("fashion", 2, 3, 6, 2),
                store("food", 5, 2, 4, 1),
            ],
            weights: AssignmentWeights::default(),
            mutation: SlotMutation::Resample,
        })
        .unwrap()
    }

    #[test]
    fn genomes_share_one_length_and_respect_bounds() {
        let problem = problem();
        let init = problem.initializer();
        let mut ctx = EvolutionContext::seeded(4);

        for _ in 0..100 {
            let genes = init.generate(&mut ctx);
            assert_eq!(genes.len(), 11);
            let breakdown = problem.breakdown(&genes);
            assert!(breakdown.counts[0] <= 1);
            assert!((3..=6).contains(&breakdown.counts[1]));
            assert!((2..=4).contains(&breakdown.counts[2]));
            assert_eq!(breakdown.shortfall + breakdown.excess, 0);
        }
    }

    #[test]
    fn preferred_floor_earns_the_larger_bonus() {
        let problem = problem();
        // positions 0,1,2 are floors 1,2,3
        let on_third = [Slot::Empty, Slot::Empty, Slot::Store(0)];
        let on_first = [Slot::Store(0), Slot::Empty, Slot::Empty];

        let third = problem.breakdown(&on_third);
        let first = problem.breakdown(&on_first);
        assert_eq!(third.preferred_placements, 1);
        assert_eq!(first.other_placements, 1);
        assert_eq!(third.total - first.total, 4.0);
    }

    #[test]
    fn overflow_is_penalized_without_using_capacity() {
        let problem = problem();
        // three cinemas on floor 1 (stride 3): 15 + 15 fits, the third overflows
        let genes = [
            Slot::Store(0),
            Slot::Empty,
            Slot::Empty,
            Slot::Store(0),
            Slot::Empty,
            Slot::Empty,
            Slot::Store(0),
        ];
        let breakdown = problem.breakdown(&genes);
        assert_eq!(breakdown.overflows, 1);
        assert_eq!(breakdown.floor_usage, vec![30, 0, 0]);
        assert_eq!(breakdown.excess, 2);
        assert!(!breakdown.is_feasible());
        assert!(!problem.is_usable(&genes));
    }

    #[test]
    fn capacities_near_the_integer_limit_overflow_cleanly() {
        let problem = AssignmentProblem::new(AssignmentConfig {
            floor_capacities: vec![u32::MAX],
            store_types: vec![store("anchor", u32::MAX, 0, 2, 1)],
            weights: AssignmentWeights::default(),
            mutation: SlotMutation::Resample,
        })
        .unwrap();

        let breakdown = problem.breakdown(&[Slot::Store(0), Slot::Store(0)]);
        assert_eq!(breakdown.floor_usage, vec![u32::MAX]);
        assert_eq!(breakdown.preferred_placements, 1);
        assert_eq!(breakdown.overflows, 1);
    }

    #[test]
    fn shortfall_scales_with_missing_instances() {
        let problem = problem();
        let breakdown = problem.breakdown(&[Slot::Empty; 11]);
        // fashion needs 3, food needs 2
        assert_eq!(breakdown.shortfall, 5);
        assert_eq!(breakdown.total, -50.0);
        assert!(!problem.is_usable(&[Slot::Empty; 11]));
    }

    #[test]
    fn floor_records_follow_the_stride() {
        let problem = problem();
        let genes = [Slot::Store(2), Slot::Store(1), Slot::Store(0), Slot::Store(1)];
        let records = problem.floor_records(&genes);
        assert_eq!(records[0].stores, vec!["food", "fashion"]);
        assert_eq!(records[1].stores, vec!["fashion"]);
        assert_eq!(records[2].stores, vec!["cinema"]);
        assert_eq!(records[2].usage, 15);
    }

    #[test]
    fn infeasible_bound_is_rejected() {
        let config = AssignmentConfig {
            floor_capacities: vec![30],
            store_types: vec![store("books", 4, 3, 2, 1)],
            weights: AssignmentWeights::default(),
            mutation: SlotMutation::Resample,
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InfeasibleBound {
                store_type: "books".into(),
                min: 3,
                max: 2,
            })
        );
    }

    #[test]
    fn unknown_preferred_floor_is_rejected() {
        let config = AssignmentConfig {
            floor_capacities: vec![30, 30],
            store_types: vec![store("cinema", 15, 0, 1, 3)],
            weights: AssignmentWeights::default(),
            mutation: SlotMutation::Shuffle,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownFloor { floor: 3, .. })
        ));
    }

    #[test]
    fn slot_sampler_covers_empty() {
        let sampler = SlotSampler { types: 2 };
        let mut ctx = EvolutionContext::seeded(8);
        let draws: Vec<Slot> = (0..200).map(|_| sampler.sample(&mut ctx)).collect();
        assert!(draws.contains(&Slot::Empty));
        assert!(draws.contains(&Slot::Store(0)));
        assert!(draws.contains(&Slot::Store(1)));
        assert!(!draws.contains(&Slot::Store(2)));
    }
}
