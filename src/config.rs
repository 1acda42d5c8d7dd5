use crate::assignment::AssignmentConfig;
use crate::entrance::EntranceConfig;
use crate::error::{ConfigError, LayoutResult};
use crate::genetic_algorithm::{Crossover, Gene};
use crate::operators::{SinglePointCrossover, TwoPointCrossover};
use crate::placement::PlacementConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    #[default]
    SinglePoint,
    TwoPoint,
}

impl CrossoverKind {
    pub fn strategy<G: Gene>(&self) -> Box<dyn Crossover<G>> {
        match self {
            CrossoverKind::SinglePoint => Box::new(SinglePointCrossover),
            CrossoverKind::TwoPoint => Box::new(TwoPointCrossover),
        }
    }
}

/// Hyperparameters of the generational loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    pub population_size: usize,
    pub generations: usize,
    /// Chance that a neighbouring pair is recombined.
    pub crossover_probability: f64,
    /// Chance that an individual is handed to the mutation operator.
    pub mutation_probability: f64,
    /// Per-gene chance used inside the mutation operator.
    pub gene_mutation_probability: f64,
    pub tournament_size: usize,
    pub crossover: CrossoverKind,
    /// Best individuals copied unchanged into the next generation.
    pub elitism: usize,
    /// Keep the best individual seen in any generation, not only the last one.
    pub track_best_seen: bool,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            crossover_probability: 0.5,
            mutation_probability: 0.2,
            gene_mutation_probability: 0.2,
            tournament_size: 3,
            crossover: CrossoverKind::SinglePoint,
            elitism: 0,
            track_best_seen: false,
        }
    }
}

impl GaParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::NonPositive {
                field: "population_size",
            });
        }
        if self.generations == 0 {
            return Err(ConfigError::NonPositive {
                field: "generations",
            });
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::NonPositive {
                field: "tournament_size",
            });
        }

        for (field, value) in [
            ("crossover_probability", self.crossover_probability),
            ("mutation_probability", self.mutation_probability),
            ("gene_mutation_probability", self.gene_mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }

        if self.elitism >= self.population_size {
            return Err(ConfigError::ElitismTooLarge {
                elitism: self.elitism,
                population_size: self.population_size,
            });
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ProblemConfig {
    Assignment(AssignmentConfig),
    Placement(PlacementConfig),
    Entrance(EntranceConfig),
}

impl ProblemConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProblemConfig::Assignment(_) => "assignment",
            ProblemConfig::Placement(_) => "placement",
            ProblemConfig::Entrance(_) => "entrance",
        }
    }
}

/// Everything one optimizer run needs, as read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Omitted seeds are drawn from the OS and reported with the result.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub ga: GaParams,
    pub problem: ProblemConfig,
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> LayoutResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Checks the parts that do not need external input; entrance boundary data is
    /// validated when it is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ga.validate()?;
        match &self.problem {
            ProblemConfig::Assignment(config) => config.validate(),
            ProblemConfig::Placement(config) => config.validate(),
            ProblemConfig::Entrance(config) => config.validate(),
        }
    }
}
