//! Genetic-algorithm search for retail floor layouts: store types to floors,
//! store rectangles on a floor, and entrance points on a floor boundary.

pub mod affinity;
pub mod assignment;
pub mod clustering;
pub mod config;
pub mod context;
pub mod demo_data;
pub mod entrance;
pub mod error;
pub mod export;
pub mod genetic_algorithm;
pub mod genetic_optimizer;
pub mod geometry;
pub mod operators;
pub mod placement;
pub mod preprocess;
pub mod runner;

pub use config::{GaParams, ProblemConfig, RunConfig};
pub use context::EvolutionContext;
pub use error::{ConfigError, LayoutError, LayoutResult};
pub use export::{LayoutRecord, LayoutReport};
pub use genetic_optimizer::{GeneticOptimizer, ProgressLogger, Silent};
pub use runner::run;
