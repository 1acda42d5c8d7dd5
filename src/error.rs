use thiserror::Error;

/// Problems detected while validating a run before the first generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("store type '{store_type}' has an infeasible count bound: min {min} > max {max}")]
    InfeasibleBound {
        store_type: String,
        min: usize,
        max: usize,
    },

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("{field} must lie in [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f64 },

    #[error("elitism ({elitism}) must be smaller than the population size ({population_size})")]
    ElitismTooLarge {
        elitism: usize,
        population_size: usize,
    },

    #[error("empty spatial or genome domain: {0}")]
    EmptyDomain(&'static str),

    #[error("store size range [{min}, {max}] is invalid or does not fit a {width}x{height} footprint")]
    SizeRange {
        min: u32,
        max: u32,
        width: u32,
        height: u32,
    },

    #[error("store type '{store_type}' prefers floor {floor}, but only {floors} floors exist")]
    UnknownFloor {
        store_type: String,
        floor: usize,
        floors: usize,
    },

    #[error("affinity rule names unknown category '{0}'")]
    UnknownCategory(String),

    #[error("invalid affinity rule for '{category}': {reason}")]
    InvalidRule {
        category: String,
        reason: &'static str,
    },

    #[error(
        "overlap penalty {penalty} does not dominate the largest pair reward {pair_reward:.2}"
    )]
    OverlapNotDominant { penalty: f64, pair_reward: f64 },

    #[error("mutation sigma must be finite and non-negative, got {0}")]
    InvalidSigma(f64),

    #[error("{labels} cluster labels supplied for {points} boundary points")]
    LabelMismatch { labels: usize, points: usize },

    #[error("cluster {0} has no member points")]
    EmptyCluster(usize),

    #[error("{entries} entries requested but only {clusters} clusters are available")]
    TooFewClusters { entries: usize, clusters: usize },

    #[error("cannot form {clusters} clusters from {points} boundary points")]
    TooManyClusters { clusters: usize, points: usize },
}

/// Top-level error for loading inputs, running and exporting.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LayoutResult<T> = Result<T, LayoutError>;
