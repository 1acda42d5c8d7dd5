//! Declarative category rules for the placement variant.
//!
//! A rule table maps a category name to a list of [`AffinityRule`]s. The table is
//! compiled once against the run's category vocabulary and then interpreted uniformly
//! for every individual, so adding a category is a data change only.

use crate::error::ConfigError;
use crate::geometry::Rect;
use crate::placement::StorePlot;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AffinityRule {
    /// Bonus for every member whose center lies inside `zone` (inclusive).
    CentralZone { zone: Rect, bonus: f64 },
    /// Bonus for every unordered member pair whose centers are closer than `radius`.
    CoLocate { radius: f64, bonus: f64 },
    /// Flat penalty, applied once, when the category has more than one member.
    Unique { penalty: f64 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffinityTable {
    pub rules: BTreeMap<String, Vec<AffinityRule>>,
}

impl AffinityTable {
    pub fn with_rule(mut self, category: &str, rule: AffinityRule) -> Self {
        self.rules.entry(category.to_string()).or_default().push(rule);
        self
    }

    /// Resolves category names to vocabulary indices and checks rule parameters.
    pub fn compile(&self, vocabulary: &[String]) -> Result<CompiledAffinity, ConfigError> {
        let mut compiled = Vec::new();

        for (category, rules) in &self.rules {
            let index = vocabulary
                .iter()
                .position(|name| name == category)
                .ok_or_else(|| ConfigError::UnknownCategory(category.clone()))?;

            for rule in rules {
                validate_rule(category, rule)?;
                compiled.push((index, rule.clone()));
            }
        }

        Ok(CompiledAffinity { rules: compiled })
    }
}

fn validate_rule(category: &str, rule: &AffinityRule) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidRule {
        category: category.to_string(),
        reason,
    };

    match rule {
        AffinityRule::CentralZone { zone, bonus } => {
            if zone.width < 0.0 || zone.height < 0.0 {
                return Err(invalid("zone has a negative extent"));
            }
            if !bonus.is_finite() {
                return Err(invalid("bonus must be finite"));
            }
        }
        AffinityRule::CoLocate { radius, bonus } => {
            if !(*radius > 0.0) {
                return Err(invalid("radius must be positive"));
            }
            if !bonus.is_finite() {
                return Err(invalid("bonus must be finite"));
            }
        }
        AffinityRule::Unique { penalty } => {
            if !penalty.is_finite() || *penalty < 0.0 {
                return Err(invalid("penalty must be finite and non-negative"));
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AffinityScore {
    pub bonus: f64,
    pub penalty: f64,
}

#[derive(Clone, Debug, Default)]
pub struct CompiledAffinity {
    rules: Vec<(usize, AffinityRule)>,
}

impl CompiledAffinity {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn score(&self, plots: &[StorePlot]) -> AffinityScore {
        let mut score = AffinityScore::default();

        for (category, rule) in &self.rules {
            let members: Vec<&StorePlot> = plots
                .iter()
                .filter(|plot| plot.category == Some(*category))
                .collect();

            match rule {
                AffinityRule::CentralZone { zone, bonus } => {
                    let inside = members
                        .iter()
                        .filter(|plot| zone.contains(&plot.rect().center()))
                        .count();
                    score.bonus += inside as f64 * bonus;
                }
                AffinityRule::CoLocate { radius, bonus } => {
                    let close_pairs = members
                        .iter()
                        .tuple_combinations()
                        .filter(|(a, b)| a.rect().center().distance(&b.rect().center()) < *radius)
                        .count();
                    score.bonus += close_pairs as f64 * bonus;
                }
                AffinityRule::Unique { penalty } => {
                    if members.len() > 1 {
                        score.penalty += penalty;
                    }
                }
            }
        }

        score
    }
}
