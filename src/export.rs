//! Result reports: a JSON document for the best layout, a CSV for the run history.

use crate::assignment::{AssignmentBreakdown, FloorRecord, Slot};
use crate::entrance::{EntranceBreakdown, EntryRecord};
use crate::error::LayoutResult;
use crate::genetic_algorithm::Direction;
use crate::genetic_optimizer::GenerationStats;
use crate::placement::{Footprint, PlacementBreakdown, StoreRecord};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// The best individual of one variant, decoded into domain records.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum LayoutRecord {
    Assignment {
        genes: Vec<Slot>,
        floors: Vec<FloorRecord>,
        breakdown: AssignmentBreakdown,
    },
    Placement {
        footprint: Footprint,
        stores: Vec<StoreRecord>,
        breakdown: PlacementBreakdown,
    },
    Entrance {
        entries: Vec<EntryRecord>,
        breakdown: EntranceBreakdown,
        /// Nearest member point per cluster, for comparison with the GA choice.
        reference: Vec<EntryRecord>,
        lower_bound: f64,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct LayoutReport {
    pub variant: &'static str,
    pub seed: u64,
    pub direction: Direction,
    pub fitness: f64,
    pub generations: usize,
    pub population_size: usize,
    /// False when the best layout is empty or breaks a hard rule.
    pub usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_seen_fitness: Option<f64>,
    pub layout: LayoutRecord,
    #[serde(skip)]
    pub history: Vec<GenerationStats>,
}

impl LayoutReport {
    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> LayoutResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_history_csv<P: AsRef<Path>>(&self, path: P) -> LayoutResult<()> {
        write_history(File::create(path)?, &self.history)
    }
}

/// One row per generation: `generation,best,mean,worst`.
pub fn write_history<W: Write>(sink: W, history: &[GenerationStats]) -> LayoutResult<()> {
    let mut writer = Writer::from_writer(sink);
    for stats in history {
        writer.serialize(stats)?;
    }
    writer.flush()?;
    Ok(())
}
