use crate::affinity::{AffinityRule, AffinityTable};
use crate::assignment::{AssignmentConfig, AssignmentWeights, SlotMutation, StoreType};
use crate::clustering::KMeansParams;
use crate::config::{CrossoverKind, GaParams, ProblemConfig, RunConfig};
use crate::entrance::{CentroidBinding, EntranceConfig};
use crate::geometry::Rect;
use crate::placement::{Footprint, GaussianParams, PlacementConfig, PlacementWeights, SizeRange};
use crate::preprocess::GridPoint;
use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoVariant {
    Assignment,
    Placement,
    Entrance,
}

fn store(
    name: &str,
    capacity: u32,
    min_count: usize,
    max_count: usize,
    preferred_floor: usize,
) -> StoreType {
    StoreType {
        name: name.to_string(),
        capacity,
        min_count,
        max_count,
        preferred_floor,
    }
}

// A three-storey mall with ten store types
pub fn mall_store_types() -> Vec<StoreType> {
    vec![
        store("cinema", 15, 0, 1, 3),
        store("clothing", 2, 3, 30, 2),
        store("food", 5, 2, 20, 1),
        store("sundries", 3, 2, 10, 1),
        store("books", 4, 0, 2, 1),
        store("sporting goods", 6, 0, 1, 2),
        store("electronics", 10, 0, 2, 3),
        store("beauty", 4, 1, 3, 2),
        store("kids area", 8, 1, 2, 1),
        store("car supplies", 7, 0, 1, 3),
    ]
}

pub fn mall_floor_capacities() -> Vec<u32> {
    vec![30, 30, 30]
}

pub fn assignment_config() -> AssignmentConfig {
    AssignmentConfig {
        floor_capacities: mall_floor_capacities(),
        store_types: mall_store_types(),
        weights: AssignmentWeights::default(),
        mutation: SlotMutation::Shuffle,
    }
}

pub fn placement_categories() -> Vec<String> {
    ["cinema", "clothing", "food", "kids area", "electronics"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn placement_affinity() -> AffinityTable {
    AffinityTable::default()
        .with_rule("cinema", AffinityRule::Unique { penalty: 50.0 })
        .with_rule("electronics", AffinityRule::Unique { penalty: 20.0 })
        .with_rule(
            "food",
            AffinityRule::CoLocate {
                radius: 12.0,
                bonus: 10.0,
            },
        )
        .with_rule(
            "clothing",
            AffinityRule::CoLocate {
                radius: 12.0,
                bonus: 5.0,
            },
        )
        .with_rule(
            "kids area",
            AffinityRule::CentralZone {
                zone: Rect::new(15.0, 15.0, 20.0, 20.0),
                bonus: 20.0,
            },
        )
}

pub fn placement_config() -> PlacementConfig {
    PlacementConfig {
        footprint: Footprint {
            width: 50,
            height: 50,
        },
        slots: 10,
        size_range: SizeRange::default(),
        categories: placement_categories(),
        affinity: placement_affinity(),
        weights: PlacementWeights::default(),
        mutation: GaussianParams::default(),
    }
}

/// Integer samples along the outline of an L-shaped floor, one per unit step,
/// in the order a contour tracer would report them.
pub fn boundary_outline() -> Vec<GridPoint> {
    let corners: [(i32, i32); 6] = [(0, 0), (120, 0), (120, 50), (80, 50), (80, 80), (0, 80)];
    let mut points = Vec::new();

    for (i, &(x0, y0)) in corners.iter().enumerate() {
        let (x1, y1) = corners[(i + 1) % corners.len()];
        let (dx, dy) = ((x1 - x0).signum(), (y1 - y0).signum());
        let (mut x, mut y) = (x0, y0);
        while (x, y) != (x1, y1) {
            points.push(GridPoint::new(x, y));
            x += dx;
            y += dy;
        }
    }

    points
}

pub fn entrance_config() -> EntranceConfig {
    EntranceConfig {
        entries: 10,
        binding: CentroidBinding::Position,
        points: None,
        kmeans: KMeansParams::default(),
    }
}

pub fn run_config(variant: DemoVariant) -> RunConfig {
    match variant {
        DemoVariant::Assignment => RunConfig {
            seed: None,
            ga: GaParams {
                population_size: 50,
                generations: 100,
                crossover: CrossoverKind::TwoPoint,
                ..Default::default()
            },
            problem: ProblemConfig::Assignment(assignment_config()),
        },
        DemoVariant::Placement => RunConfig {
            seed: None,
            ga: GaParams {
                population_size: 300,
                generations: 60,
                ..Default::default()
            },
            problem: ProblemConfig::Placement(placement_config()),
        },
        DemoVariant::Entrance => RunConfig {
            seed: None,
            ga: GaParams {
                population_size: 50,
                generations: 100,
                crossover: CrossoverKind::TwoPoint,
                ..Default::default()
            },
            problem: ProblemConfig::Entrance(entrance_config()),
        },
    }
}
