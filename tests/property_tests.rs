use floorplan_ga::affinity::{AffinityRule, AffinityTable};
use floorplan_ga::context::EvolutionContext;
use floorplan_ga::genetic_algorithm::Mutation;
use floorplan_ga::placement::{
    count_deadends, overlapping_pairs, Footprint, PlacementConfig, PlacementProblem, StorePlot,
};
use proptest::prelude::*;

// --- STRATEGIES ---

prop_compose! {
    fn arb_plot()(
        width in 5.0..=10.0f64,
        height in 5.0..=10.0f64,
        fx in 0.0..=1.0f64,
        fy in 0.0..=1.0f64,
        category in proptest::option::of(0usize..3)
    ) -> StorePlot {
        StorePlot {
            x: fx * (50.0 - width),
            y: fy * (50.0 - height),
            width,
            height,
            category,
        }
    }
}

prop_compose! {
    fn arb_degenerate_plot()(
        plot in arb_plot(),
        flatten_width in any::<bool>(),
        flatten_height in any::<bool>()
    ) -> StorePlot {
        StorePlot {
            width: if flatten_width || !flatten_height { 0.0 } else { plot.width },
            height: if flatten_height { 0.0 } else { plot.height },
            ..plot
        }
    }
}

fn problem() -> PlacementProblem {
    PlacementProblem::new(PlacementConfig {
        footprint: Footprint {
            width: 50,
            height: 50,
        },
        slots: 6,
        size_range: Default::default(),
        categories: vec!["a".into(), "b".into(), "c".into()],
        affinity: Default::default(),
        weights: Default::default(),
        mutation: Default::default(),
    })
    .unwrap()
}

proptest! {
    #[test]
    fn overlap_is_symmetric(a in arb_plot(), b in arb_plot()) {
        prop_assert_eq!(a.rect().intersects(&b.rect()), b.rect().intersects(&a.rect()));
        prop_assert_eq!(overlapping_pairs(&[a, b]), overlapping_pairs(&[b, a]));
    }

    #[test]
    fn zero_extent_plots_never_overlap(a in arb_degenerate_plot(), b in arb_plot()) {
        prop_assert!(!a.rect().intersects(&b.rect()));
        prop_assert!(!b.rect().intersects(&a.rect()));
        prop_assert!(!a.rect().intersects(&a.rect()));
        prop_assert_eq!(overlapping_pairs(&[a, b]), 0);
    }

    #[test]
    fn mutated_plots_stay_in_bounds(
        mut plots in proptest::collection::vec(arb_plot(), 1..8),
        seed in any::<u64>()
    ) {
        let mutation = problem().mutation(1.0).unwrap();
        let mut ctx = EvolutionContext::seeded(seed);
        for _ in 0..5 {
            mutation.mutate(&mut plots, &mut ctx);
        }

        for plot in &plots {
            prop_assert!((5.0..=10.0).contains(&plot.width));
            prop_assert!((5.0..=10.0).contains(&plot.height));
            prop_assert!(plot.x >= 0.0 && plot.y >= 0.0);
            prop_assert!(plot.x + plot.width <= 50.0 + 1e-9);
            prop_assert!(plot.y + plot.height <= 50.0 + 1e-9);
            prop_assert!(plot.category.map_or(true, |c| c < 3));
        }
    }

    #[test]
    fn isolated_stores_are_all_deadends(n in 1usize..6) {
        // centers 20 apart in a row, beyond the 15 threshold
        let plots: Vec<StorePlot> = (0..n)
            .map(|i| StorePlot {
                x: i as f64 * 20.0,
                y: 0.0,
                width: 5.0,
                height: 5.0,
                category: None,
            })
            .collect();
        prop_assert_eq!(count_deadends(&plots, 15.0), n);

        let breakdown = problem().breakdown(&plots);
        prop_assert_eq!(breakdown.deadend_penalty, n as f64 * 25.0);
    }

    #[test]
    fn unique_penalty_is_flat(count in 0usize..6) {
        let vocabulary = vec!["cinema".to_string()];
        let affinity = AffinityTable::default()
            .with_rule("cinema", AffinityRule::Unique { penalty: 40.0 })
            .compile(&vocabulary)
            .unwrap();
        let plots: Vec<StorePlot> = (0..count)
            .map(|i| StorePlot {
                x: i as f64 * 7.0,
                y: 0.0,
                width: 5.0,
                height: 5.0,
                category: Some(0),
            })
            .collect();

        let expected = if count > 1 { 40.0 } else { 0.0 };
        prop_assert_eq!(affinity.score(&plots).penalty, expected);
    }
}
