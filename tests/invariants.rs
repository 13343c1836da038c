//! Property tests for the invariants every compute cycle must keep.
//!
//! Run with: `cargo test --test invariants`

mod common;

use common::*;
use htm_pooler::{
    core::config::PermanenceOptions, ActivationTarget, SpatialPooler, SpatialPoolerConfig,
};
use proptest::prelude::*;

fn config_strategy() -> impl Strategy<Value = SpatialPoolerConfig> {
    (
        any::<bool>(),
        0.02f32..0.2,
        0.001f32..0.2,
        0.001f32..0.1,
        0.0f32..4.0,
        1.0f32..8.0,
        any::<u64>(),
    )
        .prop_map(
            |(global, density, increment, decrement, threshold, max_boost, seed)| {
                SpatialPoolerConfig {
                    activation: ActivationTarget::Density(density),
                    permanence: PermanenceOptions::new(increment, decrement, 0.2),
                    stimulus_threshold: threshold,
                    max_boost,
                    seed,
                    ..small_config(global)
                }
            },
        )
}

fn inputs_strategy() -> impl Strategy<Value = Vec<Vec<bool>>> {
    proptest::collection::vec(proptest::collection::vec(prop::bool::weighted(0.2), 60), 1..25)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_state_stays_within_bounds(config in config_strategy(), inputs in inputs_strategy()) {
        let max_boost = config.max_boost;
        let mut sp = SpatialPooler::from_config(config).unwrap();

        for input in &inputs {
            sp.compute(input, true).unwrap();

            let connections = sp.connections();
            for col in 0..connections.num_columns() {
                for (input, permanence) in connections.permanences(col).unwrap() {
                    prop_assert!(input < 60);
                    prop_assert!((0.0..=1.0).contains(&permanence), "permanence {permanence}");
                }
                let column = connections.column(col).unwrap();
                prop_assert!(column.boost_factor >= 1.0 && column.boost_factor <= max_boost);
                prop_assert!((0.0..=1.0).contains(&column.active_duty_cycle));
                prop_assert!((0.0..=1.0).contains(&column.overlap_duty_cycle));
            }
        }
    }

    #[test]
    fn prop_active_columns_respect_targets(config in config_strategy(), inputs in inputs_strategy()) {
        let mut sp = SpatialPooler::from_config(config).unwrap();

        for input in &inputs {
            let radius = sp.connections().inhibition_radius();
            let active = sp.compute(input, true).unwrap();

            let connections = sp.connections();
            let num_columns = connections.num_columns();
            let config = connections.config();

            prop_assert!(active.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(active.iter().all(|&col| col < num_columns));
            for &col in &active {
                prop_assert!(sp.overlaps()[col] > 0.0);
                prop_assert!(sp.overlaps()[col] >= config.stimulus_threshold);
            }

            if config.global_inhibition {
                prop_assert!(active.len() <= config.activation.winners_per_area(num_columns));
            } else {
                let topology = connections.column_topology();
                for center in 0..num_columns {
                    let area: Vec<usize> = topology.neighborhood(center, radius, config.wrap_around).collect();
                    let winners = area.iter().filter(|&&col| active.binary_search(&col).is_ok()).count();
                    prop_assert!(winners <= config.activation.winners_per_area(area.len()));
                }
            }
        }
    }

    #[test]
    fn prop_all_zero_input_is_empty(config in config_strategy(), cycles in 1usize..10) {
        let mut sp = SpatialPooler::from_config(config).unwrap();
        for _ in 0..cycles {
            prop_assert!(sp.compute(&[false; 60], true).unwrap().is_empty());
        }
    }
}
