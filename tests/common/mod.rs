//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use htm_pooler::{ActivationTarget, ScalarEncoder, SpatialPoolerConfig};

/// Number of input bits of the scalar learning scenario.
pub const INPUT_BITS: usize = 200;

/// Number of columns of the scalar learning scenario.
pub const NUM_COLUMNS: usize = 1024;

/// Number of distinct values presented in every cycle.
pub const NUM_VALUES: usize = 100;

/// Installs a logger once per test binary. Output is controlled by `RUST_LOG`.
pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// Pooler configuration used to learn scalar values: 200 input bits, 1024 columns,
/// 20 winners and a stimulus threshold of 10.
pub fn scalar_learning_config() -> SpatialPoolerConfig {
    SpatialPoolerConfig {
        potential_radius: (0.15 * INPUT_BITS as f64) as usize,
        potential_pct: 0.8,
        global_inhibition: true,
        activation: ActivationTarget::Count((0.02 * NUM_COLUMNS as f64) as usize),
        stimulus_threshold: 10.0,
        duty_cycle_period: 100,
        min_pct_overlap_duty_cycles: 1.0,
        max_boost: 5.0,
        seed: 42,
        ..SpatialPoolerConfig::new(vec![INPUT_BITS], vec![NUM_COLUMNS])
    }
}

/// Encoder for the values 0..100 into 200 bits with 15 active.
pub fn scalar_encoder() -> ScalarEncoder {
    ScalarEncoder::new(0.0, NUM_VALUES as f64, 15, INPUT_BITS).expect("valid encoder")
}

/// Dense encodings of 0, 1, .., 99.
pub fn encoded_values() -> Vec<Vec<bool>> {
    let encoder = scalar_encoder();
    (0..NUM_VALUES).map(|v| encoder.encode(v as f64)).collect()
}

/// A small configuration that learns quickly, for tests that run many pooler instances.
pub fn small_config(global_inhibition: bool) -> SpatialPoolerConfig {
    SpatialPoolerConfig {
        potential_radius: 6,
        global_inhibition,
        activation: ActivationTarget::Density(0.05),
        stimulus_threshold: 2.0,
        duty_cycle_period: 20,
        min_pct_overlap_duty_cycles: 0.1,
        max_boost: 3.0,
        update_period: 5,
        ..SpatialPoolerConfig::new(vec![60], vec![120])
    }
}
