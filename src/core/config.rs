//! Configuration of a Spatial Pooler experiment.
//!
//! A `SpatialPoolerConfig` is plain data: it is built once (usually from `SpatialPoolerConfig::new`
//! plus struct-update syntax), validated when `Connections` is created and never changed afterwards.

use super::executor::Executor;
use crate::error::{HtmError, Result};
use serde::{Deserialize, Serialize};

/// Lowest value a permanence can take.
pub const MIN_PERMANENCE: f32 = 0.0;

/// Highest value a permanence can take.
pub const MAX_PERMANENCE: f32 = 1.0;

/// How many columns may win inside one inhibition area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationTarget {
    /// Fraction of the columns of an inhibition area that become active.
    Density(f32),
    /// Explicit number of active columns per inhibition area.
    Count(usize),
}

impl ActivationTarget {
    /// Number of winners allowed in an inhibition area of `area_size` columns.
    #[inline]
    pub fn winners_per_area(&self, area_size: usize) -> usize {
        match *self {
            Self::Density(density) => ((density * area_size as f32).round() as usize)
                .max(1)
                .min(area_size),
            Self::Count(count) => count.min(area_size),
        }
    }

    /// Effective activation density of an inhibition area of `area_size` columns.
    #[inline]
    pub fn density(&self, area_size: usize) -> f32 {
        self.winners_per_area(area_size) as f32 / area_size.max(1) as f32
    }
}

/// Options governing how synapse permanence is adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermanenceOptions {
    pub active_increment: f32,
    pub inactive_decrement: f32,
    /// A synapse whose permanence is at least this value is connected.
    pub connected: f32,
    /// Step used to raise permanences of weak columns and of columns below the stimulus threshold.
    pub below_stimulus_increment: f32,
    /// Permanences at or below this value are set to zero.
    pub trim_threshold: f32,
}

impl PermanenceOptions {
    /// Builds the options and derives the below-stimulus step and trim threshold the usual way.
    pub fn new(active_increment: f32, inactive_decrement: f32, connected: f32) -> Self {
        Self {
            active_increment,
            inactive_decrement,
            connected,
            below_stimulus_increment: connected / 10.0,
            trim_threshold: active_increment / 2.0,
        }
    }
}

impl Default for PermanenceOptions {
    fn default() -> Self {
        Self::new(0.05, 0.008, 0.10)
    }
}

/// Immutable parameters of the Spatial Pooler and its `Connections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoolerConfig {
    /// The shape (dimensions) of the input space.
    pub input_dimensions: Vec<usize>,

    /// The shape (dimensions) of the column grid. Must have the same rank as the input.
    pub column_dimensions: Vec<usize>,

    /// Radius (in input space) around a column's center from which potential synapses are drawn.
    /// A radius reaching past every input dimension covers the whole input space.
    pub potential_radius: usize,

    /// Fraction of the inputs inside the potential radius that become potential synapses.
    pub potential_pct: f64,

    /// If true, all columns compete with each other. Otherwise they compete inside their neighborhood.
    pub global_inhibition: bool,

    /// Target number of winners per inhibition area.
    pub activation: ActivationTarget,

    /// The minimum raw overlap a column must have to be considered for winning.
    pub stimulus_threshold: f32,

    /// Settings for how synapse permanence is incremented/decremented and thresholded.
    pub permanence: PermanenceOptions,

    /// Fraction of each column's potential synapses that initially start out connected.
    pub init_connected_pct: f32,

    /// The time window over which overlap and active duty cycles are averaged.
    pub duty_cycle_period: u32,

    /// Fraction of the neighborhood's maximum overlap duty cycle below which a column is rescued.
    pub min_pct_overlap_duty_cycles: f32,

    /// Fraction of the neighborhood's maximum active duty cycle below which a column is boosted,
    /// if that is above the target density.
    pub min_pct_active_duty_cycles: f32,

    /// The maximum boost factor applied to the overlap of an under-active column.
    pub max_boost: f32,

    /// If true, neighborhoods "wrap around" the edges in topology calculations.
    pub wrap_around: bool,

    /// How often (in learning iterations) the inhibition radius is recalculated.
    pub update_period: u32,

    /// Seed for the random source used to draw potential pools and initial permanences.
    pub seed: u64,

    /// Sequential or data-parallel execution of the per-column phases.
    pub executor: Executor,
}

impl SpatialPoolerConfig {
    /// Creates a configuration with default parameters for the given input and column shapes.
    pub fn new(input_dimensions: Vec<usize>, column_dimensions: Vec<usize>) -> Self {
        Self {
            input_dimensions,
            column_dimensions,
            potential_radius: 16,
            potential_pct: 0.5,
            global_inhibition: true,
            activation: ActivationTarget::Density(0.02),
            stimulus_threshold: 0.0,
            permanence: PermanenceOptions::default(),
            init_connected_pct: 0.5,
            duty_cycle_period: 1000,
            min_pct_overlap_duty_cycles: 0.001,
            min_pct_active_duty_cycles: 0.001,
            max_boost: 10.0,
            wrap_around: true,
            update_period: 50,
            seed: 42,
            executor: Executor::Sequential,
        }
    }

    /// The total number of input bits.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_dimensions.iter().product()
    }

    /// The total number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.column_dimensions.iter().product()
    }

    /// Number of potential synapses drawn from a neighborhood of `candidates` input bits.
    #[inline]
    pub fn potential_pool_size(&self, candidates: usize) -> usize {
        (((candidates as f64 * self.potential_pct) + 0.5) as usize).clamp(1, candidates.max(1))
    }

    /// Checks every parameter and returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        Self::validate_dimensions("input_dimensions", &self.input_dimensions)?;
        Self::validate_dimensions("column_dimensions", &self.column_dimensions)?;
        if self.input_dimensions.len() != self.column_dimensions.len() {
            return Err(HtmError::InvalidDimensions(format!(
                "input rank {} differs from column rank {}",
                self.input_dimensions.len(),
                self.column_dimensions.len()
            )));
        }

        if !(self.potential_pct > 0.0 && self.potential_pct <= 1.0) {
            return Err(invalid("potential_pct", "must be in range (0, 1]"));
        }

        let options = &self.permanence;
        for (name, value) in [
            ("permanence.active_increment", options.active_increment),
            ("permanence.inactive_decrement", options.inactive_decrement),
            ("permanence.below_stimulus_increment", options.below_stimulus_increment),
            ("permanence.trim_threshold", options.trim_threshold),
            ("init_connected_pct", self.init_connected_pct),
            ("min_pct_overlap_duty_cycles", self.min_pct_overlap_duty_cycles),
            ("min_pct_active_duty_cycles", self.min_pct_active_duty_cycles),
        ] {
            if !(MIN_PERMANENCE..=MAX_PERMANENCE).contains(&value) {
                return Err(invalid(name, "must be in range [0, 1]"));
            }
        }
        if !(options.connected > MIN_PERMANENCE && options.connected < MAX_PERMANENCE) {
            return Err(invalid("permanence.connected", "must be in range (0, 1)"));
        }
        if options.trim_threshold >= options.connected {
            return Err(invalid(
                "permanence.trim_threshold",
                "must be below the connected threshold",
            ));
        }
        if options.below_stimulus_increment <= 0.0 && self.stimulus_threshold > 0.0 {
            return Err(invalid(
                "permanence.below_stimulus_increment",
                "must be positive when a stimulus threshold is set",
            ));
        }

        match self.activation {
            ActivationTarget::Density(density) if !(density > 0.0 && density <= 0.5) => {
                return Err(invalid("activation", "density must be in range (0, 0.5]"));
            }
            ActivationTarget::Count(count) if count == 0 || count > self.num_columns() => {
                return Err(invalid(
                    "activation",
                    "count must be positive and not exceed the number of columns",
                ));
            }
            _ => {}
        }

        if !(self.stimulus_threshold.is_finite() && self.stimulus_threshold >= 0.0) {
            return Err(invalid("stimulus_threshold", "must be a finite value >= 0"));
        }
        if self.duty_cycle_period == 0 {
            return Err(invalid("duty_cycle_period", "must be > 0"));
        }
        if self.update_period == 0 {
            return Err(invalid("update_period", "must be > 0"));
        }
        if !(self.max_boost.is_finite() && self.max_boost >= 1.0) {
            return Err(invalid("max_boost", "must be a finite value >= 1"));
        }

        let smallest_pool = self.potential_pool_size(self.smallest_potential_neighborhood());
        if (smallest_pool as f32) < self.stimulus_threshold {
            return Err(invalid(
                "potential_radius",
                &format!(
                    "a potential pool of {} synapses can never reach the stimulus threshold {}",
                    smallest_pool, self.stimulus_threshold
                ),
            ));
        }

        Ok(())
    }

    /// Size of the smallest input neighborhood a column can be centered on.
    fn smallest_potential_neighborhood(&self) -> usize {
        let radius = self.potential_radius;
        self.input_dimensions
            .iter()
            .map(|&dim| {
                let window = radius.saturating_mul(2).saturating_add(1).min(dim);
                if self.wrap_around {
                    window
                } else {
                    radius.saturating_add(1).min(dim)
                }
            })
            .product()
    }

    fn validate_dimensions(name: &str, dimensions: &[usize]) -> Result<()> {
        if dimensions.is_empty() {
            return Err(HtmError::InvalidDimensions(format!("{name} cannot be empty")));
        }
        if dimensions.iter().any(|&dim| dim == 0) {
            return Err(HtmError::InvalidDimensions(format!(
                "{name} must be positive, got {dimensions:?}"
            )));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, message: &str) -> HtmError {
    HtmError::InvalidParameter {
        name,
        message: message.to_string(),
    }
}
