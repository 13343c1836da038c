//! A `Column` in HTM represents one feature detector or receptive field in the Spatial Pooler.
//!
//! Biological inspiration:
//! Columns in HTM are inspired by cortical mini-columns found in the brain.
//!
//! Meaning in HTM:
//! Each column receives input from a random subset of the input space (via its potential synapses),
//! computes its overlap score with the current input and competes with other columns to become active.
//! Its synapses live in the shared `Synapses` pool. The column itself keeps the homeostatic bookkeeping:
//! how often it overlapped with the input, how often it won, and the boost factor derived from that.

use serde::{Deserialize, Serialize};

/// Represents a cortical column in the HTM model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// The index of the column.
    pub index: usize,

    /// Multiplier applied to the column's overlap. Always within [1, max_boost].
    pub boost_factor: f32,

    /// Moving average of how often the column won the inhibition.
    pub active_duty_cycle: f32,

    /// Moving average of how often the column had a non-zero overlap with the input.
    pub overlap_duty_cycle: f32,
}

impl Column {
    /// Creates a new Column with neutral boost and empty history.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            boost_factor: 1.0,
            active_duty_cycle: 0.0,
            overlap_duty_cycle: 0.0,
        }
    }

    /// Folds one cycle into both duty cycles, weighting the new sample with `1 / period`.
    #[inline]
    pub fn update_duty_cycles(&mut self, overlapped: bool, active: bool, period: f32) {
        let keep = (period - 1.0) / period;
        let sample = 1.0 / period;
        self.overlap_duty_cycle = self
            .overlap_duty_cycle
            .mul_add(keep, if overlapped { sample } else { 0.0 });
        self.active_duty_cycle = self
            .active_duty_cycle
            .mul_add(keep, if active { sample } else { 0.0 });
    }

    /// Recomputes the boost factor from the most active duty cycle of the neighborhood.
    ///
    /// The cutoff is the typical firing rate of the neighborhood: the target density, or
    /// `min_pct × neighborhood_max` if that is higher, but never above `neighborhood_max`.
    /// - At or above the cutoff the boost is 1.
    /// - Below it, the boost falls continuously from its value for a silent column,
    ///   `max_boost - (max_boost - 1)·exp(-neighborhood_max / target_density)`, down to 1 at the cutoff.
    ///
    /// A silent column is therefore boosted more the more its neighbors fire, and never reaches `max_boost`.
    #[inline]
    pub fn update_boost_factor(
        &mut self,
        neighborhood_max: f32,
        min_pct: f32,
        target_density: f32,
        max_boost: f32,
    ) {
        let cutoff = (min_pct * neighborhood_max).max(target_density.min(neighborhood_max));
        self.boost_factor =
            if self.active_duty_cycle >= cutoff || cutoff <= 0.0 || max_boost <= 1.0 {
                1.0
            } else {
                let deficit = 1.0 - self.active_duty_cycle / cutoff;
                let decay = (-deficit * neighborhood_max / target_density.max(f32::EPSILON)).exp();
                (max_boost - (max_boost - 1.0) * decay).clamp(1.0, max_boost)
            };
        debug_assert!(
            self.boost_factor >= 1.0 && self.boost_factor <= max_boost,
            "boost factor {} of column {} outside [1, {}]",
            self.boost_factor,
            self.index,
            max_boost
        );
    }
}
