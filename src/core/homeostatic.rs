//! The `HomeostaticPlasticityController` watches the pooler learn and decides when its output has settled.
//!
//! For every distinct input it remembers the SDR produced the last time that input was presented
//! and counts how many presentations in a row reproduced (nearly) the same SDR.
//!
//! Stages:
//! - `Initializing`: fewer than `min_cycles` learning presentations were observed. This is the
//!   "newborn" stage in which the pooler keeps boosting aggressively.
//! - `Unstable`: at least one seen input still changes its SDR.
//! - `Stable`: every seen input reproduced its SDR for `required_stable_cycles` presentations.
//!
//! Entering `Stable` and falling back from `Stable` to `Unstable` produce a `StabilityTransition`.
//! The transition is returned from `observe` and pushed to every subscriber. The controller only
//! reads what it is given and never touches pooler state.

use super::sdr::{fingerprint, similarity};
use crate::error::{HtmError, Result};
use fxhash::FxHashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Parameters of the stability monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpcConfig {
    /// Number of presentations that make up the newborn stage.
    pub min_cycles: usize,

    /// Similarity to the previous SDR of the same input that counts as "unchanged".
    pub required_similarity: f64,

    /// Consecutive unchanged presentations an input needs to count as stable.
    pub required_stable_cycles: usize,

    /// Whether the pooler switches off boosting and weak-column bumping once the newborn stage ends.
    pub disable_boosting_after_newborn: bool,
}

impl HpcConfig {
    pub fn new(min_cycles: usize) -> Self {
        Self {
            min_cycles,
            required_similarity: 0.97,
            required_stable_cycles: 50,
            disable_boosting_after_newborn: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.required_similarity > 0.0 && self.required_similarity <= 1.0) {
            return Err(HtmError::InvalidParameter {
                name: "required_similarity",
                message: "must be in range (0, 1]".to_string(),
            });
        }
        if self.required_stable_cycles == 0 {
            return Err(HtmError::InvalidParameter {
                name: "required_stable_cycles",
                message: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Stage of the learning process as judged by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityState {
    Initializing,
    Unstable,
    Stable,
}

/// Emitted when the pooler becomes stable, or when a stable pooler starts drifting again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityTransition {
    /// `true` when entering `Stable`, `false` when leaving it.
    pub is_stable: bool,

    /// Number of distinct inputs seen so far.
    pub total_patterns: usize,

    /// Mean size of the latest SDR of every seen input.
    pub avg_active_columns: f64,

    /// Every distinct input seen so far (active input indices), in order of first appearance.
    pub seen_inputs: Vec<Vec<usize>>,

    /// Presentation count at which the transition happened.
    pub cycle: usize,
}

#[derive(Debug, Clone)]
struct InputRecord {
    input: Vec<usize>,
    last_sdr: Vec<usize>,
    stable_cycles: usize,
}

/// Stability monitor over the SDRs the pooler produces per distinct input.
#[derive(Debug)]
pub struct HomeostaticPlasticityController {
    config: HpcConfig,
    state: StabilityState,
    cycle: usize,

    /// Fingerprint of an input to the positions of its records. Several records share a bucket on collision.
    index: FxHashMap<u64, Vec<usize>>,
    records: Vec<InputRecord>,
    stable_inputs: usize,

    subscribers: Vec<Sender<StabilityTransition>>,
}

impl HomeostaticPlasticityController {
    pub fn new(config: HpcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: StabilityState::Initializing,
            cycle: 0,
            index: FxHashMap::default(),
            records: Vec::new(),
            stable_inputs: 0,
            subscribers: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &HpcConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> StabilityState {
        self.state
    }

    /// True until `min_cycles` presentations have been observed.
    #[inline]
    pub fn in_newborn_stage(&self) -> bool {
        self.state == StabilityState::Initializing
    }

    /// Number of observed presentations.
    #[inline]
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Number of distinct inputs seen so far.
    #[inline]
    pub fn num_patterns(&self) -> usize {
        self.records.len()
    }

    /// Returns a receiver that gets every future transition.
    pub fn subscribe(&mut self) -> Receiver<StabilityTransition> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Records the SDR `active_columns` produced for `input` (both ascending index lists)
    /// and returns the transition this presentation caused, if any.
    pub fn observe(
        &mut self,
        input: &[usize],
        active_columns: &[usize],
    ) -> Option<StabilityTransition> {
        self.cycle += 1;
        self.record(input, active_columns);

        if self.cycle < self.config.min_cycles {
            self.state = StabilityState::Initializing;
            return None;
        }

        let all_stable = self.stable_inputs == self.records.len();
        match (self.state, all_stable) {
            (StabilityState::Stable, true) => None,
            (_, true) => {
                self.state = StabilityState::Stable;
                Some(self.emit(true))
            }
            (StabilityState::Stable, false) => {
                self.state = StabilityState::Unstable;
                Some(self.emit(false))
            }
            (StabilityState::Initializing, false) => {
                info!(
                    "Newborn stage over after {} cycles, {} distinct inputs seen",
                    self.cycle,
                    self.records.len()
                );
                self.state = StabilityState::Unstable;
                None
            }
            (StabilityState::Unstable, false) => None,
        }
    }

    fn record(&mut self, input: &[usize], active_columns: &[usize]) {
        let required = self.config.required_stable_cycles;
        let bucket = self.index.entry(fingerprint(input)).or_default();
        let position = bucket
            .iter()
            .copied()
            .find(|&position| self.records[position].input == input);

        let Some(position) = position else {
            bucket.push(self.records.len());
            self.records.push(InputRecord {
                input: input.to_vec(),
                last_sdr: active_columns.to_vec(),
                stable_cycles: 0,
            });
            return;
        };

        let record = &mut self.records[position];
        let was_stable = record.stable_cycles >= required;
        if similarity(&record.last_sdr, active_columns) >= self.config.required_similarity {
            record.stable_cycles = (record.stable_cycles + 1).min(required);
        } else {
            record.stable_cycles = 0;
        }
        record.last_sdr.clear();
        record.last_sdr.extend_from_slice(active_columns);

        match (was_stable, record.stable_cycles >= required) {
            (false, true) => self.stable_inputs += 1,
            (true, false) => self.stable_inputs -= 1,
            _ => {}
        }
    }

    fn emit(&mut self, is_stable: bool) -> StabilityTransition {
        let total_columns: usize = self.records.iter().map(|r| r.last_sdr.len()).sum();
        let transition = StabilityTransition {
            is_stable,
            total_patterns: self.records.len(),
            avg_active_columns: total_columns as f64 / self.records.len().max(1) as f64,
            seen_inputs: self.records.iter().map(|r| r.input.clone()).collect(),
            cycle: self.cycle,
        };

        if is_stable {
            info!(
                "Stable after {} cycles: {} patterns, {:.2} active columns on average",
                transition.cycle, transition.total_patterns, transition.avg_active_columns
            );
        } else {
            warn!(
                "Stability lost after {} cycles: {} of {} patterns still stable",
                transition.cycle, self.stable_inputs, transition.total_patterns
            );
        }

        self.subscribers
            .retain(|subscriber| subscriber.send(transition.clone()).is_ok());

        transition
    }
}
