//! The `SpatialPooler` is a core component of HTM that:
//! - Computes an "overlap" score for each column based on how many connected synapses match the current input.
//! - Enforces sparse activity via inhibition, allowing only a subset of top columns to become "winner columns."
//! - Learns to increase/decrease synapse permanence (strength) values if the connected input bit was active/inactive.
//! - Keeps every column in use through boosting and through bumping up weak columns.
//!
//! Each column selectively "tunes" its connections to represent frequently encountered input patterns, leading to SDRs.
//!
//! What are duty cycles?
//! - They are rolling metrics that measure how often each column is meeting certain criteria over time.
//! - The SP tracks: overlap duty cycles (ODC) and active duty cycles (ADC).
//! - ODC tracks how frequently a column has a non-zero overlap score with the input.
//! - ADC tracks how frequently a column is chosen as a winner after inhibition.
//! - Both are compared with the most active column of the neighborhood:
//!   a low ADC raises the boost factor, a low ODC bumps the column's permanences.
//!
//! With an attached `HomeostaticPlasticityController` boosting only runs during the newborn stage.

use super::{
    column::Column,
    config::SpatialPoolerConfig,
    connections::Connections,
    homeostatic::{HomeostaticPlasticityController, StabilityTransition},
    reconstructor::SdrReconstructor,
    sdr,
    topology::NeighborMap,
};
use crate::error::{HtmError, Result};
use log::{debug, info};
use std::cmp::Ordering;

/// The SpatialPooler manages a set of columns that compete to represent the input space.
/// It computes overlaps, applies inhibition, boosts weak columns, and adapts synapses during learning.
/// All learned state lives in the owned `Connections`.
#[derive(Debug)]
pub struct SpatialPooler {
    /// Learned state and topology. Exclusively owned for the lifetime of the pooler.
    connections: Connections,

    /// Optional stability monitor fed with every learning cycle.
    controller: Option<HomeostaticPlasticityController>,

    /// The total number of compute iterations performed so far (whether learning or not).
    iteration_num: u32,

    /// The number of compute iterations performed so far with learning enabled.
    iteration_learn_num: u32,

    /// Per column, how many connected synapses map to active input bits in the current iteration.
    overlaps: Vec<f32>,

    /// Overlaps scaled by the boost factors. Equal to `overlaps` when not learning.
    boosted_overlaps: Vec<f32>,

    /// The indices of columns that won the inhibition process this iteration, ascending.
    winner_columns: Vec<usize>,

    /// Winner mask of the current iteration, indexed by column.
    active: Vec<bool>,

    /// Column neighborhoods for the current inhibition radius. Empty with global inhibition.
    neighbors: NeighborMap,

    /// Number of winners allowed in the inhibition area centered on each column.
    area_targets: Vec<usize>,

    /// False once the newborn stage is over and boosting was switched off.
    boosting: bool,

    /// The last transition reported by the controller, until taken.
    last_transition: Option<StabilityTransition>,
}

impl SpatialPooler {
    /// Creates a pooler over already initialized `connections`.
    pub fn new(connections: Connections) -> Self {
        let num_columns = connections.num_columns();
        let mut sp = Self {
            connections,
            controller: None,
            iteration_num: 0,
            iteration_learn_num: 0,
            overlaps: vec![0.0; num_columns],
            boosted_overlaps: vec![0.0; num_columns],
            winner_columns: Vec::new(),
            active: vec![false; num_columns],
            neighbors: NeighborMap::default(),
            area_targets: Vec::new(),
            boosting: true,
            last_transition: None,
        };
        sp.update_neighbors();
        sp
    }

    /// Creates a pooler whose learning cycles are observed by `controller`.
    pub fn with_controller(
        connections: Connections,
        controller: HomeostaticPlasticityController,
    ) -> Self {
        let mut sp = Self::new(connections);
        sp.controller = Some(controller);
        sp
    }

    /// Validates `config`, initializes fresh `Connections` from it and wraps them.
    pub fn from_config(config: SpatialPoolerConfig) -> Result<Self> {
        Ok(Self::new(Connections::new(config)?))
    }

    /// Processes the current `input_pattern` and returns the active columns in ascending order:
    /// - Updates iteration counters.
    /// - Calculates overlaps between columns and input subsets.
    /// - Applies boosting if learning is enabled.
    /// - Performs inhibition to pick winner columns.
    ///
    /// If learning is enabled:
    /// - Updates synapse permanence values of the winners.
    /// - Updates duty cycles, boost factors and bumps weak columns.
    /// - Refreshes the inhibition radius periodically.
    /// - Reports the cycle to the controller.
    pub fn compute(&mut self, input_pattern: &[bool], learn: bool) -> Result<Vec<usize>> {
        let expected = self.connections.num_inputs();
        if input_pattern.len() != expected {
            return Err(HtmError::InputSizeMismatch {
                expected,
                actual: input_pattern.len(),
            });
        }

        self.update_iteration_number(learn);
        self.calculate_overlaps(input_pattern);
        self.boost(learn);
        self.inhibit_columns();

        if learn {
            self.adapt_synapses(input_pattern);
            self.update_duty_cycles();
            if self.boosting {
                self.update_boost_factors_and_bump();
            }
            if self.iteration_learn_num % self.connections.config().update_period == 0 {
                self.update_inhibition_radius();
            }
            self.observe(input_pattern);
        }

        Ok(self.winner_columns.clone())
    }

    /// Like `compute`, with the input given as the indices of its active bits.
    pub fn compute_sparse(&mut self, active_inputs: &[usize], learn: bool) -> Result<Vec<usize>> {
        let input_pattern = sdr::sparse_to_dense(active_inputs, self.connections.num_inputs())?;
        self.compute(&input_pattern, learn)
    }

    /// Increments the global iteration counters, including a separate counter if `learn` is true.
    #[inline]
    fn update_iteration_number(&mut self, learn: bool) {
        self.iteration_num += 1;
        if learn {
            self.iteration_learn_num += 1;
        }
    }

    /// Calculates the raw overlap for each column with the current input:
    /// counts how many connected synapses map to an active input bit.
    #[inline]
    fn calculate_overlaps(&mut self, input_pattern: &[bool]) {
        let synapses = self.connections.synapses();
        self.connections
            .config()
            .executor
            .for_each(&mut self.overlaps, |col, overlap| {
                *overlap = synapses.overlap(col, input_pattern) as f32;
            });
    }

    /// Multiplies each column's overlap by its boost factor (if learning is on).
    #[inline]
    fn boost(&mut self, learn: bool) {
        let columns = self.connections.columns();
        for (col, (boosted, &overlap)) in self
            .boosted_overlaps
            .iter_mut()
            .zip(&self.overlaps)
            .enumerate()
        {
            *boosted = if learn {
                overlap * columns[col].boost_factor
            } else {
                overlap
            };
        }
    }

    /// A column may only win with a non-zero raw overlap of at least `stimulus_threshold`.
    #[inline]
    fn is_candidate(&self, col: usize) -> bool {
        let overlap = self.overlaps[col];
        overlap > 0.0 && overlap >= self.connections.config().stimulus_threshold
    }

    /// Strongest first: higher boosted overlap wins, equal overlaps go to the lower column index.
    #[inline]
    fn rank(&self, a: usize, b: usize) -> Ordering {
        self.boosted_overlaps[b]
            .total_cmp(&self.boosted_overlaps[a])
            .then(a.cmp(&b))
    }

    /// Selects the winner columns into `self.winner_columns`, global or local depending on the configuration.
    fn inhibit_columns(&mut self) {
        let mut candidates: Vec<usize> = (0..self.connections.num_columns())
            .filter(|&col| self.is_candidate(col))
            .collect();

        let mut winners = if self.connections.config().global_inhibition {
            self.inhibit_columns_global(&mut candidates);
            candidates
        } else {
            self.inhibit_columns_local(&mut candidates)
        };
        winners.sort_unstable();

        self.active.fill(false);
        for &col in &winners {
            self.active[col] = true;
        }
        self.winner_columns = winners;
    }

    /// Implements global inhibition, the top `K` candidates by boosted overlap win:
    /// - Partially sorts the candidates so the `K` strongest come first.
    /// - Truncates the rest.
    ///
    /// Ensures only a sparse subset of columns with the highest overlaps become active, ignoring local topology.
    fn inhibit_columns_global(&self, candidates: &mut Vec<usize>) {
        let num_columns = self.connections.num_columns();
        let k = self
            .connections
            .config()
            .activation
            .winners_per_area(num_columns);

        if candidates.len() > k {
            candidates.select_nth_unstable_by(k, |&a, &b| self.rank(a, b));
            candidates.truncate(k);
        }
    }

    /// Implements local inhibition as a greedy pass over the candidates, strongest first.
    /// A candidate is accepted only if every inhibition area it belongs to still has room,
    /// so no area ever holds more winners than its target.
    fn inhibit_columns_local(&self, candidates: &mut [usize]) -> Vec<usize> {
        candidates.sort_unstable_by(|&a, &b| self.rank(a, b));

        let mut winners_in_area = vec![0usize; self.connections.num_columns()];
        let mut winners = Vec::new();
        for &col in candidates.iter() {
            let area = self.neighbors.get(col);
            if area
                .iter()
                .all(|&center| winners_in_area[center] < self.area_targets[center])
            {
                for &center in area {
                    winners_in_area[center] += 1;
                }
                winners.push(col);
            }
        }
        winners
    }

    /// Adjusts synapses for each winner column after an input is processed:
    /// - Increments permanence of synapses whose input bit was active.
    /// - Decrements permanence of synapses whose input bit was inactive.
    /// - Ensures permanence values remain within valid bounds and sorts connected synapses.
    ///
    /// Implements Hebbian-like learning that shapes columns towards frequently active inputs.
    fn adapt_synapses(&mut self, input_pattern: &[bool]) {
        let active = &self.active;
        let (config, _, synapses) = self.connections.parts_mut();
        let threshold = config.stimulus_threshold.ceil() as usize;
        let options = config.permanence;

        config
            .executor
            .for_each(&mut synapses.blocks_mut(), |col, block| {
                if active[col] {
                    block.adapt(input_pattern, &options);
                    block.update_permanences(true, threshold, &options);
                }
            });
    }

    /// Folds the current iteration into every column's overlap and active duty cycles.
    fn update_duty_cycles(&mut self) {
        let overlaps = &self.overlaps;
        let active = &self.active;
        let (config, columns, _) = self.connections.parts_mut();
        let period = config.duty_cycle_period as f32;

        config.executor.for_each(columns, |col, column| {
            column.update_duty_cycles(overlaps[col] > 0.0, active[col], period);
        });
    }

    /// Most active and most overlapping duty cycle of the neighborhood of every column.
    /// With global inhibition the neighborhood is the whole population.
    fn neighborhood_maxima(&self) -> (Vec<f32>, Vec<f32>) {
        let columns = self.connections.columns();
        if self.connections.config().global_inhibition {
            let (active, overlap) = max_duty_cycles(columns, 0..columns.len());
            (vec![active; columns.len()], vec![overlap; columns.len()])
        } else {
            (0..columns.len())
                .map(|col| max_duty_cycles(columns, self.neighbors.get(col).iter().copied()))
                .unzip()
        }
    }

    /// Recalculates each column's boost factor from its active duty cycle and
    /// bumps up the permanences of columns whose overlap duty cycle is too low:
    /// - A column firing below the typical rate of its neighborhood is boosted, see `Column::update_boost_factor`.
    /// - A column overlapping less than `min_pct_overlap_duty_cycles` of its most overlapping neighbor
    ///   gets `below_stimulus_increment` added to all its synapses.
    ///
    /// Prevents columns from perpetually remaining inactive, giving them a chance to learn and stay relevant.
    fn update_boost_factors_and_bump(&mut self) {
        let (max_active, max_overlap) = self.neighborhood_maxima();
        let num_columns = self.connections.num_columns();
        let densities: Vec<f32> = (0..num_columns)
            .map(|col| {
                let area = if self.connections.config().global_inhibition {
                    num_columns
                } else {
                    self.neighbors.get(col).len()
                };
                self.connections.config().activation.density(area)
            })
            .collect();

        let (config, columns, synapses) = self.connections.parts_mut();
        let options = config.permanence;
        let threshold = config.stimulus_threshold.ceil() as usize;

        config.executor.for_each(columns, |col, column| {
            column.update_boost_factor(
                max_active[col],
                config.min_pct_active_duty_cycles,
                densities[col],
                config.max_boost,
            );
        });

        let weak: Vec<bool> = columns
            .iter()
            .zip(&max_overlap)
            .map(|(column, &max)| {
                column.overlap_duty_cycle < config.min_pct_overlap_duty_cycles * max
            })
            .collect();

        if weak.iter().any(|&w| w) {
            config
                .executor
                .for_each(&mut synapses.blocks_mut(), |col, block| {
                    if weak[col] {
                        block.bump(options.below_stimulus_increment);
                        block.update_permanences(true, threshold, &options);
                    }
                });
        }
    }

    /// Recomputes the inhibition radius and the column neighborhoods if it changed.
    fn update_inhibition_radius(&mut self) {
        if self.connections.config().global_inhibition {
            return;
        }
        let radius = self.connections.update_inhibition_radius();
        if radius != self.neighbors.radius() {
            debug!(
                "Inhibition radius changed from {} to {} at learning iteration {}",
                self.neighbors.radius(),
                radius,
                self.iteration_learn_num
            );
            self.update_neighbors();
        }
    }

    /// Precomputes the column neighborhoods and per-area winner targets for local inhibition.
    fn update_neighbors(&mut self) {
        let config = self.connections.config();
        if config.global_inhibition {
            self.neighbors = NeighborMap::default();
            self.area_targets.clear();
            return;
        }

        self.neighbors = NeighborMap::compute_all(
            self.connections.column_topology(),
            self.connections.inhibition_radius(),
            config.wrap_around,
        );
        self.area_targets = (0..self.connections.num_columns())
            .map(|col| config.activation.winners_per_area(self.neighbors.get(col).len()))
            .collect();
    }

    /// Hands the finished learning cycle to the controller and ends the newborn stage when it says so.
    fn observe(&mut self, input_pattern: &[bool]) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };

        let input = sdr::dense_to_sparse(input_pattern);
        if let Some(transition) = controller.observe(&input, &self.winner_columns) {
            self.last_transition = Some(transition);
        }

        if self.boosting
            && !controller.in_newborn_stage()
            && controller.config().disable_boosting_after_newborn
        {
            self.boosting = false;
            let (_, columns, _) = self.connections.parts_mut();
            for column in columns.iter_mut() {
                column.boost_factor = 1.0;
            }
            info!(
                "Boosting disabled after the newborn stage at learning iteration {}",
                self.iteration_learn_num
            );
        }
    }

    /// Learned state of the pooler.
    #[inline]
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Releases the learned state, e.g. to keep it after training.
    pub fn into_connections(self) -> Connections {
        self.connections
    }

    #[inline]
    pub fn controller(&self) -> Option<&HomeostaticPlasticityController> {
        self.controller.as_ref()
    }

    /// Mutable access to the controller, e.g. to subscribe to transitions.
    #[inline]
    pub fn controller_mut(&mut self) -> Option<&mut HomeostaticPlasticityController> {
        self.controller.as_mut()
    }

    /// Returns the last stability transition not yet taken.
    pub fn take_transition(&mut self) -> Option<StabilityTransition> {
        self.last_transition.take()
    }

    /// Whether boost factors and weak-column bumping are still applied.
    #[inline]
    pub fn is_boosting(&self) -> bool {
        self.boosting
    }

    #[inline]
    pub fn iteration_num(&self) -> u32 {
        self.iteration_num
    }

    #[inline]
    pub fn iteration_learn_num(&self) -> u32 {
        self.iteration_learn_num
    }

    /// Raw overlaps of the last iteration.
    #[inline]
    pub fn overlaps(&self) -> &[f32] {
        &self.overlaps
    }

    /// Boosted overlaps of the last iteration.
    #[inline]
    pub fn boosted_overlaps(&self) -> &[f32] {
        &self.boosted_overlaps
    }

    /// Active columns of the last iteration, ascending.
    #[inline]
    pub fn winner_columns(&self) -> &[usize] {
        &self.winner_columns
    }

    /// A reconstructor reading the current permanences.
    #[inline]
    pub fn reconstructor(&self) -> SdrReconstructor<'_> {
        SdrReconstructor::new(&self.connections)
    }
}

/// Highest active and highest overlap duty cycle among `cols`.
#[inline]
fn max_duty_cycles(columns: &[Column], cols: impl Iterator<Item = usize>) -> (f32, f32) {
    cols.fold((0.0, 0.0), |(active, overlap): (f32, f32), col| {
        (
            active.max(columns[col].active_duty_cycle),
            overlap.max(columns[col].overlap_duty_cycle),
        )
    })
}
