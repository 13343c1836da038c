//! A `Synapse` models a single potential connection between a column and an input bit.
//! Each synapse links exactly one input index to one column.
//!
//! If the permanence is at or above the connected threshold, the synapse is "connected".
//! During learning, permanence is increased or decreased depending on whether the corresponding
//! input bit was active. Only connected synapses count toward the column's overlap score.
//!
//! The centralized `Synapses` struct is a pool that stores all synapses for all columns
//! in a single contiguous vec. Each column's synapses occupy a fixed-stride subrange
//! within this array, with its connected synapses kept at the front of that subrange.
//!
//! Mutation goes through `ColumnBlock`, a borrowed view of one column's subrange. Splitting the
//! pool into blocks hands out disjoint `&mut` slices, so the blocks of different columns can be
//! updated on different threads.

use super::config::{PermanenceOptions, MAX_PERMANENCE, MIN_PERMANENCE};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A synapse connecting an input index with an associated permanence value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    /// Points to which input bit this synapse connects to.
    pub input: usize,

    /// Represents the strength of the connection between the column and the input bit.
    pub permanence: f32,
}

/// A flat pool of potential synapses for all columns.
/// Each column is allotted a contiguous region in the internal synapses vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synapses {
    /// All potential synapses for each column.
    synapses: Vec<Synapse>,

    /// The number of synapses stored for each column.
    synapse_count_per_column: Vec<usize>,

    /// The number of connected synapses for each column after pivot sorting.
    connected_synapse_count_per_column: Vec<usize>,

    /// The maximum number of synapses allowed per column.
    max_synapses_per_column: usize,
}

impl Synapses {
    /// Creates a new synapse pool for `num_columns` columns with capacity `max_potential` per column.
    pub fn new(num_columns: usize, max_potential: usize) -> Self {
        let max_potential = max_potential.max(1);
        Self {
            synapses: vec![Synapse::default(); num_columns * max_potential],
            synapse_count_per_column: vec![0; num_columns],
            connected_synapse_count_per_column: vec![0; num_columns],
            max_synapses_per_column: max_potential,
        }
    }

    /// Initializes the synapses of a column from its potential pool.
    /// Roughly `init_connected_pct` of them start just above the connected threshold,
    /// the others somewhere below it.
    pub fn init_column<R: Rng>(
        &mut self,
        column: usize,
        potential: &[usize],
        init_connected_pct: f32,
        options: &PermanenceOptions,
        rng: &mut R,
    ) {
        assert!(
            potential.len() <= self.max_synapses_per_column,
            "Attempting to insert more synapses than allowed for column {}",
            column
        );

        let column_start = column * self.max_synapses_per_column;
        let slots = &mut self.synapses[column_start..column_start + potential.len()];

        for (slot, &input) in slots.iter_mut().zip(potential) {
            let random = if rng.random::<f32>() <= init_connected_pct {
                options.connected + rng.random::<f32>() * options.active_increment / 4.0
            } else {
                options.connected * rng.random::<f32>()
            };

            let permanence = if random > options.trim_threshold {
                ((random * 100_000.0).round() / 100_000.0).clamp(MIN_PERMANENCE, MAX_PERMANENCE)
            } else {
                0.0
            };

            *slot = Synapse { input, permanence };
        }

        self.synapse_count_per_column[column] = potential.len();
        self.block_mut(column).sort(options.connected);
    }

    /// The number of columns in the pool.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.synapse_count_per_column.len()
    }

    /// Returns the index range corresponding to the synapses stored for the given column.
    #[inline]
    fn col_range(&self, column: usize) -> Range<usize> {
        let start = column * self.max_synapses_per_column;
        start..start + self.synapse_count_per_column[column]
    }

    /// Returns an immutable slice for all potential synapses of the given column.
    #[inline]
    pub fn column(&self, column: usize) -> &[Synapse] {
        &self.synapses[self.col_range(column)]
    }

    /// Returns an immutable slice for the connected synapses of the given column.
    #[inline]
    pub fn connected(&self, column: usize) -> &[Synapse] {
        let start = column * self.max_synapses_per_column;
        &self.synapses[start..start + self.connected_synapse_count_per_column[column]]
    }

    /// Number of connected synapses of the given column.
    #[inline]
    pub fn num_connected(&self, column: usize) -> usize {
        self.connected_synapse_count_per_column[column]
    }

    /// Counts how many connected synapses of `column` map to an active input bit.
    #[inline]
    pub fn overlap(&self, column: usize, input: &[bool]) -> usize {
        self.connected(column)
            .iter()
            .filter(|syn| input[syn.input])
            .count()
    }

    /// Returns a mutable view of one column's synapses.
    #[inline]
    pub fn block_mut(&mut self, column: usize) -> ColumnBlock<'_> {
        let range = self.col_range(column);
        ColumnBlock {
            column,
            synapses: &mut self.synapses[range],
            connected: &mut self.connected_synapse_count_per_column[column],
        }
    }

    /// Splits the pool into one mutable block per column.
    pub fn blocks_mut(&mut self) -> Vec<ColumnBlock<'_>> {
        let counts = &self.synapse_count_per_column;
        self.synapses
            .chunks_mut(self.max_synapses_per_column)
            .zip(self.connected_synapse_count_per_column.iter_mut())
            .zip(counts.iter())
            .enumerate()
            .map(|(column, ((chunk, connected), &count))| ColumnBlock {
                column,
                synapses: &mut chunk[..count],
                connected,
            })
            .collect()
    }
}

/// Mutable view of the synapses of one column.
#[derive(Debug)]
pub struct ColumnBlock<'a> {
    /// The column owning these synapses.
    pub column: usize,
    synapses: &'a mut [Synapse],
    connected: &'a mut usize,
}

impl ColumnBlock<'_> {
    /// Hebbian step: synapses on active input bits are strengthened, all others weakened.
    #[inline]
    pub fn adapt(&mut self, input: &[bool], options: &PermanenceOptions) {
        for syn in self.synapses.iter_mut() {
            if input[syn.input] {
                syn.permanence += options.active_increment;
            } else {
                syn.permanence -= options.inactive_decrement;
            }
        }
    }

    /// Adds `increment` to every potential synapse of the column.
    #[inline]
    pub fn bump(&mut self, increment: f32) {
        for syn in self.synapses.iter_mut() {
            syn.permanence += increment;
        }
    }

    /// Updates permanence values in a column:
    /// - if `raise` is true, first raise values until `stimulus_threshold` synapses are connected,
    /// - then trim low values and clamp the rest to [0, 1],
    /// - finally, sort the column synapses so that connected synapses come first.
    pub fn update_permanences(
        &mut self,
        raise: bool,
        stimulus_threshold: usize,
        options: &PermanenceOptions,
    ) {
        if raise {
            self.raise_permanences(stimulus_threshold, options);
        }

        for syn in self.synapses.iter_mut() {
            if syn.permanence <= options.trim_threshold {
                syn.permanence = 0.0;
            } else {
                syn.permanence = syn.permanence.clamp(MIN_PERMANENCE, MAX_PERMANENCE);
            }
            debug_assert!(
                (MIN_PERMANENCE..=MAX_PERMANENCE).contains(&syn.permanence),
                "permanence {} of column {} left [0, 1]",
                syn.permanence,
                self.column
            );
        }

        self.sort(options.connected);
    }

    /// Raises synapse permanences until at least `stimulus_threshold` synapses are connected.
    /// A pool smaller than the threshold is raised until all of its synapses are connected.
    ///
    /// All synapses are shifted by the smallest multiple of `below_stimulus_increment` that
    /// connects the `target`-th strongest one, in a single step.
    fn raise_permanences(&mut self, stimulus_threshold: usize, options: &PermanenceOptions) {
        let target = stimulus_threshold.min(self.synapses.len());
        if target == 0 || options.below_stimulus_increment <= 0.0 {
            return;
        }

        let mut permanences: Vec<f32> = self.synapses.iter().map(|syn| syn.permanence).collect();
        let (_, &mut weakest, _) =
            permanences.select_nth_unstable_by(target - 1, |a, b| b.total_cmp(a));
        if weakest >= options.connected {
            return;
        }

        let steps = ((options.connected - weakest) / options.below_stimulus_increment).ceil();
        let shift = steps * options.below_stimulus_increment;
        for syn in self.synapses.iter_mut() {
            let raised = syn.permanence + shift;
            syn.permanence = if syn.permanence >= weakest {
                raised.max(options.connected)
            } else {
                raised
            };
        }
    }

    /// Reorders the synapses so that those with permanence ≥ `connected_threshold` come first.
    pub fn sort(&mut self, connected_threshold: f32) {
        let mut pivot = 0;

        for i in 0..self.synapses.len() {
            if self.synapses[i].permanence >= connected_threshold {
                self.synapses.swap(i, pivot);
                pivot += 1;
            }
        }

        *self.connected = pivot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn pool_with(permanences: &[f32]) -> (Synapses, PermanenceOptions) {
        let options = PermanenceOptions::new(0.05, 0.008, 0.10);
        let mut synapses = Synapses::new(1, permanences.len());
        let potential: Vec<usize> = (0..permanences.len()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        synapses.init_column(0, &potential, 0.5, &options, &mut rng);
        {
            let mut block = synapses.block_mut(0);
            for (syn, &p) in block.synapses.iter_mut().zip(permanences) {
                syn.permanence = p;
            }
            block.sort(options.connected);
        }
        (synapses, options)
    }

    #[test]
    fn test_sort_puts_connected_first() {
        let (synapses, _) = pool_with(&[0.0, 0.5, 0.05, 0.1, 0.09]);
        assert_eq!(synapses.num_connected(0), 2);
        assert!(synapses.connected(0).iter().all(|s| s.permanence >= 0.1));
        assert_eq!(synapses.column(0).len(), 5);
    }

    #[test]
    fn test_adapt_clamps_to_unit_interval() {
        let (mut synapses, options) = pool_with(&[0.99, 0.004, 0.5]);
        let mut input = vec![false; 3];
        for syn in synapses.column(0) {
            input[syn.input] = syn.permanence > 0.9;
        }
        let mut block = synapses.block_mut(0);
        block.adapt(&input, &options);
        block.update_permanences(false, 0, &options);
        for syn in synapses.column(0) {
            assert!((0.0..=1.0).contains(&syn.permanence));
        }
        assert!(synapses.column(0).iter().any(|s| s.permanence == 1.0));
        assert!(synapses.column(0).iter().any(|s| s.permanence == 0.0));
    }

    #[test]
    fn test_raise_reaches_stimulus_threshold() {
        let (mut synapses, options) = pool_with(&[0.0, 0.01, 0.02, 0.03, 0.04]);
        assert_eq!(synapses.num_connected(0), 0);
        synapses.block_mut(0).update_permanences(true, 3, &options);
        assert!(synapses.num_connected(0) >= 3);
    }

    #[test]
    fn test_raise_terminates_with_tiny_increment() {
        let (mut synapses, mut options) = pool_with(&[0.0, 0.01, 0.02, 0.03, 0.04]);
        options.below_stimulus_increment = 1e-9;
        synapses.block_mut(0).update_permanences(true, 3, &options);
        assert!(synapses.num_connected(0) >= 3);
        assert!(synapses.column(0).iter().all(|s| s.permanence <= 1.0));
    }

    #[test]
    fn test_raise_shifts_in_whole_increments() {
        let (mut synapses, options) = pool_with(&[0.0, 0.2, 0.04, 0.07]);
        synapses.block_mut(0).update_permanences(true, 2, &options);
        assert_eq!(synapses.num_connected(0), 2);
        let mut permanences: Vec<f32> = synapses.column(0).iter().map(|s| s.permanence).collect();
        permanences.sort_by(f32::total_cmp);
        let shift = permanences[3] - 0.2;
        assert!(permanences[2] >= options.connected);
        assert!(permanences[2] < options.connected + options.below_stimulus_increment + 1e-5);
        assert!((permanences[2] - 0.07 - shift).abs() < 1e-5);
        assert!((permanences[1] - 0.04 - shift).abs() < 1e-5);
    }

    #[test]
    fn test_raise_is_bounded_by_pool_size() {
        let (mut synapses, options) = pool_with(&[0.0, 0.0]);
        synapses.block_mut(0).update_permanences(true, 10, &options);
        assert_eq!(synapses.num_connected(0), 2);
    }

    #[test]
    fn test_init_column_is_deterministic() {
        let options = PermanenceOptions::default();
        let potential: Vec<usize> = (0..50).collect();
        let mut a = Synapses::new(1, 50);
        let mut b = Synapses::new(1, 50);
        a.init_column(0, &potential, 0.5, &options, &mut StdRng::seed_from_u64(1));
        b.init_column(0, &potential, 0.5, &options, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
        let connected = a.num_connected(0);
        assert!(connected > 10 && connected < 40, "connected = {connected}");
    }

    #[test]
    fn test_blocks_cover_every_column() {
        let mut synapses = Synapses::new(3, 4);
        let blocks = synapses.blocks_mut();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].column, 2);
    }
}
