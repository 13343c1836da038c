//! `Connections` owns everything the Spatial Pooler learns, plus the static topology it learns on.
//!
//! Created once per experiment from a validated `SpatialPoolerConfig`:
//! - every column draws its potential pool from an input neighborhood around its mapped center,
//! - every potential synapse gets an initial permanence close to the connected threshold,
//! - each column is raised until it has at least `stimulus_threshold` connected synapses.
//!
//! Afterwards the pooler mutates it in place, cycle by cycle. Potential pools never change.

use super::{
    column::Column,
    config::SpatialPoolerConfig,
    synapses::Synapses,
    topology::Topology,
};
use crate::error::{HtmError, Result};
use log::debug;
use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Learned state and topology of one Spatial Pooler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    config: SpatialPoolerConfig,
    input_topology: Topology,
    column_topology: Topology,
    columns: Vec<Column>,
    synapses: Synapses,
    inhibition_radius: usize,
}

impl Connections {
    /// Validates `config` and initializes all columns from a random source seeded with `config.seed`.
    pub fn new(config: SpatialPoolerConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, &mut rng)
    }

    /// Validates `config` and initializes all columns, drawing randomness from `rng`.
    pub fn with_rng<R: Rng>(config: SpatialPoolerConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let num_columns = config.num_columns();
        let input_topology = Topology::new(&config.input_dimensions);
        let column_topology = Topology::new(&config.column_dimensions);

        let pools: Vec<Vec<usize>> = (0..num_columns)
            .map(|column| {
                Self::map_potential(&config, &column_topology, &input_topology, column, rng)
            })
            .collect();
        let max_pool = pools.iter().map(Vec::len).max().unwrap_or(0);

        let mut synapses = Synapses::new(num_columns, max_pool);
        let threshold = config.stimulus_threshold.ceil() as usize;
        for (column, pool) in pools.iter().enumerate() {
            synapses.init_column(
                column,
                pool,
                config.init_connected_pct,
                &config.permanence,
                rng,
            );
            synapses
                .block_mut(column)
                .update_permanences(true, threshold, &config.permanence);
        }

        let mut connections = Self {
            columns: (0..num_columns).map(Column::new).collect(),
            input_topology,
            column_topology,
            synapses,
            inhibition_radius: 0,
            config,
        };
        connections.update_inhibition_radius();

        debug!(
            "Initialized {} columns over {} inputs: {} potential synapses at most per column, inhibition radius {}",
            num_columns,
            connections.num_inputs(),
            max_pool,
            connections.inhibition_radius
        );

        Ok(connections)
    }

    /// Samples which input bits fall within a column's potential radius:
    /// - Determines the center input index for the column.
    /// - Gathers all input indices within the potential radius from that center.
    /// - Randomly selects `potential_pct` fraction of them as potential synapses.
    fn map_potential<R: Rng>(
        config: &SpatialPoolerConfig,
        column_topology: &Topology,
        input_topology: &Topology,
        column: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        let center = column_topology.map_onto(column, input_topology);
        let elements_around_center =
            input_topology.neighborhood(center, config.potential_radius, config.wrap_around);
        let size = config.potential_pool_size(elements_around_center.size_hint().0);
        let mut sample = elements_around_center.choose_multiple(rng, size);
        sample.sort_unstable();
        sample
    }

    /// The configuration these connections were built from.
    #[inline]
    pub fn config(&self) -> &SpatialPoolerConfig {
        &self.config
    }

    /// The total number of bits/inputs available.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_topology.num_elements()
    }

    /// The total number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn input_topology(&self) -> &Topology {
        &self.input_topology
    }

    #[inline]
    pub fn column_topology(&self) -> &Topology {
        &self.column_topology
    }

    /// All columns, indexed by column index.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// A single column, or an error if the index is out of range.
    pub fn column(&self, column: usize) -> Result<&Column> {
        self.columns.get(column).ok_or(HtmError::IndexOutOfBounds {
            index: column,
            size: self.columns.len(),
        })
    }

    /// The shared synapse pool.
    #[inline]
    pub fn synapses(&self) -> &Synapses {
        &self.synapses
    }

    /// Splits the state into the parts a learning cycle mutates independently.
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> (&SpatialPoolerConfig, &mut [Column], &mut Synapses) {
        (&self.config, &mut self.columns, &mut self.synapses)
    }

    /// The input bits `column` may connect to, in ascending order.
    pub fn potential_pool(&self, column: usize) -> Result<Vec<usize>> {
        self.column(column)?;
        let mut pool: Vec<usize> = self
            .synapses
            .column(column)
            .iter()
            .map(|syn| syn.input)
            .collect();
        pool.sort_unstable();
        Ok(pool)
    }

    /// `(input, permanence)` pairs of `column`, in ascending input order.
    pub fn permanences(&self, column: usize) -> Result<Vec<(usize, f32)>> {
        self.column(column)?;
        let mut permanences: Vec<(usize, f32)> = self
            .synapses
            .column(column)
            .iter()
            .map(|syn| (syn.input, syn.permanence))
            .collect();
        permanences.sort_unstable_by_key(|&(input, _)| input);
        Ok(permanences)
    }

    /// The radius (in column space) of the neighborhoods columns compete in.
    #[inline]
    pub fn inhibition_radius(&self) -> usize {
        self.inhibition_radius
    }

    /// Recalculates the inhibition radius from the receptive fields' current extent.
    /// With global inhibition the radius spans the whole column space.
    pub fn update_inhibition_radius(&mut self) -> usize {
        self.inhibition_radius = if self.config.global_inhibition {
            self.config
                .column_dimensions
                .iter()
                .copied()
                .max()
                .unwrap_or(1)
        } else {
            let total_span: f64 = (0..self.num_columns())
                .map(|column| self.avg_connected_span_for_column(column))
                .sum();
            let avg_span = total_span / self.num_columns() as f64;
            let diameter = avg_span * self.avg_columns_per_input();
            (((diameter - 1.0) / 2.0).round().max(1.0)) as usize
        };
        self.inhibition_radius
    }

    /// Average (over dimensions) extent of the connected synapses of `column` in input space.
    fn avg_connected_span_for_column(&self, column: usize) -> f64 {
        let connected = self.synapses.connected(column);
        if connected.is_empty() {
            return 0.0;
        }

        let dims = self.input_topology.dimensions().len();
        let mut lows = vec![usize::MAX; dims];
        let mut highs = vec![0; dims];
        for syn in connected {
            for (dim, coord) in self.input_topology.coordinates(syn.input).into_iter().enumerate() {
                lows[dim] = lows[dim].min(coord);
                highs[dim] = highs[dim].max(coord);
            }
        }

        let total: usize = lows
            .iter()
            .zip(&highs)
            .map(|(&low, &high)| high - low + 1)
            .sum();
        total as f64 / dims as f64
    }

    /// Average ratio of columns to inputs over all dimensions.
    fn avg_columns_per_input(&self) -> f64 {
        let ratios: f64 = self
            .config
            .column_dimensions
            .iter()
            .zip(&self.config.input_dimensions)
            .map(|(&columns, &inputs)| columns as f64 / inputs as f64)
            .sum();
        ratios / self.config.column_dimensions.len() as f64
    }
}
