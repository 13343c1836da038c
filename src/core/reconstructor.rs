//! The `SdrReconstructor` maps a set of active columns back onto the input space.
//!
//! Every active column votes for the input bits in its potential pool with the permanence of the
//! synapse to that bit. The votes per input bit are summed or averaged. Input bits no active column
//! votes for are absent from the result. The reconstructor only reads `Connections`.

use super::connections::Connections;
use crate::error::{HtmError, Result};
use std::collections::BTreeMap;

/// How the votes of several active columns for one input bit are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconstructionMode {
    /// Sum of the permanences.
    #[default]
    Sum,
    /// Sum divided by the number of voting columns.
    Average,
}

/// Approximates which input bits caused a set of active columns.
#[derive(Debug, Clone, Copy)]
pub struct SdrReconstructor<'a> {
    connections: &'a Connections,
    mode: ReconstructionMode,
    include_disconnected: bool,
}

impl<'a> SdrReconstructor<'a> {
    /// Sums permanences over all potential synapses.
    pub fn new(connections: &'a Connections) -> Self {
        Self {
            connections,
            mode: ReconstructionMode::Sum,
            include_disconnected: true,
        }
    }

    pub fn with_mode(mut self, mode: ReconstructionMode) -> Self {
        self.mode = mode;
        self
    }

    /// If false, only connected synapses vote.
    pub fn include_disconnected(mut self, include: bool) -> Self {
        self.include_disconnected = include;
        self
    }

    /// Returns the strength of every input bit reached by the potential pools of `active_columns`.
    ///
    /// `None` is rejected, an empty set yields an empty map. Repeated columns count once.
    pub fn reconstruct(&self, active_columns: Option<&[usize]>) -> Result<BTreeMap<usize, f64>> {
        let active_columns = active_columns.ok_or_else(|| {
            HtmError::InvalidArgument("active columns must be provided".to_string())
        })?;

        let mut columns = active_columns.to_vec();
        columns.sort_unstable();
        columns.dedup();

        let mut votes: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for col in columns {
            self.connections.column(col)?;
            let synapses = if self.include_disconnected {
                self.connections.synapses().column(col)
            } else {
                self.connections.synapses().connected(col)
            };
            for syn in synapses {
                let (sum, count) = votes.entry(syn.input).or_insert((0.0, 0));
                *sum += f64::from(syn.permanence);
                *count += 1;
            }
        }

        Ok(votes
            .into_iter()
            .map(|(input, (sum, count))| {
                let strength = match self.mode {
                    ReconstructionMode::Sum => sum,
                    ReconstructionMode::Average => sum / count as f64,
                };
                (input, strength)
            })
            .collect())
    }

    /// Reconstructs and fills the gaps with zero, giving one strength per input bit.
    pub fn reconstruct_dense(&self, active_columns: &[usize]) -> Result<Vec<f64>> {
        let strengths = self.reconstruct(Some(active_columns))?;
        Ok(to_dense(&strengths, self.connections.num_inputs()))
    }
}

/// Strength vector of length `size`; input bits missing from `strengths` are zero.
pub fn to_dense(strengths: &BTreeMap<usize, f64>, size: usize) -> Vec<f64> {
    let mut dense = vec![0.0; size];
    for (&input, &strength) in strengths.range(..size) {
        dense[input] = strength;
    }
    dense
}

/// Bits whose strength reaches `threshold`.
pub fn binarize(strengths: &[f64], threshold: f64) -> Vec<bool> {
    strengths.iter().map(|&s| s >= threshold).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SpatialPoolerConfig;

    fn connections() -> Connections {
        Connections::new(SpatialPoolerConfig {
            potential_radius: 4,
            stimulus_threshold: 1.0,
            ..SpatialPoolerConfig::new(vec![30], vec![60])
        })
        .unwrap()
    }

    #[test]
    fn test_none_is_invalid() {
        let connections = connections();
        let reconstructor = SdrReconstructor::new(&connections);
        assert!(matches!(
            reconstructor.reconstruct(None),
            Err(HtmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_gives_empty_map() {
        let connections = connections();
        let reconstructor = SdrReconstructor::new(&connections);
        assert!(reconstructor.reconstruct(Some(&[][..])).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_column() {
        let connections = connections();
        let reconstructor = SdrReconstructor::new(&connections);
        assert_eq!(
            reconstructor.reconstruct(Some(&[3, 60][..])).unwrap_err(),
            HtmError::IndexOutOfBounds { index: 60, size: 60 }
        );
    }

    #[test]
    fn test_single_column_matches_permanences() {
        let connections = connections();
        let strengths = SdrReconstructor::new(&connections)
            .reconstruct(Some(&[7, 7][..]))
            .unwrap();
        let expected: BTreeMap<usize, f64> = connections
            .permanences(7)
            .unwrap()
            .into_iter()
            .map(|(input, p)| (input, f64::from(p)))
            .collect();
        assert_eq!(strengths, expected);
    }

    #[test]
    fn test_sum_and_average() {
        let connections = connections();
        let columns = [10, 11, 12];
        let reconstructor = SdrReconstructor::new(&connections);
        let sum = reconstructor.reconstruct(Some(&columns[..])).unwrap();
        let average = reconstructor
            .with_mode(ReconstructionMode::Average)
            .reconstruct(Some(&columns[..]))
            .unwrap();

        assert_eq!(sum.keys().collect::<Vec<_>>(), average.keys().collect::<Vec<_>>());
        for (input, &total) in &sum {
            let voters = columns
                .iter()
                .filter(|&&col| connections.potential_pool(col).unwrap().contains(input))
                .count();
            assert!((average[input] * voters as f64 - total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_connected_only_is_a_subset() {
        let connections = connections();
        let reconstructor = SdrReconstructor::new(&connections);
        let all = reconstructor.reconstruct(Some(&[20, 21][..])).unwrap();
        let connected = reconstructor
            .include_disconnected(false)
            .reconstruct(Some(&[20, 21][..]))
            .unwrap();
        assert!(!connected.is_empty());
        assert!(connected.len() <= all.len());
        for (input, &strength) in &connected {
            assert!(strength <= all[input]);
        }
        let threshold = connections.config().permanence.connected as f64;
        assert!(connected.values().all(|&s| s >= threshold));
    }

    #[test]
    fn test_dense_helpers() {
        let strengths = BTreeMap::from([(1, 0.5), (3, 1.5), (9, 2.0)]);
        assert_eq!(to_dense(&strengths, 5), vec![0.0, 0.5, 0.0, 1.5, 0.0]);
        assert_eq!(
            binarize(&[0.0, 0.5, 0.0, 1.5], 0.5),
            vec![false, true, false, true]
        );
    }
}
