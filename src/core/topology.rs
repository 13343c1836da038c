//! Topology represents an N-dimensional space through a list of dimensions and corresponding stride values.
//! The struct provides methods to convert between linear indices and coordinates in this N-dimensional space,
//! and also offers a way to iterate over neighborhoods of that space within a radius of a given center index.
//!
//! In the Spatial Pooler the input and column spaces are N-dimensional.
//! Potential pools are drawn from an input neighborhood and local inhibition competes inside a column neighborhood.
//! Topology helps manage the relationship between array-like indices and coordinates in these spaces.

use serde::{Deserialize, Serialize};
use std::cmp::{max, min};

/// Represents the shape of an N-dimensional space, along with precomputed stride values for
/// linear index conversions. The `dims` field stores the size of each dimension, while `strides`
/// stores the cumulative product of dimension sizes to enable fast index calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl Topology {
    /// Creates a new `Topology` from a non-empty slice of dimension sizes.
    #[inline]
    pub fn new(dimensions: &[usize]) -> Self {
        let dims = dimensions.to_vec();
        let strides = Self::strides(&dims);

        Self { dims, strides }
    }

    /// Computes the stride values for each dimension in a given slice of dimension sizes.
    #[inline]
    fn strides(dims: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; dims.len()];

        for i in (0..dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * dims[i + 1];
        }

        strides
    }

    /// The size of each dimension.
    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// The total number of elements in the space.
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Converts a linear index into its corresponding set of coordinates in the topology's N-dimensional space.
    #[inline]
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        let mut remainder = index;

        self.strides
            .iter()
            .map(|&stride| {
                let coord = remainder / stride;
                remainder %= stride;
                coord
            })
            .collect()
    }

    /// Converts a set of coordinates in the topology's N-dimensional space to a single linear index.
    #[inline]
    pub fn index_from_coordinates(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    /// Maps an index of this space proportionally onto `target`:
    /// - Each coordinate is scaled by the ratio of the dimension sizes.
    /// - Offset by half a cell for better distribution.
    /// - Clamped to the valid target range.
    ///
    /// Used to find the input bit at the "center" of a column's receptive field.
    #[inline]
    pub fn map_onto(&self, index: usize, target: &Topology) -> usize {
        let coords: Vec<usize> = self
            .coordinates(index)
            .into_iter()
            .zip(&self.dims)
            .zip(&target.dims)
            .map(|((coord, &own_dim), &target_dim)| {
                let mapped = ((coord as f64 + 0.5) * target_dim as f64 / own_dim as f64) as usize;
                mapped.min(target_dim - 1)
            })
            .collect();
        target.index_from_coordinates(&coords)
    }

    /// Returns an iterator over the neighborhood of indices within a given `radius` of the
    /// specified `center` index. If `wrapping` is true, the neighborhood wraps around edges of
    /// the topology dimensions; otherwise, it is clipped at boundaries. Either way every index is
    /// visited at most once, and the center itself is included.
    #[inline]
    pub fn neighborhood(
        &self,
        center: usize,
        radius: usize,
        wrapping: bool,
    ) -> NeighborhoodIter<'_> {
        let center_coords = self.coordinates(center);
        let radius = radius.min(isize::MAX as usize / 4) as isize;

        let bounds: Vec<(isize, isize)> = center_coords
            .iter()
            .zip(&self.dims)
            .map(|(&c, &dim)| {
                let c = c as isize;
                let dim = dim as isize;

                if wrapping {
                    (c - radius, c - radius + min(2 * radius + 1, dim))
                } else {
                    (max(c - radius, 0), min(c + radius + 1, dim))
                }
            })
            .collect();

        let current = bounds.iter().map(|&(low, _)| low).collect();

        NeighborhoodIter {
            topology: self,
            bounds,
            current: Some(current),
            wrapping,
        }
    }
}

/// An iterator that yields all valid indices within a neighborhood of a central index in the `Topology`.
/// The neighborhood is defined by a radius around the center, with optional wrapping behavior.
pub struct NeighborhoodIter<'a> {
    topology: &'a Topology,
    bounds: Vec<(isize, isize)>,
    current: Option<Vec<isize>>,
    wrapping: bool,
}

impl Iterator for NeighborhoodIter<'_> {
    type Item = usize;

    /// Returns the next index within the neighborhood. When all indices have been visited, it returns `None`.
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.as_mut()?;

        let coords: Vec<usize> = current
            .iter()
            .enumerate()
            .map(|(i, &val)| {
                let dim = self.topology.dims[i] as isize;

                if self.wrapping {
                    val.rem_euclid(dim) as usize
                } else {
                    val.clamp(0, dim - 1) as usize
                }
            })
            .collect();

        let result = self.topology.index_from_coordinates(&coords);

        for i in (0..current.len()).rev() {
            if current[i] + 1 < self.bounds[i].1 {
                current[i] += 1;

                current
                    .iter_mut()
                    .enumerate()
                    .skip(i + 1)
                    .for_each(|(j, item)| *item = self.bounds[j].0);

                return Some(result);
            }
        }

        self.current.take();

        Some(result)
    }

    /// Provides the number of elements of the whole neighborhood.
    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self
            .bounds
            .iter()
            .map(|&(low, high)| (high - low) as usize)
            .product();

        (count, Some(count))
    }
}

/// Precomputed neighbor lists for every element of a space, for a fixed radius.
/// Local inhibition and the local duty-cycle maxima look neighbors up here instead of
/// re-walking the topology each cycle.
#[derive(Debug, Clone, Default)]
pub struct NeighborMap {
    radius: usize,
    lists: Vec<Vec<usize>>,
}

impl NeighborMap {
    /// Computes the neighborhood (center included) of every element of `topology`.
    pub fn compute_all(topology: &Topology, radius: usize, wrapping: bool) -> Self {
        let lists = (0..topology.num_elements())
            .map(|index| topology.neighborhood(index, radius, wrapping).collect())
            .collect();
        Self { radius, lists }
    }

    /// The radius the lists were computed for.
    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// The neighbors of `index`, including `index` itself.
    #[inline]
    pub fn get(&self, index: usize) -> &[usize] {
        &self.lists[index]
    }
}
