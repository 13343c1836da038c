//! Execution strategy for the per-column phases of a compute cycle.
//!
//! Overlap, permanence updates and duty-cycle/boost updates of one column only touch that column's
//! state and read the shared input, so they can run over column partitions in parallel.
//! Inhibition stays serial and acts as the barrier between the phases.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Selects how the per-column phases are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Executor {
    /// Columns are processed one after another on the calling thread.
    #[default]
    Sequential,
    /// Columns are partitioned across the rayon thread pool.
    Parallel,
}

impl Executor {
    /// Calls `f` with the index and a mutable reference of every item.
    #[inline]
    pub fn for_each<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        match self {
            Self::Sequential => items
                .iter_mut()
                .enumerate()
                .for_each(|(index, item)| f(index, item)),
            Self::Parallel => items
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, item)| f(index, item)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executors_agree() {
        let mut sequential: Vec<usize> = vec![0; 1000];
        let mut parallel: Vec<usize> = vec![0; 1000];
        Executor::Sequential.for_each(&mut sequential, |i, x| *x = i * i);
        Executor::Parallel.for_each(&mut parallel, |i, x| *x = i * i);
        assert_eq!(sequential, parallel);
    }
}
