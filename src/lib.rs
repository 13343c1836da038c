//! Spatial Pooler for Hierarchical Temporal Memory (HTM).
//!
//! The crate turns a stream of binary input vectors into stable sparse distributed
//! representations (SDRs) over a fixed population of columns:
//! - `core::connections` owns the learned state (potential pools, permanences, duty cycles, boosts).
//! - `core::spatial_pooler` runs one cycle: overlap, inhibition, learning and homeostasis.
//! - `core::homeostatic` watches the SDRs produced per input and reports when they stop changing.
//! - `core::reconstructor` maps a set of active columns back onto input-bit strengths.

pub mod core;

/// Error types for the crate.
pub mod error {
    use thiserror::Error;

    /// Errors raised by configuration validation and by the public operations.
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum HtmError {
        /// Dimensions are empty, zero-sized or of different rank.
        #[error("Invalid dimensions: {0}")]
        InvalidDimensions(String),

        /// A configuration value is out of its valid range.
        #[error("Invalid parameter '{name}': {message}")]
        InvalidParameter { name: &'static str, message: String },

        /// A required argument is missing or malformed.
        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        /// An input vector does not match the configured input size.
        #[error("Input size mismatch: expected {expected}, got {actual}")]
        InputSizeMismatch { expected: usize, actual: usize },

        /// An index points outside of its space.
        #[error("Index {index} out of bounds (size: {size})")]
        IndexOutOfBounds { index: usize, size: usize },
    }

    /// Result type alias using `HtmError`.
    pub type Result<T> = std::result::Result<T, HtmError>;
}

pub use error::{HtmError, Result};

pub use crate::core::{
    config::{ActivationTarget, SpatialPoolerConfig},
    connections::Connections,
    encoder::ScalarEncoder,
    executor::Executor,
    homeostatic::{HomeostaticPlasticityController, HpcConfig, StabilityState, StabilityTransition},
    reconstructor::{ReconstructionMode, SdrReconstructor},
    spatial_pooler::SpatialPooler,
};
