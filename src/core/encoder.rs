//! Scalar Encoder converting numbers into the binary input vectors the pooler consumes.
//!
//! A value selects a bucket; the bucket selects a contiguous run of `width` active bits.
//! Close values share most of their bits, distant values none.

use crate::error::{HtmError, Result};
use serde::{Deserialize, Serialize};

/// Encodes values in `[min, max]` into `size` bits with `width` of them active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEncoder {
    min: f64,
    max: f64,
    width: usize,
    size: usize,
    periodic: bool,
    num_buckets: usize,
}

impl ScalarEncoder {
    /// Creates a non-periodic encoder. Values outside the range are clipped.
    pub fn new(min: f64, max: f64, width: usize, size: usize) -> Result<Self> {
        Self::build(min, max, width, size, false)
    }

    /// Creates an encoder whose range wraps around, `max` encoding like `min`.
    pub fn periodic(min: f64, max: f64, width: usize, size: usize) -> Result<Self> {
        Self::build(min, max, width, size, true)
    }

    fn build(min: f64, max: f64, width: usize, size: usize, periodic: bool) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && max > min) {
            return Err(HtmError::InvalidParameter {
                name: "max",
                message: "range must be finite and max greater than min".to_string(),
            });
        }
        if width == 0 {
            return Err(HtmError::InvalidParameter {
                name: "width",
                message: "must be > 0".to_string(),
            });
        }
        if size < width {
            return Err(HtmError::InvalidParameter {
                name: "size",
                message: "must be >= width".to_string(),
            });
        }

        let num_buckets = if periodic { size } else { size - width + 1 };
        Ok(Self {
            min,
            max,
            width,
            size,
            periodic,
            num_buckets,
        })
    }

    /// Number of output bits.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of active bits per encoding.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bucket of `value`, i.e. the first active bit.
    pub fn bucket_index(&self, value: f64) -> usize {
        let range = self.max - self.min;
        let value = if self.periodic {
            self.min + (value - self.min).rem_euclid(range)
        } else {
            value.clamp(self.min, self.max)
        };

        let normalized = (value - self.min) / range;
        let bucket = if self.periodic {
            (normalized * self.num_buckets as f64).floor()
        } else {
            (normalized * (self.num_buckets - 1) as f64).round()
        };
        (bucket as usize).min(self.num_buckets - 1)
    }

    /// Indices of the active bits for `value`, ascending.
    pub fn encode_sparse(&self, value: f64) -> Vec<usize> {
        let start = self.bucket_index(value);
        let mut bits: Vec<usize> = (start..start + self.width)
            .map(|bit| if self.periodic { bit % self.size } else { bit })
            .collect();
        bits.sort_unstable();
        bits
    }

    /// Dense encoding of `value`.
    pub fn encode(&self, value: f64) -> Vec<bool> {
        let mut bits = vec![false; self.size];
        for bit in self.encode_sparse(value) {
            bits[bit] = true;
        }
        bits
    }
}
