// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use tracing::trace;

use super::{DeltaBlock, Strategy, BLOCK_HEADER_SIZE};
use crate::storage::{MosaicOptions, PrimitiveFixedWidthEncode, StorageError, StorageResult};

/// Largest code width (sign bit included) a delta block of `T` may use.
///
/// Codes must stay below half the native width and within `max_code_bits`.
pub fn max_bit_width<T: PrimitiveFixedWidthEncode>(max_code_bits: u8) -> u8 {
    let below_half = (T::native_bits() / 2).saturating_sub(1) as u8;
    below_half.min(max_code_bits)
}

/// Online estimator of the longest delta block starting at a given value.
///
/// Values are pushed one at a time. A push is rejected once the value would need
/// a wider code than allowed, and the block ends before it.
#[derive(Debug, Clone)]
pub struct DeltaEstimator {
    baseline: i128,
    prev: i128,
    /// Largest magnitude accepted so far.
    max_delta: u128,
    /// Unsigned bits needed for `max_delta`, at least 1.
    bits: u8,
    covered: usize,
    /// Maximum code width, sign bit included.
    width_limit: u8,
}

impl DeltaEstimator {
    pub fn new(baseline: i128, width_limit: u8) -> Self {
        Self {
            baseline,
            prev: baseline,
            max_delta: 0,
            bits: 1,
            covered: 1,
            width_limit,
        }
    }

    /// Try to extend the block with `value`. Returns `false` if the block must end
    /// before it; the estimator is unchanged in that case.
    pub fn push(&mut self, value: i128) -> bool {
        let delta = value.abs_diff(self.prev);
        if delta > self.max_delta {
            let needed = (u128::BITS - delta.leading_zeros()) as u8;
            let bits = self.bits.max(needed);
            if bits + 1 > self.width_limit {
                return false;
            }
            self.bits = bits;
            self.max_delta = delta;
        }
        self.prev = value;
        self.covered += 1;
        true
    }

    pub fn baseline(&self) -> i128 {
        self.baseline
    }

    /// Unsigned bits needed so far, excluding the sign bit.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn count(&self) -> usize {
        self.covered
    }

    /// Code width including the sign bit.
    pub fn bit_width(&self) -> u8 {
        self.bits + 1
    }
}

/// Result of estimating a delta block over a prefix of a column slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaEstimate<T> {
    pub baseline: T,
    /// Code width including the sign bit.
    pub bit_width: u8,
    /// Number of rows the block covers.
    pub count: usize,
}

impl<T: PrimitiveFixedWidthEncode> DeltaEstimate<T> {
    /// Bytes of the block image, header included.
    pub fn encoded_size(&self) -> usize {
        BLOCK_HEADER_SIZE + DeltaBlock::<T>::body_size(self.count, self.bit_width)
    }

    /// Uncompressed bytes over compressed bytes.
    pub fn factor(&self) -> f64 {
        (self.count * T::WIDTH) as f64 / self.encoded_size() as f64
    }
}

/// Estimate the delta block starting at `src[0]`.
///
/// Fails with [`StorageError::NotApplicable`] when `T` cannot be delta coded, or
/// when more than one value is available but the block cannot grow past the
/// baseline.
pub fn estimate_delta<T: PrimitiveFixedWidthEncode>(
    src: &[T],
    options: &MosaicOptions,
) -> StorageResult<DeltaEstimate<T>> {
    let Some(first) = src.first() else {
        return Err(StorageError::not_applicable(Strategy::Delta, "empty input"));
    };
    let Some(baseline) = first.to_i128() else {
        return Err(StorageError::not_applicable(
            Strategy::Delta,
            format!("unsupported type {}", T::NAME),
        ));
    };
    let limit = src.len().min(options.max_block_rows.max(1));
    let mut estimator = DeltaEstimator::new(baseline, max_bit_width::<T>(options.max_code_bits));
    for value in &src[1..limit] {
        // `to_i128` is total for every type that passed the check above.
        if !estimator.push(value.to_i128().unwrap_or_default()) {
            break;
        }
    }
    if limit > 1 && estimator.count() == 1 {
        trace!(
            next = ?src[1],
            baseline = ?first,
            "delta block cannot grow past its baseline"
        );
        return Err(StorageError::not_applicable(
            Strategy::Delta,
            "first step needs too many bits",
        ));
    }
    Ok(DeltaEstimate {
        baseline: *first,
        bit_width: estimator.bit_width(),
        count: estimator.count(),
    })
}
