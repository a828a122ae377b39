// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use super::{max_bit_width, BitVector, DeltaBlock, DeltaEstimate, Strategy, MAX_CODE_BITS};
use crate::storage::{PrimitiveFixedWidthEncode, StorageError, StorageResult};

/// Encode the first `estimate.count` values of `src` into a delta block whose
/// first row is `start`.
///
/// `estimate` must come from [`estimate_delta`](super::estimate_delta) over the
/// same slice; a mismatch is reported as not applicable.
pub fn compress_delta<T: PrimitiveFixedWidthEncode>(
    estimate: &DeltaEstimate<T>,
    src: &[T],
    start: usize,
) -> StorageResult<DeltaBlock<T>> {
    let count = estimate.count;
    let bit_width = estimate.bit_width;
    if count == 0 || count > src.len() {
        return Err(StorageError::not_applicable(
            Strategy::Delta,
            format!("estimate covers {count} rows, source has {}", src.len()),
        ));
    }
    if bit_width < 2 || bit_width > max_bit_width::<T>(MAX_CODE_BITS) {
        return Err(StorageError::not_applicable(
            Strategy::Delta,
            format!("bit width {bit_width} out of range for {}", T::NAME),
        ));
    }
    if src[0] != estimate.baseline {
        return Err(StorageError::not_applicable(
            Strategy::Delta,
            "estimate baseline differs from source",
        ));
    }
    let widened = src[..count]
        .iter()
        .map(|v| v.to_i128())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            StorageError::not_applicable(Strategy::Delta, format!("unsupported type {}", T::NAME))
        })?;

    let sign = 1u32 << (bit_width - 1);
    let mut codes = BitVector::new(count, bit_width);
    for (i, pair) in widened.windows(2).enumerate() {
        let (prev, cur) = (pair[0], pair[1]);
        let magnitude = cur.abs_diff(prev);
        if magnitude >= sign as u128 {
            return Err(StorageError::not_applicable(
                Strategy::Delta,
                format!("step {magnitude} does not fit in {bit_width} bits"),
            ));
        }
        let code = if cur < prev {
            sign | magnitude as u32
        } else {
            magnitude as u32
        };
        codes.set(i + 1, code);
    }
    Ok(DeltaBlock::new(start, widened[0], codes))
}
