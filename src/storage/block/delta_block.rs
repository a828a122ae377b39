// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use std::marker::PhantomData;
use std::ops::Range;

use bytes::{Buf, BufMut};

use super::{max_bit_width, word_aligned, BitVector, Strategy, MAX_CODE_BITS};
use crate::storage::{PrimitiveFixedWidthEncode, StorageError, StorageResult};

/// A run of integers stored as a baseline value plus packed signed deltas.
///
/// Each code holds the distance from the previous value, with the top bit of the
/// code set for a descending step. Code 0 is always zero, so the baseline
/// reconstructs itself. The body layout is
///
/// ```plain
/// | count (u32) | bit_width (u8) | reserved (3B) | baseline (padded to 8B) | codes |
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DeltaBlock<T: PrimitiveFixedWidthEncode> {
    /// First row covered by this block.
    start: usize,
    /// Widened baseline value.
    baseline: i128,
    codes: BitVector,
    _phantom: PhantomData<T>,
}

impl<T: PrimitiveFixedWidthEncode> DeltaBlock<T> {
    pub(super) fn new(start: usize, baseline: i128, codes: BitVector) -> Self {
        debug_assert!(!codes.is_empty());
        debug_assert_eq!(codes.get(0), 0);
        Self {
            start,
            baseline,
            codes,
            _phantom: PhantomData,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn count(&self) -> usize {
        self.codes.len()
    }

    /// Rows covered by this block.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.count()
    }

    /// Code width in bits, including the sign bit.
    pub fn bit_width(&self) -> u8 {
        self.codes.width()
    }

    pub fn baseline(&self) -> T {
        T::from_i128(self.baseline)
    }

    pub fn codes(&self) -> &BitVector {
        &self.codes
    }

    /// Replay cursor positioned on the baseline.
    pub fn cursor(&self) -> DeltaCursor<'_, T> {
        DeltaCursor {
            block: self,
            index: 0,
            acc: self.baseline,
        }
    }

    /// Size of the encoded body of a block with `count` codes of `bit_width` bits.
    pub fn body_size(count: usize, bit_width: u8) -> usize {
        8 + word_aligned(T::WIDTH) + BitVector::byte_size(count, bit_width)
    }

    /// Apply code `code` to the accumulator. Every read path goes through here.
    #[inline]
    pub fn step(acc: i128, code: u32, bit_width: u8) -> i128 {
        let sign = 1u32 << (bit_width - 1);
        let magnitude = (code & !sign) as i128;
        if code & sign != 0 {
            acc.wrapping_sub(magnitude)
        } else {
            acc.wrapping_add(magnitude)
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.count() as u32);
        buf.put_u8(self.bit_width());
        buf.put_bytes(0, 3);
        self.baseline().encode(buf);
        buf.put_bytes(0, word_aligned(T::WIDTH) - T::WIDTH);
        self.codes.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf, start: usize) -> StorageResult<Self> {
        if buf.remaining() < 8 + word_aligned(T::WIDTH) {
            return Err(StorageError::format("delta block header truncated"));
        }
        let count = buf.get_u32_le() as usize;
        let bit_width = buf.get_u8();
        buf.advance(3);
        let baseline = T::decode(buf);
        buf.advance(word_aligned(T::WIDTH) - T::WIDTH);

        let Some(baseline) = baseline.to_i128() else {
            return Err(StorageError::format(format!(
                "{} is not a delta coded type",
                T::NAME
            )));
        };
        if count == 0 {
            return Err(StorageError::format("delta block with zero count"));
        }
        if bit_width < 2 || bit_width > max_bit_width::<T>(MAX_CODE_BITS) {
            return Err(StorageError::format(format!(
                "invalid bit width {bit_width} for {}",
                T::NAME
            )));
        }
        let codes = BitVector::decode(buf, count, bit_width)?;
        if codes.get(0) != 0 {
            return Err(StorageError::format("first delta code is not zero"));
        }
        Ok(Self::new(start, baseline, codes))
    }

    pub fn strategy(&self) -> Strategy {
        Strategy::Delta
    }
}

impl<T: PrimitiveFixedWidthEncode> std::fmt::Debug for DeltaBlock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaBlock")
            .field("start", &self.start)
            .field("count", &self.count())
            .field("baseline", &self.baseline())
            .field("bit_width", &self.bit_width())
            .finish()
    }
}

/// Accumulator replaying the deltas of one block, forward only.
pub struct DeltaCursor<'a, T: PrimitiveFixedWidthEncode> {
    block: &'a DeltaBlock<T>,
    /// Index of the value held in `acc`.
    index: usize,
    acc: i128,
}

impl<T: PrimitiveFixedWidthEncode> DeltaCursor<'_, T> {
    /// Block-relative index of the current value.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> T {
        T::from_i128(self.acc)
    }

    /// Replay forward to block-relative `index` and return its value.
    pub fn seek(&mut self, index: usize) -> T {
        debug_assert!(index >= self.index, "cursor cannot move backwards");
        debug_assert!(index < self.block.count());
        let bit_width = self.block.bit_width();
        while self.index < index {
            self.index += 1;
            self.acc = DeltaBlock::<T>::step(self.acc, self.block.codes.get(self.index), bit_width);
        }
        self.value()
    }
}
