// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use std::ops::Range;

use bytes::{Buf, BufMut};

use super::{probe_right, word_aligned, BlockIterator};
use crate::storage::{Candidates, Predicate, PrimitiveFixedWidthEncode, StorageError, StorageResult};

/// Uncompressed block, used for chunks no other strategy applies to. The body
/// layout is simply an array of little endian fixed-width data.
///
/// ```plain
/// | count (u32) | reserved (4B) | data | data | ... | padding to 8B |
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RawBlock<T: PrimitiveFixedWidthEncode> {
    start: usize,
    values: Vec<T>,
}

impl<T: PrimitiveFixedWidthEncode> RawBlock<T> {
    /// Copy `src` into a raw block whose first row is `start`.
    pub fn new(src: &[T], start: usize) -> Self {
        debug_assert!(!src.is_empty());
        Self {
            start,
            values: src.to_vec(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.count()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn body_size(count: usize) -> usize {
        8 + word_aligned(count * T::WIDTH)
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.count() as u32);
        buf.put_u32_le(0);
        for value in &self.values {
            value.encode(buf);
        }
        let data_size = self.count() * T::WIDTH;
        buf.put_bytes(0, word_aligned(data_size) - data_size);
    }

    pub fn decode(buf: &mut impl Buf, start: usize) -> StorageResult<Self> {
        if buf.remaining() < 8 {
            return Err(StorageError::format("raw block header truncated"));
        }
        let count = buf.get_u32_le() as usize;
        buf.advance(4);
        if count == 0 {
            return Err(StorageError::format("raw block with zero count"));
        }
        let data_size = count * T::WIDTH;
        if buf.remaining() < word_aligned(data_size) {
            return Err(StorageError::format(format!(
                "expected {} bytes of raw data, found {}",
                word_aligned(data_size),
                buf.remaining()
            )));
        }
        let values = (0..count).map(|_| T::decode(buf)).collect();
        buf.advance(word_aligned(data_size) - data_size);
        Ok(Self { start, values })
    }

    pub fn iter(&self) -> RawBlockIterator<'_, T> {
        RawBlockIterator {
            block: self,
            next_row: 0,
        }
    }

    pub fn decompress(&self, out: &mut Vec<T>) -> usize {
        self.iter().next_batch(None, out)
    }

    pub fn select<'a, P: Predicate<T>>(
        &'a self,
        cands: &Candidates<'a>,
        pred: P,
    ) -> impl Iterator<Item = usize> + 'a
    where
        P: 'a,
    {
        let start = self.start;
        cands
            .within(self.range())
            .filter(move |&pos| pred.eval(&self.values[pos - start]))
    }

    pub fn project(&self, cands: &Candidates<'_>, out: &mut Vec<T>) -> usize {
        let before = out.len();
        out.extend(
            cands
                .within(self.range())
                .map(|pos| self.values[pos - self.start]),
        );
        out.len() - before
    }

    pub fn join(
        &self,
        cands: &Candidates<'_>,
        right: &[T],
        right_cands: &Candidates<'_>,
        nil_matches: bool,
        out: &mut Vec<(usize, usize)>,
    ) -> usize {
        let mut cnt = 0;
        for pos in cands.within(self.range()) {
            let value = &self.values[pos - self.start];
            if value.is_null() && !nil_matches {
                continue;
            }
            cnt += probe_right(value, pos, right, right_cands, nil_matches, out);
        }
        cnt
    }
}

/// Scans the values of a raw block in order.
pub struct RawBlockIterator<'a, T: PrimitiveFixedWidthEncode> {
    block: &'a RawBlock<T>,

    /// Indicates the beginning row of the next batch
    next_row: usize,
}

impl<T: PrimitiveFixedWidthEncode> BlockIterator<T> for RawBlockIterator<'_, T> {
    fn next_batch(&mut self, expected_size: Option<usize>, out: &mut Vec<T>) -> usize {
        let row_count = self.block.count();
        let end = match expected_size {
            Some(expected_size) => {
                assert!(expected_size > 0);
                row_count.min(self.next_row + expected_size)
            }
            None => row_count,
        };
        if self.next_row >= end {
            return 0;
        }
        out.extend_from_slice(&self.block.values[self.next_row..end]);
        let cnt = end - self.next_row;
        self.next_row = end;
        cnt
    }

    fn skip(&mut self, cnt: usize) {
        self.next_row = self.block.count().min(self.next_row + cnt);
    }

    fn remaining_items(&self) -> usize {
        self.block.count() - self.next_row
    }
}
