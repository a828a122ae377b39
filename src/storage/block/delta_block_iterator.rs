// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use super::{BlockIterator, DeltaBlock, DeltaCursor};
use crate::storage::PrimitiveFixedWidthEncode;

/// Scans the values of a delta block in order.
pub struct DeltaBlockIterator<'a, T: PrimitiveFixedWidthEncode> {
    cursor: DeltaCursor<'a, T>,

    /// Total count of elements in block
    row_count: usize,

    /// Indicates the beginning row of the next batch
    next_row: usize,
}

impl<'a, T: PrimitiveFixedWidthEncode> DeltaBlockIterator<'a, T> {
    pub fn new(block: &'a DeltaBlock<T>) -> Self {
        Self {
            cursor: block.cursor(),
            row_count: block.count(),
            next_row: 0,
        }
    }
}

impl<T: PrimitiveFixedWidthEncode> BlockIterator<T> for DeltaBlockIterator<'_, T> {
    fn next_batch(&mut self, expected_size: Option<usize>, out: &mut Vec<T>) -> usize {
        let end = match expected_size {
            Some(expected_size) => {
                assert!(expected_size > 0);
                self.row_count.min(self.next_row + expected_size)
            }
            None => self.row_count,
        };
        let cnt = end.saturating_sub(self.next_row);
        out.reserve(cnt);
        for row in self.next_row..end {
            out.push(self.cursor.seek(row));
        }
        self.next_row = end.max(self.next_row);
        cnt
    }

    fn skip(&mut self, cnt: usize) {
        self.next_row = self.row_count.min(self.next_row + cnt);
    }

    fn remaining_items(&self) -> usize {
        self.row_count - self.next_row
    }
}

impl<T: PrimitiveFixedWidthEncode> DeltaBlock<T> {
    pub fn iter(&self) -> DeltaBlockIterator<'_, T> {
        DeltaBlockIterator::new(self)
    }

    /// Append every value of the block to `out`.
    pub fn decompress(&self, out: &mut Vec<T>) -> usize {
        self.iter().next_batch(None, out)
    }
}
