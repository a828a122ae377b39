// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use super::DeltaBlock;
use crate::storage::{Candidates, PrimitiveFixedWidthEncode};

impl<T: PrimitiveFixedWidthEncode> DeltaBlock<T> {
    /// Append the value of every candidate position within this block to `out`,
    /// in candidate order. Returns the number of values appended.
    pub fn project(&self, cands: &Candidates<'_>, out: &mut Vec<T>) -> usize {
        let start = self.start();
        let mut cursor = self.cursor();
        let before = out.len();
        out.extend(
            cands
                .within(self.range())
                .map(|pos| cursor.seek(pos - start)),
        );
        out.len() - before
    }
}
