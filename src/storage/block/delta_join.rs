// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use super::{probe_right, DeltaBlock};
use crate::storage::{Candidates, PrimitiveFixedWidthEncode};

impl<T: PrimitiveFixedWidthEncode> DeltaBlock<T> {
    /// Nested-loop equi-join of this block against an uncompressed `right` array.
    ///
    /// Every candidate on the left is reconstructed once. Pairs of
    /// `(left position, right index)` are appended to `out`; returns the number of
    /// pairs appended. Nulls only join each other, and only if `nil_matches`.
    pub fn join(
        &self,
        cands: &Candidates<'_>,
        right: &[T],
        right_cands: &Candidates<'_>,
        nil_matches: bool,
        out: &mut Vec<(usize, usize)>,
    ) -> usize {
        let start = self.start();
        let mut cursor = self.cursor();
        let mut cnt = 0;
        for pos in cands.within(self.range()) {
            let value = cursor.seek(pos - start);
            if value.is_null() && !nil_matches {
                continue;
            }
            cnt += probe_right(&value, pos, right, right_cands, nil_matches, out);
        }
        cnt
    }
}
