// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

use super::{DeltaBlock, DeltaCursor};
use crate::storage::{CandidateIter, Candidates, Predicate, PrimitiveFixedWidthEncode};

/// Positions of a delta block whose reconstructed value satisfies a predicate.
///
/// Deltas are replayed sequentially up to every candidate, so the scan costs the
/// length of the block however sparse the candidates are. The iterator cannot be
/// rewound; select again to restart from the block start.
pub struct DeltaSelectIter<'a, T: PrimitiveFixedWidthEncode, P> {
    cursor: DeltaCursor<'a, T>,
    cands: CandidateIter<'a>,
    start: usize,
    pred: P,
}

impl<T: PrimitiveFixedWidthEncode, P: Predicate<T>> Iterator for DeltaSelectIter<'_, T, P> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        for pos in self.cands.by_ref() {
            let value = self.cursor.seek(pos - self.start);
            if self.pred.eval(&value) {
                return Some(pos);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.cands.size_hint().1)
    }
}

impl<T: PrimitiveFixedWidthEncode> DeltaBlock<T> {
    /// Matching candidate positions within this block, in ascending order.
    pub fn select<'a, P: Predicate<T>>(
        &'a self,
        cands: &Candidates<'a>,
        pred: P,
    ) -> DeltaSelectIter<'a, T, P> {
        DeltaSelectIter {
            cursor: self.cursor(),
            cands: cands.within(self.range()),
            start: self.start(),
            pred,
        }
    }
}
