// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use std::ops::Range;

/// Row positions a read path should visit, in ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Candidates<'a> {
    /// Every position in a contiguous range.
    Dense(Range<usize>),
    /// An arbitrary ascending list of positions.
    List(&'a [usize]),
}

impl<'a> Candidates<'a> {
    /// All positions.
    pub fn all() -> Self {
        Candidates::Dense(0..usize::MAX)
    }

    /// Candidates that fall inside `range`.
    pub fn within(&self, range: Range<usize>) -> CandidateIter<'a> {
        match self {
            Candidates::Dense(dense) => {
                let start = dense.start.max(range.start);
                let end = dense.end.min(range.end).max(start);
                CandidateIter::Dense(start..end)
            }
            Candidates::List(list) => {
                debug_assert!(list.windows(2).all(|w| w[0] <= w[1]));
                let lo = list.partition_point(|&pos| pos < range.start);
                let hi = list.partition_point(|&pos| pos < range.end).max(lo);
                CandidateIter::List(list[lo..hi].iter())
            }
        }
    }
}

impl From<Range<usize>> for Candidates<'_> {
    fn from(range: Range<usize>) -> Self {
        Candidates::Dense(range)
    }
}

impl<'a> From<&'a [usize]> for Candidates<'a> {
    fn from(list: &'a [usize]) -> Self {
        Candidates::List(list)
    }
}

impl<'a> From<&'a Vec<usize>> for Candidates<'a> {
    fn from(list: &'a Vec<usize>) -> Self {
        Candidates::List(list)
    }
}

#[derive(Clone, Debug)]
pub enum CandidateIter<'a> {
    Dense(Range<usize>),
    List(std::slice::Iter<'a, usize>),
}

impl Iterator for CandidateIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            CandidateIter::Dense(range) => range.next(),
            CandidateIter::List(iter) => iter.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            CandidateIter::Dense(range) => range.size_hint(),
            CandidateIter::List(iter) => iter.size_hint(),
        }
    }
}
