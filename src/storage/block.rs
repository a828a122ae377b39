// Copyright 2024 RisingLight Project Authors. Licensed under Apache-2.0.

//! Mosaic block builders and iterators
//!
//! [`MosaicBlock`] is the minimum managing unit of a compressed column. Every
//! block is produced by one [`Strategy`] and is immutable once built.

mod bit_vector;
mod delta_block;
mod delta_block_builder;
mod delta_block_iterator;
mod delta_estimator;
mod delta_join;
mod delta_project;
mod delta_select;
mod raw_block;

use std::fmt;

pub use bit_vector::*;
use bytes::{Buf, BufMut};
pub use delta_block::*;
pub use delta_block_builder::*;
pub use delta_block_iterator::*;
pub use delta_estimator::*;
pub use delta_select::*;
use itertools::Either;
pub use raw_block::*;
use serde::{Deserialize, Serialize};

use super::checksum::{build_checksum, verify_checksum};
use super::{
    Candidates, ChecksumType, Predicate, PrimitiveFixedWidthEncode, StorageError, StorageResult,
};

/// Compression strategy of a block, stored as the block tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Raw,
    Delta,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Raw => write!(f, "raw"),
            Strategy::Delta => write!(f, "delta"),
        }
    }
}

impl From<Strategy> for i32 {
    fn from(strategy: Strategy) -> i32 {
        match strategy {
            Strategy::Raw => 0,
            Strategy::Delta => 1,
        }
    }
}

impl TryFrom<i32> for Strategy {
    type Error = StorageError;

    fn try_from(tag: i32) -> StorageResult<Self> {
        match tag {
            0 => Ok(Strategy::Raw),
            1 => Ok(Strategy::Delta),
            _ => Err(StorageError::format(format!("unknown strategy tag {tag}"))),
        }
    }
}

/// Header in front of every block body.
///
/// ```plain
/// | strategy | cksum_type | cksum  |
/// |    4B    |     4B     |   8B   |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub strategy: Strategy,
    pub checksum_type: ChecksumType,
    pub checksum: u64,
}

pub const BLOCK_HEADER_SIZE: usize = 4 + 4 + 8;

impl BlockHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.strategy.into());
        buf.put_i32(self.checksum_type.into());
        buf.put_u64(self.checksum);
    }

    pub fn decode(buf: &mut impl Buf) -> StorageResult<Self> {
        if buf.remaining() < BLOCK_HEADER_SIZE {
            return Err(StorageError::format("expected 16 bytes of block header"));
        }
        let strategy = Strategy::try_from(buf.get_i32())?;
        let checksum_type = ChecksumType::try_from(buf.get_i32())?;
        let checksum = buf.get_u64();
        Ok(Self {
            strategy,
            checksum_type,
            checksum,
        })
    }
}

/// Round `size` up to the next multiple of the word size.
pub fn word_aligned(size: usize) -> usize {
    size.next_multiple_of(std::mem::size_of::<u64>())
}

/// An iterator on a block. This iterator requires the block being pre-loaded in memory.
pub trait BlockIterator<T> {
    /// Get a batch from the block. A `0` return value means that this batch contains no
    /// element. By using `expected_size`, developers can get NO MORE THAN the
    /// `expected_size` items.
    fn next_batch(&mut self, expected_size: Option<usize>, out: &mut Vec<T>) -> usize;

    /// Skip `cnt` items.
    fn skip(&mut self, cnt: usize);

    /// Number of items remaining in this block
    fn remaining_items(&self) -> usize;
}

/// Emit `(left_pos, right_pos)` for every right candidate equal to `value`.
pub(crate) fn probe_right<T: PrimitiveFixedWidthEncode>(
    value: &T,
    left_pos: usize,
    right: &[T],
    right_cands: &Candidates<'_>,
    nil_matches: bool,
    out: &mut Vec<(usize, usize)>,
) -> usize {
    let value_is_null = value.is_null();
    let mut cnt = 0;
    for right_pos in right_cands.within(0..right.len()) {
        let other = &right[right_pos];
        let matched = match (value_is_null, other.is_null()) {
            (true, true) => nil_matches,
            (false, false) => value == other,
            _ => false,
        };
        if matched {
            out.push((left_pos, right_pos));
            cnt += 1;
        }
    }
    cnt
}

/// A block produced by any of the strategies.
#[derive(Clone, Debug, PartialEq)]
pub enum MosaicBlock<T: PrimitiveFixedWidthEncode> {
    Raw(RawBlock<T>),
    Delta(DeltaBlock<T>),
}

impl<T: PrimitiveFixedWidthEncode> MosaicBlock<T> {
    pub fn strategy(&self) -> Strategy {
        match self {
            MosaicBlock::Raw(_) => Strategy::Raw,
            MosaicBlock::Delta(_) => Strategy::Delta,
        }
    }

    pub fn start(&self) -> usize {
        match self {
            MosaicBlock::Raw(block) => block.start(),
            MosaicBlock::Delta(block) => block.start(),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            MosaicBlock::Raw(block) => block.count(),
            MosaicBlock::Delta(block) => block.count(),
        }
    }

    /// Size of the block body, excluding the header.
    pub fn body_size(&self) -> usize {
        match self {
            MosaicBlock::Raw(block) => RawBlock::<T>::body_size(block.count()),
            MosaicBlock::Delta(block) => {
                DeltaBlock::<T>::body_size(block.count(), block.bit_width())
            }
        }
    }

    pub fn decompress(&self, out: &mut Vec<T>) -> usize {
        match self {
            MosaicBlock::Raw(block) => block.decompress(out),
            MosaicBlock::Delta(block) => block.decompress(out),
        }
    }

    pub fn select<'a, P: Predicate<T> + 'a>(
        &'a self,
        cands: &Candidates<'a>,
        pred: P,
    ) -> impl Iterator<Item = usize> + 'a {
        match self {
            MosaicBlock::Raw(block) => Either::Left(block.select(cands, pred)),
            MosaicBlock::Delta(block) => Either::Right(block.select(cands, pred)),
        }
    }

    pub fn project(&self, cands: &Candidates<'_>, out: &mut Vec<T>) -> usize {
        match self {
            MosaicBlock::Raw(block) => block.project(cands, out),
            MosaicBlock::Delta(block) => block.project(cands, out),
        }
    }

    pub fn join(
        &self,
        cands: &Candidates<'_>,
        right: &[T],
        right_cands: &Candidates<'_>,
        nil_matches: bool,
        out: &mut Vec<(usize, usize)>,
    ) -> usize {
        match self {
            MosaicBlock::Raw(block) => block.join(cands, right, right_cands, nil_matches, out),
            MosaicBlock::Delta(block) => block.join(cands, right, right_cands, nil_matches, out),
        }
    }

    /// Append header and body to `buf`.
    pub fn encode(&self, checksum_type: ChecksumType, buf: &mut Vec<u8>) {
        let mut body = Vec::with_capacity(self.body_size());
        match self {
            MosaicBlock::Raw(block) => block.encode(&mut body),
            MosaicBlock::Delta(block) => block.encode(&mut body),
        }
        debug_assert_eq!(body.len(), self.body_size());
        BlockHeader {
            strategy: self.strategy(),
            checksum_type,
            checksum: build_checksum(checksum_type, &body),
        }
        .encode(buf);
        buf.extend_from_slice(&body);
    }

    /// Decode a block image (header and body) whose first row is `start`.
    pub fn decode(mut data: &[u8], start: usize) -> StorageResult<Self> {
        let header = BlockHeader::decode(&mut data)?;
        verify_checksum(header.checksum_type, data, header.checksum)?;
        let block = match header.strategy {
            Strategy::Raw => MosaicBlock::Raw(RawBlock::decode(&mut data, start)?),
            Strategy::Delta => MosaicBlock::Delta(DeltaBlock::decode(&mut data, start)?),
        };
        if data.has_remaining() {
            return Err(StorageError::format(format!(
                "{} trailing bytes after {} block",
                data.remaining(),
                header.strategy
            )));
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = BlockHeader {
            strategy: Strategy::Delta,
            checksum_type: ChecksumType::Crc32,
            checksum: 0xdead_beef,
        };
        let mut buf = vec![];
        header.encode(&mut buf);
        assert_eq!(buf.len(), BLOCK_HEADER_SIZE);
        assert_eq!(BlockHeader::decode(&mut &buf[..]).unwrap(), header);
    }

    #[test]
    fn test_header_unknown_strategy() {
        let mut buf = vec![];
        buf.put_i32(9);
        buf.put_i32(0);
        buf.put_u64(0);
        assert!(matches!(
            BlockHeader::decode(&mut &buf[..]),
            Err(StorageError::Format(_))
        ));
        assert!(BlockHeader::decode(&mut &buf[..4]).is_err());
    }

    #[test]
    fn test_word_aligned() {
        assert_eq!(word_aligned(0), 0);
        assert_eq!(word_aligned(1), 8);
        assert_eq!(word_aligned(16), 16);
        assert_eq!(word_aligned(17), 24);
    }

    #[test]
    fn test_block_image_round_trip() {
        let values = [100, 103, 99, 99, 250];
        let estimate = estimate_delta(&values, &crate::storage::MosaicOptions::default()).unwrap();
        let block = MosaicBlock::Delta(compress_delta(&estimate, &values, 10).unwrap());
        let mut buf = vec![];
        block.encode(ChecksumType::Crc32, &mut buf);
        assert_eq!(buf.len(), BLOCK_HEADER_SIZE + block.body_size());
        assert_eq!(MosaicBlock::<i32>::decode(&buf, 10).unwrap(), block);

        // flip one bit of the payload
        let last = buf.len() - 1;
        buf[last] ^= 1;
        assert!(matches!(
            MosaicBlock::<i32>::decode(&buf, 10),
            Err(StorageError::Checksum(..))
        ));
    }

    #[test]
    fn test_probe_right() {
        let right = [1, i32::NULL, 1, 2];
        let mut out = vec![];
        assert_eq!(probe_right(&1, 7, &right, &Candidates::all(), false, &mut out), 2);
        assert_eq!(out, vec![(7, 0), (7, 2)]);

        out.clear();
        assert_eq!(probe_right(&i32::NULL, 3, &right, &Candidates::all(), false, &mut out), 0);
        assert_eq!(probe_right(&i32::NULL, 3, &right, &Candidates::all(), true, &mut out), 1);
        assert_eq!(out, vec![(3, 1)]);

        out.clear();
        let cands = [2, 3];
        probe_right(&1, 0, &right, &Candidates::from(&cands[..]), false, &mut out);
        assert_eq!(out, vec![(0, 2)]);
    }
}
