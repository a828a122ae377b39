// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

//! Columns as a gap-free sequence of blocks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::block::{
    compress_delta, estimate_delta, DeltaBlock, MosaicBlock, RawBlock, Strategy,
    BLOCK_HEADER_SIZE,
};
use super::{
    Candidates, MosaicOptions, Predicate, PrimitiveFixedWidthEncode, StorageError, StorageResult,
};

/// Location and coverage of one block in a column image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub strategy: Strategy,
    /// Offset of the block header in the column image.
    pub offset: u64,
    /// Length of header and body.
    pub length: u64,
    pub first_rowid: u64,
    pub row_count: u64,
}

/// One row of [`MosaicColumn::layout`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockLayout {
    pub strategy: Strategy,
    pub row_count: u64,
    /// Uncompressed bytes covered by the block.
    pub input: u64,
    /// Bytes of the block image.
    pub output: u64,
    pub properties: String,
}

/// Builds a column image, choosing a strategy for every chunk.
pub struct MosaicColumnBuilder<T: PrimitiveFixedWidthEncode> {
    data: Vec<u8>,
    index: Vec<BlockIndex>,
    options: MosaicOptions,

    /// Count of rows which has been sent to builder
    row_count: usize,

    /// Rows waiting to be stored as one raw block
    pending_raw: Vec<T>,
}

impl<T: PrimitiveFixedWidthEncode> MosaicColumnBuilder<T> {
    pub fn new(options: MosaicOptions) -> Self {
        Self {
            data: vec![],
            index: vec![],
            options: options.sanitize(),
            row_count: 0,
            pending_raw: vec![],
        }
    }

    /// Compress `values` and append them to the column.
    pub fn append(&mut self, values: &[T]) {
        let mut pos = 0;
        while pos < values.len() {
            if let Some(block) = self.try_delta(&values[pos..]) {
                self.flush_raw();
                pos += block.count();
                self.finish_block(MosaicBlock::Delta(block));
                continue;
            }
            self.pending_raw.push(values[pos]);
            pos += 1;
            if self.pending_raw.len() >= self.options.max_block_rows {
                self.flush_raw();
            }
        }
    }

    /// A delta block over a prefix of `src`, if delta coding applies and beats a
    /// raw block of the same rows.
    fn try_delta(&self, src: &[T]) -> Option<DeltaBlock<T>> {
        if !self.options.is_delta {
            return None;
        }
        let start = self.row_count + self.pending_raw.len();
        let estimate = match estimate_delta(src, &self.options) {
            Ok(estimate) => estimate,
            Err(err) => {
                trace!(start, %err, "delta not applicable");
                return None;
            }
        };
        let raw_size = BLOCK_HEADER_SIZE + RawBlock::<T>::body_size(estimate.count);
        if estimate.encoded_size() >= raw_size {
            return None;
        }
        match compress_delta(&estimate, src, start) {
            Ok(block) => Some(block),
            Err(err) => {
                warn!(start, %err, "delta estimate rejected by encoder");
                None
            }
        }
    }

    fn flush_raw(&mut self) {
        if self.pending_raw.is_empty() {
            return;
        }
        let block = RawBlock::new(&self.pending_raw, self.row_count);
        self.pending_raw.clear();
        self.finish_block(MosaicBlock::Raw(block));
    }

    fn finish_block(&mut self, block: MosaicBlock<T>) {
        debug_assert_eq!(block.start(), self.row_count);
        let offset = self.data.len();
        block.encode(self.options.checksum_type, &mut self.data);
        let entry = BlockIndex {
            strategy: block.strategy(),
            offset: offset as u64,
            length: (self.data.len() - offset) as u64,
            first_rowid: self.row_count as u64,
            row_count: block.count() as u64,
        };
        debug!(
            strategy = %entry.strategy,
            first_rowid = entry.first_rowid,
            row_count = entry.row_count,
            length = entry.length,
            "finish block"
        );
        self.row_count += block.count();
        self.index.push(entry);
    }

    /// Flush pending rows and return the block index and the column image.
    pub fn finish(mut self) -> (Vec<BlockIndex>, Vec<u8>) {
        self.flush_raw();
        (self.index, self.data)
    }
}

/// An opened, immutable column. Safe to read from any number of threads.
#[derive(Debug)]
pub struct MosaicColumn<T: PrimitiveFixedWidthEncode> {
    index: Vec<BlockIndex>,
    blocks: Vec<MosaicBlock<T>>,
    row_count: usize,
}

impl<T: PrimitiveFixedWidthEncode> MosaicColumn<T> {
    /// Decode every block of a column image, verifying checksums and coverage.
    pub fn open(index: Vec<BlockIndex>, data: impl Into<Bytes>) -> StorageResult<Self> {
        let data: Bytes = data.into();
        let mut blocks = Vec::with_capacity(index.len());
        let mut row_count = 0;
        for entry in &index {
            if entry.first_rowid != row_count as u64 {
                return Err(StorageError::format(format!(
                    "block at row {} leaves a gap after row {row_count}",
                    entry.first_rowid
                )));
            }
            let begin = entry.offset as usize;
            let end = begin.saturating_add(entry.length as usize);
            if end > data.len() {
                return Err(StorageError::format(format!(
                    "block [{begin}, {end}) exceeds column of {} bytes",
                    data.len()
                )));
            }
            let block = MosaicBlock::decode(&data[begin..end], row_count).inspect_err(|err| {
                if matches!(err, StorageError::Checksum(..)) {
                    warn!(first_rowid = entry.first_rowid, %err, "corrupted block");
                }
            })?;
            if block.strategy() != entry.strategy || block.count() as u64 != entry.row_count {
                return Err(StorageError::format(format!(
                    "block at row {} does not match its index entry",
                    entry.first_rowid
                )));
            }
            row_count += block.count();
            blocks.push(block);
        }
        Ok(Self {
            index,
            blocks,
            row_count,
        })
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn blocks(&self) -> &[MosaicBlock<T>] {
        &self.blocks
    }

    pub fn index(&self) -> &[BlockIndex] {
        &self.index
    }

    pub fn decompress(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.row_count);
        for block in &self.blocks {
            block.decompress(&mut out);
        }
        out
    }

    /// Positions whose value satisfies `pred`, in ascending order.
    pub fn select(&self, cands: &Candidates<'_>, pred: impl Predicate<T>) -> Vec<usize> {
        let mut out = vec![];
        for block in &self.blocks {
            out.extend(block.select(cands, |value: &T| pred.eval(value)));
        }
        out
    }

    pub fn project(&self, cands: &Candidates<'_>) -> Vec<T> {
        let mut out = vec![];
        for block in &self.blocks {
            block.project(cands, &mut out);
        }
        out
    }

    pub fn join(
        &self,
        cands: &Candidates<'_>,
        right: &[T],
        right_cands: &Candidates<'_>,
        nil_matches: bool,
    ) -> Vec<(usize, usize)> {
        let mut out = vec![];
        for block in &self.blocks {
            block.join(cands, right, right_cands, nil_matches, &mut out);
        }
        out
    }

    pub fn layout(&self) -> Vec<BlockLayout> {
        self.index
            .iter()
            .zip(&self.blocks)
            .map(|(entry, block)| BlockLayout {
                strategy: entry.strategy,
                row_count: entry.row_count,
                input: entry.row_count * T::WIDTH as u64,
                output: entry.length,
                properties: match block {
                    MosaicBlock::Delta(block) => format!("bit_width={}", block.bit_width()),
                    MosaicBlock::Raw(_) => String::new(),
                },
            })
            .collect()
    }

    /// Uncompressed bytes over bytes of the column image.
    pub fn compression_factor(&self) -> f64 {
        let output: u64 = self.index.iter().map(|entry| entry.length).sum();
        if output == 0 {
            return 1.0;
        }
        (self.row_count * T::WIDTH) as f64 / output as f64
    }
}
