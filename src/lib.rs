// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

//! Mosaic is a block-oriented compression engine for columns of fixed-width
//! primitives. Values are delta coded when a chunk allows it and stored raw
//! otherwise, and every read path works directly on the compressed blocks.

#![deny(unused_must_use)]

pub mod storage;

pub use self::storage::{
    Candidates, MosaicColumn, MosaicColumnBuilder, MosaicOptions, Predicate, RangePredicate,
    StorageError, StorageResult, Strategy, ThetaOp,
};
