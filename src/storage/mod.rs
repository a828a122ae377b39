// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

//! Mosaic column storage.
//!
//! A column is split into blocks. Each block is compressed by one [`Strategy`]
//! and can be read back without decompressing the others.

mod block;
mod candidates;
mod checksum;
mod column;
mod encode;
mod error;
mod options;
mod predicate;

pub use self::block::*;
pub use self::candidates::*;
pub use self::checksum::*;
pub use self::column::*;
pub use self::encode::*;
pub use self::error::*;
pub use self::options::*;
pub use self::predicate::*;
