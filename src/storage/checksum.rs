// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use serde::{Deserialize, Serialize};

use super::{StorageError, StorageResult};

/// Checksum algorithm recorded in every block header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    None,
    #[default]
    Crc32,
}

impl From<ChecksumType> for i32 {
    fn from(ty: ChecksumType) -> i32 {
        match ty {
            ChecksumType::None => 0,
            ChecksumType::Crc32 => 1,
        }
    }
}

impl TryFrom<i32> for ChecksumType {
    type Error = StorageError;

    fn try_from(value: i32) -> StorageResult<Self> {
        match value {
            0 => Ok(ChecksumType::None),
            1 => Ok(ChecksumType::Crc32),
            _ => Err(StorageError::format(format!("unknown checksum type {value}"))),
        }
    }
}

pub fn build_checksum(checksum_type: ChecksumType, block_data: &[u8]) -> u64 {
    match checksum_type {
        ChecksumType::None => 0,
        ChecksumType::Crc32 => crc32fast::hash(block_data) as u64,
    }
}

pub fn verify_checksum(
    checksum_type: ChecksumType,
    block_data: &[u8],
    checksum: u64,
) -> StorageResult<()> {
    let found = build_checksum(checksum_type, block_data);
    if found != checksum {
        return Err(StorageError::checksum(found, checksum));
    }
    Ok(())
}
