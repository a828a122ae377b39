// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::block::MAX_CODE_BITS;
use super::{ChecksumType, StorageResult};

/// Default maximum number of rows covered by one block.
pub const DEFAULT_MAX_BLOCK_ROWS: usize = 1 << 16;

/// Options for `MosaicColumnBuilder` and the block codecs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicOptions {
    /// Maximum number of rows in one block
    pub max_block_rows: usize,

    /// Maximum width (including the sign bit) of one packed delta code
    pub max_code_bits: u8,

    /// Checksum type used by blocks
    pub checksum_type: ChecksumType,

    /// Whether using delta encoding
    pub is_delta: bool,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self {
            max_block_rows: DEFAULT_MAX_BLOCK_ROWS,
            max_code_bits: MAX_CODE_BITS,
            checksum_type: ChecksumType::Crc32,
            is_delta: true,
        }
    }
}

impl MosaicOptions {
    pub fn default_for_test() -> Self {
        Self {
            max_block_rows: 128,
            max_code_bits: MAX_CODE_BITS,
            checksum_type: ChecksumType::None,
            is_delta: true,
        }
    }

    /// Parse options from a JSON document. Missing fields take their default.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        Ok(options.sanitize())
    }

    /// Clamp values that the block layout cannot represent.
    pub fn sanitize(mut self) -> Self {
        if self.max_code_bits > MAX_CODE_BITS || self.max_code_bits < 2 {
            warn!(
                max_code_bits = self.max_code_bits,
                "max_code_bits out of range, using {}", MAX_CODE_BITS
            );
            self.max_code_bits = MAX_CODE_BITS;
        }
        if self.max_block_rows == 0 || self.max_block_rows > u32::MAX as usize {
            warn!(
                max_block_rows = self.max_block_rows,
                "max_block_rows out of range, using {}", DEFAULT_MAX_BLOCK_ROWS
            );
            self.max_block_rows = DEFAULT_MAX_BLOCK_ROWS;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let options =
            MosaicOptions::from_json(r#"{ "max_block_rows": 1024, "checksum_type": "none" }"#)
                .unwrap();
        assert_eq!(options.max_block_rows, 1024);
        assert_eq!(options.checksum_type, ChecksumType::None);
        assert_eq!(options.max_code_bits, MAX_CODE_BITS);
        assert!(options.is_delta);
    }

    #[test]
    fn test_sanitize() {
        let options = MosaicOptions::from_json(r#"{ "max_code_bits": 64, "max_block_rows": 0 }"#)
            .unwrap();
        assert_eq!(options.max_code_bits, MAX_CODE_BITS);
        assert_eq!(options.max_block_rows, DEFAULT_MAX_BLOCK_ROWS);
    }

    #[test]
    fn test_from_bad_json() {
        assert!(matches!(
            MosaicOptions::from_json(r#"{ "max_block_rows": "many" }"#),
            Err(crate::storage::StorageError::JsonDecode(_))
        ));
    }
}
