// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use thiserror::Error;

use super::block::Strategy;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{0} strategy not applicable: {1}")]
    NotApplicable(Strategy, String),
    #[error("format error: {0}")]
    Format(String),
    #[error("invalid checksum: found {0}, expected {1}")]
    Checksum(u64, u64),
    #[error("invalid operator: {0}")]
    InvalidOperator(String),
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_applicable(strategy: Strategy, reason: impl ToString) -> Self {
        StorageError::NotApplicable(strategy, reason.to_string())
    }

    pub fn format(message: impl ToString) -> Self {
        StorageError::Format(message.to_string())
    }

    pub fn checksum(found: u64, expected: u64) -> Self {
        StorageError::Checksum(found, expected)
    }

    /// Whether the caller may retry with another strategy or store the chunk raw.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StorageError::NotApplicable(..))
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
