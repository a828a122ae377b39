// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use bitvec::field::BitField;
use bitvec::prelude::{BitVec, Lsb0};
use bytes::{Buf, BufMut};

use crate::storage::{StorageError, StorageResult};

/// Maximum width of a single packed code.
pub const MAX_CODE_BITS: u8 = 32;

/// A packed array of fixed-width unsigned codes, stored in 64-bit words.
///
/// ```plain
/// | code 0 (w bits) | code 1 (w bits) | ... | padding to a word boundary |
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct BitVector {
    bits: BitVec<u64, Lsb0>,
    width: u8,
    len: usize,
}

impl BitVector {
    /// Create a vector of `len` zero codes of `width` bits each.
    pub fn new(len: usize, width: u8) -> Self {
        assert!(
            (1..=MAX_CODE_BITS).contains(&width),
            "invalid code width {width}"
        );
        Self {
            bits: BitVec::repeat(false, len * width as usize),
            width,
            len,
        }
    }

    /// Bytes needed to store `len` codes of `width` bits, rounded up to a word.
    pub fn byte_size(len: usize, width: u8) -> usize {
        (len * width as usize).div_ceil(u64::BITS as usize) * std::mem::size_of::<u64>()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn get(&self, i: usize) -> u32 {
        debug_assert!(i < self.len, "index {i} out of {}", self.len);
        let w = self.width as usize;
        self.bits[i * w..(i + 1) * w].load_le::<u32>()
    }

    pub fn set(&mut self, i: usize, code: u32) {
        debug_assert!(i < self.len, "index {i} out of {}", self.len);
        debug_assert!(
            self.width == 32 || code >> self.width == 0,
            "code {code:#x} exceeds {} bits",
            self.width
        );
        let w = self.width as usize;
        self.bits[i * w..(i + 1) * w].store_le::<u32>(code);
    }

    /// Append the packed words to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        let words = Self::byte_size(self.len, self.width) / std::mem::size_of::<u64>();
        let raw = self.bits.as_raw_slice();
        for idx in 0..words {
            buf.put_u64_le(raw.get(idx).copied().unwrap_or(0));
        }
    }

    /// Read `len` codes of `width` bits from `buf`.
    pub fn decode(buf: &mut impl Buf, len: usize, width: u8) -> StorageResult<Self> {
        if !(1..=MAX_CODE_BITS).contains(&width) {
            return Err(StorageError::format(format!("invalid code width {width}")));
        }
        let size = Self::byte_size(len, width);
        if buf.remaining() < size {
            return Err(StorageError::format(format!(
                "expected {size} bytes of packed codes, found {}",
                buf.remaining()
            )));
        }
        let words = (0..size / std::mem::size_of::<u64>())
            .map(|_| buf.get_u64_le())
            .collect::<Vec<_>>();
        let mut bits = BitVec::from_vec(words);
        bits.truncate(len * width as usize);
        Ok(Self { bits, width, len })
    }
}

impl std::fmt::Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries((0..self.len).map(|i| self.get(i)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size() {
        assert_eq!(BitVector::byte_size(0, 9), 0);
        assert_eq!(BitVector::byte_size(5, 9), 8);
        assert_eq!(BitVector::byte_size(8, 8), 8);
        assert_eq!(BitVector::byte_size(9, 8), 16);
        assert_eq!(BitVector::byte_size(3, 32), 16);
    }

    #[test]
    fn test_get_set_across_words() {
        let mut codes = BitVector::new(20, 13);
        for i in 0..20 {
            codes.set(i, (i as u32 * 397) & 0x1fff);
        }
        for i in 0..20 {
            assert_eq!(codes.get(i), (i as u32 * 397) & 0x1fff);
        }
        // overwrite keeps neighbours intact
        codes.set(4, 0);
        assert_eq!(codes.get(3), 3 * 397);
        assert_eq!(codes.get(4), 0);
        assert_eq!(codes.get(5), 5 * 397);
    }

    #[test]
    fn test_full_width_codes() {
        let mut codes = BitVector::new(3, 32);
        codes.set(0, u32::MAX);
        codes.set(2, 0x8000_0001);
        assert_eq!(codes.get(0), u32::MAX);
        assert_eq!(codes.get(1), 0);
        assert_eq!(codes.get(2), 0x8000_0001);
    }

    #[test]
    fn test_encode_decode() {
        let mut codes = BitVector::new(11, 7);
        for i in 0..11 {
            codes.set(i, 127 - i as u32);
        }
        let mut buf = vec![];
        codes.encode(&mut buf);
        assert_eq!(buf.len(), BitVector::byte_size(11, 7));
        let decoded = BitVector::decode(&mut &buf[..], 11, 7).unwrap();
        assert_eq!(decoded, codes);
    }

    #[test]
    fn test_decode_short_buffer() {
        let buf = [0u8; 4];
        assert!(BitVector::decode(&mut &buf[..], 11, 7).is_err());
        assert!(BitVector::decode(&mut &buf[..], 1, 33).is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_out_of_bounds() {
        let codes = BitVector::new(4, 5);
        codes.get(4);
    }
}
