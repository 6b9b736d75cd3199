// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Wire primitives for Tezos binary encodings
//!
//! Fixed width integers are big-endian. Arbitrary precision naturals
//! (fees, counters, limits, amounts) use the Zarith encoding, seven value
//! bits per byte, least significant group first, with the high bit
//! flagging continuation.

use byteorder::{BigEndian, ByteOrder};

use crate::engine::Error;

/// Levels with either of the top two bits set are not valid
const LEVEL_INVALID_MASK: u32 = 0xC000_0000;

/// Check whether a block level is within the valid range
pub const fn is_valid_level(level: u32) -> bool {
    level & LEVEL_INVALID_MASK == 0
}

/// Read a `u8` at `offset`
pub fn read_u8(buff: &[u8], offset: usize) -> Result<u8, Error> {
    buff.get(offset).copied().ok_or(Error::Incomplete)
}

/// Read a big-endian `u16` at `offset`
pub fn read_u16_be(buff: &[u8], offset: usize) -> Result<u16, Error> {
    match buff.get(offset..offset + 2) {
        Some(b) => Ok(BigEndian::read_u16(b)),
        None => Err(Error::Incomplete),
    }
}

/// Read a big-endian `u32` at `offset`
pub fn read_u32_be(buff: &[u8], offset: usize) -> Result<u32, Error> {
    match buff.get(offset..offset + 4) {
        Some(b) => Ok(BigEndian::read_u32(b)),
        None => Err(Error::Incomplete),
    }
}

/// Resumable Zarith decoder, accepts one byte at a time so values may
/// be split across packet boundaries
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct ZarithDecoder {
    value: u64,
    shift: u32,
    count: u8,
}

impl ZarithDecoder {
    /// Create a new decoder
    pub const fn new() -> Self {
        Self {
            value: 0,
            shift: 0,
            count: 0,
        }
    }

    /// Push a byte, returning the decoded value once complete
    pub fn push(&mut self, b: u8) -> Result<Option<u64>, Error> {
        // Only a single value bit remains at shift 63
        if self.shift > 63 || (self.shift == 63 && b != 1) {
            return Err(Error::Overflow);
        }

        self.value |= ((b & 0x7f) as u64) << self.shift;
        self.shift += 7;
        self.count += 1;

        match b & 0x80 {
            0 => Ok(Some(self.value)),
            _ => Ok(None),
        }
    }

    /// Number of bytes consumed so far
    pub fn count(&self) -> usize {
        self.count as usize
    }

    /// Check whether the decoder is part way through a value
    pub fn is_partial(&self) -> bool {
        self.count > 0
    }
}
