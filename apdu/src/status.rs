// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Response status words

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

/// Two-byte status word terminating every response APDU
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusWord {
    /// Success
    Ok = 0x9000,
    /// Invalid `P1` or `P2`
    WrongParam = 0x6b00,
    /// Payload length does not match the instruction encoding
    WrongLength = 0x6c00,
    /// Unknown instruction
    InvalidIns = 0x6d00,
    /// Payload length invalid for instruction, or out of sequence packet
    WrongLengthForIns = 0x917e,
    /// Rejected by the operator
    Reject = 0x6985,
    /// Payload does not parse
    ParseError = 0x9405,
    /// Referenced data (eg. authorized key) not set
    ReferencedDataNotFound = 0x6a88,
    /// Payload values are invalid
    WrongValues = 0x6a80,
    /// Security conditions not satisfied
    Security = 0x6982,
    /// Unknown class
    Class = 0x6e00,
    /// Storage or buffer failure
    MemoryError = 0x9200,
    /// Unknown / unclassified failure
    Unknown = 0x9001,
}

impl StatusWord {
    /// Encode status word as trailing bytes of a response APDU
    pub const fn to_bytes(&self) -> [u8; 2] {
        (*self as u16).to_be_bytes()
    }

    /// Check whether this status indicates success
    pub const fn is_ok(&self) -> bool {
        matches!(self, StatusWord::Ok)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> u16 {
        sw as u16
    }
}
