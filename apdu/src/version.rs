// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Application version APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, BAKING_APDU_CLA};

/// Application kind reported by the version APDU
pub const APP_KIND_BAKING: u8 = 0x01;

/// Fetch application version APDU
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct VersionReq;

impl ApduStatic for VersionReq {
    const CLA: u8 = BAKING_APDU_CLA;
    const INS: u8 = Instruction::Version as u8;
}

impl Encode for VersionReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for VersionReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self, 0))
    }
}

/// Application version response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   APP_KIND    |     MAJOR     |     MINOR     |     PATCH     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct VersionResp {
    pub kind: u8,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl VersionResp {
    pub fn new(kind: u8, major: u8, minor: u8, patch: u8) -> Self {
        Self {
            kind,
            major,
            minor,
            patch,
        }
    }
}
