// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Key-bound HMAC APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, BAKING_APDU_CLA};
use crate::{helpers::*, path::Bip32Path, types::DerivationType};

/// HMAC output length
pub const HMAC_LEN: usize = 32;

/// HMAC request APDU, computes an HMAC over `MESSAGE` with a key derived
/// from a signature by the key at `PATH`. The key curve is carried in `P2`.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    PATH_LEN   |                                               /
/// +-+-+-+-+-+-+-+-+     PATH COMPONENTS (PATH_LEN * u32, BE)      /
/// /                                                               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                 MESSAGE (remainder of payload)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct HmacReq<'a> {
    pub curve: DerivationType,
    pub path: Bip32Path,
    pub message: &'a [u8],
}

impl<'a> HmacReq<'a> {
    pub fn new(curve: DerivationType, path: Bip32Path, message: &'a [u8]) -> Self {
        Self {
            curve,
            path,
            message,
        }
    }

    /// Decode request payload, with the curve recovered from `P2`
    pub fn decode_with_p2(p2: u8, buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let (curve, _) = DerivationType::decode_owned(&[p2])?;
        let (path, n) = Bip32Path::decode_owned(buff)?;

        Ok((
            Self {
                curve,
                path,
                message: &buff[n..],
            },
            buff.len(),
        ))
    }
}

impl<'a> ApduStatic for HmacReq<'a> {
    const CLA: u8 = BAKING_APDU_CLA;
    const INS: u8 = Instruction::Hmac as u8;

    fn p2(&self) -> u8 {
        self.curve as u8
    }
}

impl<'a> Encode for HmacReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.path.encode_len()? + self.message.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut index = self.path.encode(buff)?;
        buff[index..][..self.message.len()].copy_from_slice(self.message);
        index += self.message.len();

        Ok(index)
    }
}

/// HMAC response APDU
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct HmacResp {
    #[encdec(with = "arr")]
    pub hmac: [u8; HMAC_LEN],
}
