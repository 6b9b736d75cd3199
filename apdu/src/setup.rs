// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Baking setup and watermark reset APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, BAKING_APDU_CLA};
use crate::{helpers::*, path::Bip32Path, types::DerivationType};

/// Setup request APDU, authorizes a baking key and configures the main
/// chain and starting watermarks in a single operator-approved step.
///
/// The key curve is carried in `P2`.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         MAIN_CHAIN_ID                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        MAIN_HWM_LEVEL                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        TEST_HWM_LEVEL                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    PATH_LEN   |                                               /
/// +-+-+-+-+-+-+-+-+     PATH COMPONENTS (PATH_LEN * u32, BE)      /
/// /                                                               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct SetupReq {
    /// Key curve (encoded in `P2`)
    pub curve: DerivationType,
    pub main_chain_id: u32,
    pub main_level: u32,
    pub test_level: u32,
    pub path: Bip32Path,
}

impl ApduStatic for SetupReq {
    const CLA: u8 = BAKING_APDU_CLA;
    const INS: u8 = Instruction::Setup as u8;

    fn p2(&self) -> u8 {
        self.curve as u8
    }
}

impl Encode for SetupReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(12 + self.path.encode_len()?)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let mut index = 0;

        index += be_u32::enc(&self.main_chain_id, &mut buff[index..])?;
        index += be_u32::enc(&self.main_level, &mut buff[index..])?;
        index += be_u32::enc(&self.test_level, &mut buff[index..])?;
        index += self.path.encode(&mut buff[index..])?;

        Ok(index)
    }
}

impl SetupReq {
    /// Decode request payload, with the curve recovered from `P2`
    pub fn decode_with_p2(p2: u8, buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let mut index = 0;

        let (curve, _) = DerivationType::decode_owned(&[p2])?;

        let (main_chain_id, n) = be_u32::dec(&buff[index..])?;
        index += n;
        let (main_level, n) = be_u32::dec(&buff[index..])?;
        index += n;
        let (test_level, n) = be_u32::dec(&buff[index..])?;
        index += n;
        let (path, n) = Bip32Path::decode_owned(&buff[index..])?;
        index += n;

        Ok((
            Self {
                curve,
                main_chain_id,
                main_level,
                test_level,
                path,
            },
            index,
        ))
    }
}

/// Reset request APDU, sets both chain watermarks to `LEVEL`
/// with round zero following operator approval.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             LEVEL                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ResetReq {
    #[encdec(with = "be_u32")]
    pub level: u32,
}

impl ResetReq {
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

impl ApduStatic for ResetReq {
    const CLA: u8 = BAKING_APDU_CLA;
    const INS: u8 = Instruction::Reset as u8;
}
