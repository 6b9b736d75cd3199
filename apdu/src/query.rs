// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Authorized key and high watermark query APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, BAKING_APDU_CLA};
use crate::{helpers::*, path::Bip32Path, types::DerivationType};

/// Helper macro for requests without payload, `P1` or `P2`
macro_rules! empty_req {
    ($(#[$m:meta])* $name:ident, $ins:expr) => {
        $(#[$m])*
        #[derive(Copy, Clone, PartialEq, Debug, Default)]
        pub struct $name;

        impl ApduStatic for $name {
            const CLA: u8 = BAKING_APDU_CLA;
            const INS: u8 = $ins as u8;
        }

        impl Encode for $name {
            type Error = ApduError;

            fn encode_len(&self) -> Result<usize, Self::Error> {
                Ok(0)
            }

            fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
                Ok(0)
            }
        }

        impl DecodeOwned for $name {
            type Output = Self;

            type Error = ApduError;

            fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
                Ok((Self, 0))
            }
        }
    };
}

empty_req!(
    /// Query authorized key path, responds with [AuthKeyResp]
    QueryAuthKeyReq,
    Instruction::QueryAuthKey
);

empty_req!(
    /// Query authorized key path and curve, responds with [AuthKeyWithCurveResp]
    QueryAuthKeyWithCurveReq,
    Instruction::QueryAuthKeyWithCurve
);

empty_req!(
    /// Query main chain high watermark, responds with [MainHwmResp]
    QueryMainHwmReq,
    Instruction::QueryMainHwm
);

empty_req!(
    /// Query main and test chain high watermarks, responds with [AllHwmResp]
    QueryAllHwmReq,
    Instruction::QueryAllHwm
);

empty_req!(
    /// Clear the authorized baking key, responds with an empty payload
    DeauthorizeReq,
    Instruction::Deauthorize
);

/// Authorized key response APDU
///
/// An empty path (`PATH_LEN = 0`) indicates no key is authorized.
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
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct AuthKeyResp {
    pub path: Bip32Path,
}

impl Encode for AuthKeyResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.path.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.path.encode(buff)
    }
}

impl DecodeOwned for AuthKeyResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        match buff.first() {
            None => Err(ApduError::InvalidLength),
            Some(0) => Ok((
                Self {
                    path: Bip32Path::new(),
                },
                1,
            )),
            Some(_) => Bip32Path::decode_owned(buff).map(|(path, n)| (Self { path }, n)),
        }
    }
}

/// Authorized key with curve response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     CURVE     |    PATH_LEN   |                               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               /
/// /               PATH COMPONENTS (PATH_LEN * u32, BE)            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct AuthKeyWithCurveResp {
    pub curve: DerivationType,
    pub path: Bip32Path,
}

/// Main chain high watermark response APDU
///
/// `ROUND` is only present once the chain has migrated to
/// round-based consensus.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             LEVEL                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        ROUND (optional)                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct MainHwmResp {
    #[encdec(with = "be_u32")]
    pub level: u32,
    #[encdec(with = "opt_be_u32")]
    pub round: Option<u32>,
}

/// All high watermarks response APDU
///
/// Rounds are included for both chains when either chain has migrated
/// to round-based consensus.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          MAIN_LEVEL                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     MAIN_ROUND (optional)                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          TEST_LEVEL                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     TEST_ROUND (optional)                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         MAIN_CHAIN_ID                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AllHwmResp {
    pub main_level: u32,
    pub test_level: u32,
    /// Main and test rounds, where either chain has migrated
    pub rounds: Option<(u32, u32)>,
    pub main_chain_id: u32,
}

impl Encode for AllHwmResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(match self.rounds {
            Some(_) => 20,
            None => 12,
        })
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let mut index = 0;

        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        index += be_u32::enc(&self.main_level, &mut buff[index..])?;
        if let Some((main_round, _)) = &self.rounds {
            index += be_u32::enc(main_round, &mut buff[index..])?;
        }

        index += be_u32::enc(&self.test_level, &mut buff[index..])?;
        if let Some((_, test_round)) = &self.rounds {
            index += be_u32::enc(test_round, &mut buff[index..])?;
        }

        index += be_u32::enc(&self.main_chain_id, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for AllHwmResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let word = |i: usize| be_u32::dec(&buff[i * 4..]).map(|(v, _)| v);

        match buff.len() {
            12 => Ok((
                Self {
                    main_level: word(0)?,
                    test_level: word(1)?,
                    rounds: None,
                    main_chain_id: word(2)?,
                },
                12,
            )),
            20 => Ok((
                Self {
                    main_level: word(0)?,
                    test_level: word(2)?,
                    rounds: Some((word(1)?, word(3)?)),
                    main_chain_id: word(4)?,
                },
                20,
            )),
            _ => Err(ApduError::InvalidLength),
        }
    }
}
