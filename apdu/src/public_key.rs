// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Public key and baking authorization APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, BAKING_APDU_CLA};
use crate::{helpers::lv, path::Bip32Path, types::DerivationType};

/// Helper macro for public key requests, all of which carry the curve in `P2`
/// and a derivation path as payload
macro_rules! public_key_req {
    ($(#[$m:meta])* $name:ident, $ins:expr) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Debug)]
        pub struct $name {
            /// Key curve (encoded in `P2`)
            pub curve: DerivationType,
            /// Derivation path
            pub path: Option<Bip32Path>,
        }

        impl $name {
            /// Create a new request for the provided curve and path
            pub fn new(curve: DerivationType, path: Bip32Path) -> Self {
                Self {
                    curve,
                    path: Some(path),
                }
            }
        }

        impl ApduStatic for $name {
            const CLA: u8 = BAKING_APDU_CLA;
            const INS: u8 = $ins as u8;

            fn p2(&self) -> u8 {
                self.curve as u8
            }
        }

        impl Encode for $name {
            type Error = ApduError;

            fn encode_len(&self) -> Result<usize, ApduError> {
                match &self.path {
                    Some(p) => p.encode_len(),
                    None => Ok(0),
                }
            }

            fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
                match &self.path {
                    Some(p) => p.encode(buff),
                    None => Ok(0),
                }
            }
        }

        impl $name {
            /// Decode request payload, with the curve recovered from `P2`
            pub fn decode_with_p2(p2: u8, buff: &[u8]) -> Result<(Self, usize), ApduError> {
                let (curve, _) = DerivationType::decode_owned(&[p2])?;

                if buff.is_empty() {
                    return Ok((Self { curve, path: None }, 0));
                }

                let (path, n) = Bip32Path::decode_owned(buff)?;
                Ok((
                    Self {
                        curve,
                        path: Some(path),
                    },
                    n,
                ))
            }
        }
    };
}

public_key_req!(
    /// Fetch the public key for a derivation path without prompting
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
    GetPublicKeyReq,
    Instruction::GetPublicKey
);

public_key_req!(
    /// Fetch the public key for a derivation path, displaying it for confirmation
    PromptPublicKeyReq,
    Instruction::PromptPublicKey
);

public_key_req!(
    /// Authorize a key for baking, displaying it for confirmation.
    ///
    /// An empty payload re-authorizes the currently stored baking key,
    /// `P2` must still carry a valid curve.
    AuthorizeBakingReq,
    Instruction::AuthorizeBaking
);

impl AuthorizeBakingReq {
    /// Create a request re-authorizing the stored baking key
    pub fn stored(curve: DerivationType) -> Self {
        Self { curve, path: None }
    }
}

/// Public key response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    KEY_LEN    |                                               /
/// +-+-+-+-+-+-+-+-+               PUBLIC_KEY                      /
/// /                                                               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PublicKeyResp<'a> {
    pub public_key: &'a [u8],
}

impl<'a> Encode for PublicKeyResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        lv::enc_len(self.public_key)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        lv::enc(self.public_key, buff)
    }
}

impl<'a> Decode<'a> for PublicKeyResp<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        lv::dec(buff).map(|(public_key, n)| (Self { public_key }, n))
    }
}
