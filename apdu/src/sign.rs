// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Multi-packet signing APDUs
//!
//! Signing requests are split over a sequence of packets. The first carries
//! the derivation path (with the curve in `P2`), following packets carry
//! message data, with [`p1::LAST_MARKER`] set on the final packet.
//!
//! ```text
//! FIRST (P1 = 0x00, P2 = CURVE)      PATH
//! NEXT  (P1 = 0x01)                  DATA
//! ...
//! LAST  (P1 = 0x81)                  DATA      -> SIGNATURE
//! ```

use encdec::{DecodeOwned, Encode};

use super::{p1, ApduError, ApduStatic, Instruction, BAKING_APDU_CLA};
use crate::{path::Bip32Path, types::DerivationType};

/// Length of the message hash returned by `SIGN_WITH_HASH`
pub const SIGN_HASH_LEN: usize = 32;

/// A single packet of a signing request
#[derive(Clone, PartialEq, Debug)]
pub enum SignPacket<'a> {
    /// Initial packet, selects the signing key
    First {
        curve: DerivationType,
        path: Bip32Path,
    },
    /// Message data packet
    Next { data: &'a [u8], last: bool },
}

impl<'a> SignPacket<'a> {
    /// Packet position for `P1`
    pub fn p1(&self) -> u8 {
        match self {
            SignPacket::First { .. } => p1::FIRST,
            SignPacket::Next { last: false, .. } => p1::NEXT,
            SignPacket::Next { last: true, .. } => p1::NEXT | p1::LAST_MARKER,
        }
    }

    /// Curve selector for `P2`, only meaningful on the first packet
    pub fn p2(&self) -> u8 {
        match self {
            SignPacket::First { curve, .. } => *curve as u8,
            SignPacket::Next { .. } => 0,
        }
    }

    /// Decode a packet from `P1`, `P2` and payload
    pub fn decode_with_params(p1: u8, p2: u8, buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let last = p1 & p1::LAST_MARKER != 0;

        match p1 & !p1::LAST_MARKER {
            p1::FIRST => {
                let (curve, _) = DerivationType::decode_owned(&[p2])?;
                let (path, n) = Bip32Path::decode_owned(buff)?;
                Ok((SignPacket::First { curve, path }, n))
            }
            p1::NEXT => Ok((SignPacket::Next { data: buff, last }, buff.len())),
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

impl<'a> Encode for SignPacket<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        match self {
            SignPacket::First { path, .. } => path.encode_len(),
            SignPacket::Next { data, .. } => Ok(data.len()),
        }
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        match self {
            SignPacket::First { path, .. } => path.encode(buff),
            SignPacket::Next { data, .. } => {
                if buff.len() < data.len() {
                    return Err(ApduError::InvalidLength);
                }
                buff[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
        }
    }
}

/// Helper macro for signing instructions, which share a packet format
macro_rules! sign_req {
    ($(#[$m:meta])* $name:ident, $ins:expr) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Debug)]
        pub struct $name<'a>(pub SignPacket<'a>);

        impl<'a> $name<'a> {
            /// Create the initial packet for a signing request
            pub fn first(curve: DerivationType, path: Bip32Path) -> Self {
                Self(SignPacket::First { curve, path })
            }

            /// Create a message data packet
            pub fn next(data: &'a [u8], last: bool) -> Self {
                Self(SignPacket::Next { data, last })
            }

            /// Decode a request from `P1`, `P2` and payload
            pub fn decode_with_params(p1: u8, p2: u8, buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
                SignPacket::decode_with_params(p1, p2, buff).map(|(p, n)| (Self(p), n))
            }
        }

        impl<'a> ApduStatic for $name<'a> {
            const CLA: u8 = BAKING_APDU_CLA;
            const INS: u8 = $ins as u8;

            fn p1(&self) -> u8 {
                self.0.p1()
            }

            fn p2(&self) -> u8 {
                self.0.p2()
            }
        }

        impl<'a> Encode for $name<'a> {
            type Error = ApduError;

            fn encode_len(&self) -> Result<usize, ApduError> {
                self.0.encode_len()
            }

            fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
                self.0.encode(buff)
            }
        }
    };
}

sign_req!(
    /// Sign request APDU, responds with a [SignResp] containing only the signature
    SignReq,
    Instruction::Sign
);

sign_req!(
    /// Sign request APDU, responds with a [SignResp] containing the message hash and signature
    SignWithHashReq,
    Instruction::SignWithHash
);

/// Signature response APDU
///
/// The signature length depends on the curve, so it is not length-prefixed.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /              MESSAGE_HASH (32 bytes, SIGN_WITH_HASH only)     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                          SIGNATURE                            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SignResp<'a> {
    pub hash: Option<[u8; SIGN_HASH_LEN]>,
    pub signature: &'a [u8],
}

impl<'a> SignResp<'a> {
    /// Decode a response, `with_hash` selects the `SIGN_WITH_HASH` layout
    pub fn decode_with_hash(with_hash: bool, buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if !with_hash {
            return Ok((
                Self {
                    hash: None,
                    signature: buff,
                },
                buff.len(),
            ));
        }

        if buff.len() < SIGN_HASH_LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut hash = [0u8; SIGN_HASH_LEN];
        hash.copy_from_slice(&buff[..SIGN_HASH_LEN]);

        Ok((
            Self {
                hash: Some(hash),
                signature: &buff[SIGN_HASH_LEN..],
            },
            buff.len(),
        ))
    }
}

impl<'a> Encode for SignResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let h = if self.hash.is_some() { SIGN_HASH_LEN } else { 0 };
        Ok(h + self.signature.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;
        if let Some(h) = &self.hash {
            buff[..SIGN_HASH_LEN].copy_from_slice(h);
            index += SIGN_HASH_LEN;
        }

        buff[index..][..self.signature.len()].copy_from_slice(self.signature);
        index += self.signature.len();

        Ok(index)
    }
}
