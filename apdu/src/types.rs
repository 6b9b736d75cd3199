// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Key curve and signature type enumerations

use encdec::{DecodeOwned, Encode};
use ledger_proto::ApduError;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

/// Key derivation type (curve), selected by `P2` on key-bearing instructions
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum DerivationType {
    Ed25519 = 0x00,
    Secp256k1 = 0x01,
    Secp256r1 = 0x02,
    Bip32Ed25519 = 0x03,
    Bls12_381 = 0x04,
}

impl DerivationType {
    /// Signature type produced by keys derived with this curve
    pub const fn signature_type(&self) -> SignatureType {
        match self {
            DerivationType::Ed25519 | DerivationType::Bip32Ed25519 => SignatureType::Ed25519,
            DerivationType::Secp256k1 => SignatureType::Secp256k1,
            DerivationType::Secp256r1 => SignatureType::Secp256r1,
            DerivationType::Bls12_381 => SignatureType::Bls12_381,
        }
    }
}

impl Encode for DerivationType {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = *self as u8;
        Ok(1)
    }
}

impl DecodeOwned for DerivationType {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match Self::try_from(buff[0]) {
            Ok(v) => Ok((v, 1)),
            Err(_) => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Tezos signature type, as found in key and contract headers
/// within operation encodings
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum SignatureType {
    Ed25519 = 0x00,
    Secp256k1 = 0x01,
    Secp256r1 = 0x02,
    Bls12_381 = 0x03,
}

impl SignatureType {
    /// Length of a compressed public key of this type
    pub const fn public_key_len(&self) -> usize {
        match self {
            SignatureType::Ed25519 => 32,
            SignatureType::Secp256k1 | SignatureType::Secp256r1 => 33,
            SignatureType::Bls12_381 => 48,
        }
    }
}
