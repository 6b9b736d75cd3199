// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Platform driver interface for key derivation and signing

use heapless::Vec;

use ledger_tezos_baking_apdu::types::DerivationType;

use crate::engine::Error;

/// Maximum public key length
pub const MAX_PUBLIC_KEY_LEN: usize = 65;

/// Maximum signature length
pub const MAX_SIGNATURE_LEN: usize = 100;

/// Compressed public key (32 bytes ed25519, 33 secp256k1 / secp256r1, 48 BLS12-381)
pub type PublicKey = Vec<u8, MAX_PUBLIC_KEY_LEN>;

/// Signature in the curve's wire encoding
pub type Signature = Vec<u8, MAX_SIGNATURE_LEN>;

/// [`Driver`] trait provides platform key support for [`Engine`][crate::engine::Engine] instances
pub trait Driver {
    /// Derive the compressed public key for a path
    fn public_key(&self, curve: DerivationType, path: &[u32]) -> Result<PublicKey, Error>;

    /// Sign a message with the key for a path
    fn sign(&self, curve: DerivationType, path: &[u32], message: &[u8]) -> Result<Signature, Error>;
}

impl<T: Driver> Driver for &mut T {
    fn public_key(&self, curve: DerivationType, path: &[u32]) -> Result<PublicKey, Error> {
        T::public_key(self, curve, path)
    }

    fn sign(&self, curve: DerivationType, path: &[u32], message: &[u8]) -> Result<Signature, Error> {
        T::sign(self, curve, path, message)
    }
}
