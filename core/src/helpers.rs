// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Hashing helpers for message digests, key hashes and HMAC key derivation

use blake2::{
    digest::{consts::U20, consts::U32, Digest},
    Blake2b,
};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

use ledger_tezos_baking_apdu::types::DerivationType;

use crate::{
    driver::PublicKey,
    engine::Error,
    parser::{ImplicitContract, Signer, PKH_LEN},
};

/// Streaming hasher for signed messages (blake2b-256)
pub type MessageHasher = Blake2b<U32>;

/// Message hash length
pub const MESSAGE_HASH_LEN: usize = 32;

/// Fixed value signed to derive per-key HMAC keys
pub const HMAC_KEY_SEED: [u8; 32] = [
    0x6c, 0x4e, 0x7e, 0x70, 0x6c, 0x54, 0xd3, 0x67, 0xc8, 0x7a, 0x8d, 0x89, 0xc1, 0x6a, 0xdf, 0xe0,
    0x6c, 0xb5, 0x68, 0x0c, 0xb7, 0xd1, 0x8e, 0x62, 0x5a, 0x90, 0x47, 0x5e, 0xc0, 0xdb, 0xdb, 0x9f,
];

/// Compute the blake2b-160 hash of a compressed public key
pub fn public_key_hash(public_key: &[u8]) -> [u8; PKH_LEN] {
    let mut h = Blake2b::<U20>::new();
    h.update(public_key);

    let mut pkh = [0u8; PKH_LEN];
    pkh.copy_from_slice(&h.finalize());
    pkh
}

/// Build the signer context for a derived public key
pub fn signer_for(curve: DerivationType, public_key: PublicKey) -> Result<Signer, Error> {
    let signature_type = curve.signature_type();

    // Drivers must return compressed keys
    if public_key.len() != signature_type.public_key_len() {
        #[cfg(feature = "log")]
        log::error!(
            "driver returned {} byte key for {}",
            public_key.len(),
            curve
        );

        return Err(Error::DriverError);
    }

    Ok(Signer {
        contract: ImplicitContract {
            signature_type,
            pkh: public_key_hash(&public_key),
        },
        public_key,
    })
}

/// Compute a key-bound HMAC-SHA256, keyed by the SHA-512 of a signature
/// over [HMAC_KEY_SEED]
pub fn key_bound_hmac(seed_signature: &[u8], message: &[u8]) -> Result<[u8; 32], Error> {
    let mut key = [0u8; 64];
    key.copy_from_slice(&Sha512::digest(seed_signature));

    let mac = Hmac::<Sha256>::new_from_slice(&key);
    key.zeroize();

    let mut mac = mac.map_err(|_| Error::Unknown)?;
    mac.update(message);

    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
