// Copyright (c) 2023-2024 The Tezos Baking App Developers

use encdec::Encode;

use ledger_proto::ApduError;
use ledger_tezos_baking_apdu::{path::Bip32Path, types::DerivationType};

use crate::{
    apdu,
    driver::{PublicKey, Signature},
    helpers::MESSAGE_HASH_LEN,
};

/// [`Engine`][super::Engine] outputs (in response to events), typically encoded to response [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    /// Success with an empty payload
    None,

    /// Awaiting operator confirmation, the response is produced by
    /// [`Engine::approve`][super::Engine::approve] or
    /// [`Engine::deny`][super::Engine::deny]
    Pending,

    /// Application version
    Version { major: u8, minor: u8, patch: u8 },

    /// Compressed public key
    PublicKey { public_key: PublicKey },

    /// Signature, with the message hash for `SIGN_WITH_HASH`
    Signature {
        hash: Option<[u8; MESSAGE_HASH_LEN]>,
        signature: Signature,
    },

    /// Authorized key path, `None` if unset
    AuthKey { path: Option<Bip32Path> },

    /// Authorized key path and curve
    AuthKeyWithCurve {
        curve: DerivationType,
        path: Bip32Path,
    },

    /// Main chain watermark
    MainHwm { level: u32, round: Option<u32> },

    /// All watermarks and the main chain id
    AllHwm {
        main_level: u32,
        test_level: u32,
        rounds: Option<(u32, u32)>,
        main_chain_id: u32,
    },

    /// Key-bound HMAC
    Hmac { hmac: [u8; 32] },
}

impl Output {
    /// Encode an [`Output`] object to response APDU
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        match self {
            Output::None | Output::Pending => Ok(0),
            Output::Version {
                major,
                minor,
                patch,
            } => apdu::version::VersionResp::new(
                apdu::version::APP_KIND_BAKING,
                *major,
                *minor,
                *patch,
            )
            .encode(buff),
            Output::PublicKey { public_key } => apdu::public_key::PublicKeyResp { public_key }
                .encode(buff),
            Output::Signature { hash, signature } => apdu::sign::SignResp {
                hash: *hash,
                signature,
            }
            .encode(buff),
            Output::AuthKey { path } => apdu::query::AuthKeyResp {
                path: path.clone().unwrap_or_default(),
            }
            .encode(buff),
            Output::AuthKeyWithCurve { curve, path } => apdu::query::AuthKeyWithCurveResp {
                curve: *curve,
                path: path.clone(),
            }
            .encode(buff),
            Output::MainHwm { level, round } => apdu::query::MainHwmResp {
                level: *level,
                round: *round,
            }
            .encode(buff),
            Output::AllHwm {
                main_level,
                test_level,
                rounds,
                main_chain_id,
            } => apdu::query::AllHwmResp {
                main_level: *main_level,
                test_level: *test_level,
                rounds: *rounds,
                main_chain_id: *main_chain_id,
            }
            .encode(buff),
            Output::Hmac { hmac } => apdu::hmac::HmacResp { hmac: *hmac }.encode(buff),
        }
    }
}
