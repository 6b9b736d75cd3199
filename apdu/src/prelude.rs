// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    command::Command,
    hmac::{HmacReq, HmacResp},
    p1,
    path::Bip32Path,
    public_key::{AuthorizeBakingReq, GetPublicKeyReq, PromptPublicKeyReq, PublicKeyResp},
    query::{
        AllHwmResp, AuthKeyResp, AuthKeyWithCurveResp, DeauthorizeReq, MainHwmResp,
        QueryAllHwmReq, QueryAuthKeyReq, QueryAuthKeyWithCurveReq, QueryMainHwmReq,
    },
    setup::{ResetReq, SetupReq},
    sign::{SignPacket, SignReq, SignResp, SignWithHashReq},
    status::StatusWord,
    types::{DerivationType, SignatureType},
    version::{VersionReq, VersionResp},
    Instruction, BAKING_APDU_CLA, MAX_APDU_SIZE,
};
