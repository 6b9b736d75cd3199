// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Public key, key authorization and HMAC flows

use log::debug;
use strum::IntoEnumIterator;

use ledger_tezos_baking_apdu::prelude::*;

use crate::{builders::*, client::Client, expect_status, Exchange};

/// Public key derivation over every curve, with and without prompting
pub async fn public_keys<T: Exchange>(t: T) -> anyhow::Result<()> {
    let c = Client::new(t);

    for curve in DerivationType::iter() {
        let k = c.public_key(curve, &BAKING_PATH).await?;
        debug!("{curve} public key: {}", hex::encode(&k));

        assert_eq!(k.len(), curve.signature_type().public_key_len());

        // Distinct paths yield distinct keys
        let o = c.public_key(curve, &OTHER_PATH).await?;
        assert_ne!(k, o);

        // Prompted keys match
        let p = c.prompt_public_key(curve, &BAKING_PATH, true).await?;
        assert_eq!(k, p);

        expect_status(
            c.prompt_public_key(curve, &BAKING_PATH, false).await,
            StatusWord::Reject,
        )?;
    }

    Ok(())
}

/// Baking key authorization lifecycle
pub async fn authorization<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    // Nothing authorized
    assert!(c.auth_key().await?.is_empty());
    expect_status(c.auth_key_with_curve().await, StatusWord::ReferencedDataNotFound)?;
    expect_status(
        c.authorize_stored(curve, true).await,
        StatusWord::ReferencedDataNotFound,
    )?;

    // Denial leaves the key unset
    expect_status(c.authorize(curve, &BAKING_PATH, false).await, StatusWord::Reject)?;
    assert!(c.auth_key().await?.is_empty());

    let public_key = c.authorize(curve, &BAKING_PATH, true).await?;
    assert_eq!(public_key, c.public_key(curve, &BAKING_PATH).await?);

    assert_eq!(c.auth_key().await?, *BAKING_PATH);
    assert_eq!(
        c.auth_key_with_curve().await?,
        AuthKeyWithCurveResp {
            curve,
            path: BAKING_PATH.clone(),
        }
    );

    // Stored key re-authorization returns the same key
    assert_eq!(c.authorize_stored(curve, true).await?, public_key);

    // Replaced by a later authorization
    c.authorize(curve, &OTHER_PATH, true).await?;
    assert_eq!(c.auth_key().await?, *OTHER_PATH);

    c.deauthorize().await?;
    assert!(c.auth_key().await?.is_empty());
    expect_status(c.auth_key_with_curve().await, StatusWord::ReferencedDataNotFound)?;

    Ok(())
}

/// Key-bound HMACs are deterministic per key and message
pub async fn hmac<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    let a = c.hmac(curve, &BAKING_PATH, b"baking hmac").await?;
    let b = c.hmac(curve, &BAKING_PATH, b"baking hmac").await?;
    assert_eq!(a, b);

    let m = c.hmac(curve, &BAKING_PATH, b"another message").await?;
    assert_ne!(a, m);

    let k = c.hmac(curve, &OTHER_PATH, b"baking hmac").await?;
    assert_ne!(a, k);

    Ok(())
}
