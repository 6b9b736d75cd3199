// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Baking (block and consensus operation) signing flows

use log::{debug, info};

use ledger_tezos_baking_apdu::prelude::*;

use crate::{
    builders::*,
    client::{Client, SignOpts},
    expect_status, Exchange,
};

/// Authorize the baking key, returning its public key
pub async fn authorize<T: Exchange>(c: &Client<T>, curve: DerivationType) -> anyhow::Result<Vec<u8>> {
    let public_key = c.authorize(curve, &BAKING_PATH, true).await?;
    assert_eq!(public_key.len(), curve.signature_type().public_key_len());
    Ok(public_key)
}

/// Sign a baking message, checking the returned hash
pub async fn sign<T: Exchange>(
    c: &Client<T>,
    curve: DerivationType,
    message: &[u8],
) -> Result<Vec<u8>, crate::Error> {
    let r = c
        .sign(curve, &BAKING_PATH, message, SignOpts::default())
        .await?;

    assert_eq!(r.hash, Some(message_hash(message)), "message hash mismatch");
    assert!(!r.signature.is_empty());

    Ok(r.signature)
}

/// Main chain watermark scenario, block then attestation at a level,
/// rejecting repeats and lower positions
pub async fn scenario<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);
    authorize(&c, curve).await?;

    info!("block at 100/0");
    sign(&c, curve, &block(MAIN_CHAIN_ID, 100, 0)).await?;

    info!("attestation at 100/0");
    sign(&c, curve, &attestation(MAIN_CHAIN_ID, 100, 0)).await?;

    debug!("repeated attestation");
    expect_status(
        sign(&c, curve, &attestation(MAIN_CHAIN_ID, 100, 0)).await,
        StatusWord::Security,
    )?;

    debug!("lower position");
    expect_status(
        sign(&c, curve, &block(MAIN_CHAIN_ID, 99, 5)).await,
        StatusWord::Security,
    )?;
    expect_status(
        sign(&c, curve, &preattestation(MAIN_CHAIN_ID, 99, 5)).await,
        StatusWord::Security,
    )?;

    info!("attestation at 101/0");
    sign(&c, curve, &attestation(MAIN_CHAIN_ID, 101, 0)).await?;

    let h = c.main_hwm().await?;
    assert_eq!(h, MainHwmResp { level: 101, round: Some(0) });

    Ok(())
}

/// Consensus votes at a single position, preattestation precedes attestation
pub async fn votes<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);
    authorize(&c, curve).await?;

    sign(&c, curve, &block(MAIN_CHAIN_ID, 200, 1)).await?;

    // Equal position block is never signed twice
    expect_status(
        sign(&c, curve, &block(MAIN_CHAIN_ID, 200, 1)).await,
        StatusWord::Security,
    )?;

    sign(&c, curve, &preattestation(MAIN_CHAIN_ID, 200, 1)).await?;
    expect_status(
        sign(&c, curve, &preattestation(MAIN_CHAIN_ID, 200, 1)).await,
        StatusWord::Security,
    )?;

    sign(&c, curve, &attestation(MAIN_CHAIN_ID, 200, 1)).await?;

    // No preattestation once attested
    expect_status(
        sign(&c, curve, &preattestation(MAIN_CHAIN_ID, 200, 1)).await,
        StatusWord::Security,
    )?;

    // Higher round at the same level
    sign(&c, curve, &preattestation(MAIN_CHAIN_ID, 200, 2)).await?;

    let h = c.main_hwm().await?;
    assert_eq!(h, MainHwmResp { level: 200, round: Some(2) });

    Ok(())
}

/// Main and test chain watermarks are tracked independently
pub async fn chains<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    let setup = SetupReq {
        curve,
        main_chain_id: MAIN_CHAIN_ID,
        main_level: 1_000,
        test_level: 10,
        path: BAKING_PATH.clone(),
    };
    c.setup(&setup, true).await?;

    sign(&c, curve, &attestation(TEST_CHAIN_ID, 20, 3)).await?;

    // Below the main watermark
    expect_status(
        sign(&c, curve, &attestation(MAIN_CHAIN_ID, 20, 3)).await,
        StatusWord::Security,
    )?;

    sign(&c, curve, &block(MAIN_CHAIN_ID, 1_001, 0)).await?;

    let h = c.all_hwm().await?;
    assert_eq!(
        h,
        AllHwmResp {
            main_level: 1_001,
            test_level: 20,
            rounds: Some((0, 3)),
            main_chain_id: MAIN_CHAIN_ID,
        }
    );

    Ok(())
}

/// Any packet partition of a message yields the same hash
pub async fn partitions<T: Exchange>(t: T, curve: DerivationType, n: usize) -> anyhow::Result<()> {
    let c = Client::new(t);
    authorize(&c, curve).await?;

    for i in 0..n {
        let m = match i % 2 {
            0 => block(MAIN_CHAIN_ID, 300 + i as u32, 0),
            _ => attestation(MAIN_CHAIN_ID, 300 + i as u32, 0),
        };
        let chunks = random_partition(m.len(), 48);

        debug!("message {i}, chunks: {chunks:?}");

        let r = c
            .sign_chunks(curve, &BAKING_PATH, &m, &chunks, SignOpts::default())
            .await?;
        assert_eq!(r.hash, Some(message_hash(&m)));
    }

    Ok(())
}

/// Baking requires the authorized key
pub async fn unauthorized<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    // No key authorized
    expect_status(
        sign(&c, curve, &attestation(MAIN_CHAIN_ID, 10, 0)).await,
        StatusWord::Security,
    )?;

    authorize(&c, curve).await?;

    // Authorized path with another key
    let r = c
        .sign(curve, &OTHER_PATH, &attestation(MAIN_CHAIN_ID, 10, 0), SignOpts::default())
        .await;
    expect_status(r, StatusWord::Security)?;

    // Watermark untouched by rejected requests
    assert_eq!(c.main_hwm().await?.level, 0);

    sign(&c, curve, &attestation(MAIN_CHAIN_ID, 10, 0)).await?;

    Ok(())
}
