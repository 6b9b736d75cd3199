// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Operation group signing flows
//!
//! Only reveals and self-delegation of the baking key are signed,
//! delegation requires operator approval.

use log::{debug, info};

use ledger_tezos_baking_apdu::prelude::*;

use crate::{
    baking::authorize,
    builders::*,
    client::{Client, SignOpts},
    expect_status, Exchange,
};

/// Self-delegation of the baking key, with and without a leading reveal
pub async fn self_delegation<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    let public_key = authorize(&c, curve).await?;
    let baker = Account::new(curve, &public_key);
    let m = Manager::default();

    let plain = OperationGroup::new(&BRANCH)
        .delegation(&baker, Some(&baker), &m)
        .build();

    let revealed = OperationGroup::new(&BRANCH)
        .reveal(&baker, &m)
        .delegation(&baker, Some(&baker), &m)
        .build();

    for op in [plain, revealed] {
        info!("self-delegation ({} bytes)", op.len());

        let r = c
            .sign(curve, &BAKING_PATH, &op, SignOpts::default())
            .await?;
        assert_eq!(r.hash, Some(message_hash(&op)));

        debug!("denied self-delegation");
        let r = c
            .sign(
                curve,
                &BAKING_PATH,
                &op,
                SignOpts {
                    approve: false,
                    ..Default::default()
                },
            )
            .await;
        expect_status(r, StatusWord::Reject)?;
    }

    Ok(())
}

/// Reveal-only groups are signed without prompting
pub async fn reveal<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    let public_key = authorize(&c, curve).await?;
    let baker = Account::new(curve, &public_key);
    let m = Manager::default();

    let op = OperationGroup::new(&BRANCH).reveal(&baker, &m).build();

    // Any prompt is denied, failing the request
    let opts = SignOpts {
        approve: false,
        with_hash: false,
        ..Default::default()
    };

    let r = c.sign(curve, &BAKING_PATH, &op, opts).await?;
    assert_eq!(r.hash, None);
    assert!(!r.signature.is_empty());

    Ok(())
}

/// Groups other than reveals and self-delegation are refused
pub async fn refused<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    let public_key = authorize(&c, curve).await?;
    let baker = Account::new(curve, &public_key);
    let other = Account::new(curve, &c.public_key(curve, &OTHER_PATH).await?);
    let m = Manager::default();

    debug!("delegation to another baker");
    let op = OperationGroup::new(&BRANCH)
        .delegation(&baker, Some(&other), &m)
        .build();
    expect_status(
        c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await,
        StatusWord::Security,
    )?;

    debug!("delegate withdrawal");
    let op = OperationGroup::new(&BRANCH)
        .delegation(&baker, None, &m)
        .build();
    expect_status(
        c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await,
        StatusWord::Security,
    )?;

    debug!("transaction");
    let op = OperationGroup::new(&BRANCH)
        .transaction(&baker, 1_000_000, &other, &m)
        .build();
    expect_status(
        c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await,
        StatusWord::Security,
    )?;

    debug!("self-delegation by a key other than the baking key");
    let op = OperationGroup::new(&BRANCH)
        .delegation(&other, Some(&other), &m)
        .build();
    expect_status(
        c.sign(curve, &OTHER_PATH, &op, SignOpts::default()).await,
        StatusWord::Security,
    )?;

    debug!("source other than the signer");
    let op = OperationGroup::new(&BRANCH)
        .delegation(&other, Some(&baker), &m)
        .build();
    expect_status(
        c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await,
        StatusWord::ParseError,
    )?;

    Ok(())
}

/// A second non-reveal operation fails regardless of surrounding reveals
pub async fn duplicate<T: Exchange>(t: T, curve: DerivationType) -> anyhow::Result<()> {
    let c = Client::new(t);

    let public_key = authorize(&c, curve).await?;
    let baker = Account::new(curve, &public_key);
    let m = Manager::default();

    let op = OperationGroup::new(&BRANCH)
        .reveal(&baker, &m)
        .reveal(&baker, &m)
        .reveal(&baker, &m)
        .delegation(&baker, Some(&baker), &m)
        .build();
    c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await?;

    let op = OperationGroup::new(&BRANCH)
        .reveal(&baker, &m)
        .delegation(&baker, Some(&baker), &m)
        .reveal(&baker, &m)
        .delegation(&baker, Some(&baker), &m)
        .build();
    expect_status(
        c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await,
        StatusWord::ParseError,
    )?;

    // Parse failures do not leak into the next request
    let op = OperationGroup::new(&BRANCH).reveal(&baker, &m).build();
    c.sign(curve, &BAKING_PATH, &op, SignOpts::default()).await?;

    Ok(())
}

/// Any packet partition of a group yields the same hash and signature
pub async fn partitions<T: Exchange>(t: T, curve: DerivationType, n: usize) -> anyhow::Result<()> {
    let c = Client::new(t);

    let public_key = authorize(&c, curve).await?;
    let baker = Account::new(curve, &public_key);

    let op = OperationGroup::new(&BRANCH)
        .reveal(&baker, &Manager::default())
        .reveal(
            &baker,
            &Manager {
                fee: u32::MAX as u64 + 1,
                counter: 1 << 40,
                gas_limit: 300,
                storage_limit: 257,
            },
        )
        .build();

    let expected = c
        .sign(curve, &BAKING_PATH, &op, SignOpts::default())
        .await?;

    for _ in 0..n {
        let chunks = random_partition(op.len(), 16);
        debug!("chunks: {chunks:?}");

        let r = c
            .sign_chunks(curve, &BAKING_PATH, &op, &chunks, SignOpts::default())
            .await?;
        assert_eq!(r, expected);
    }

    Ok(())
}
