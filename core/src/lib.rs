// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Tezos baking hardware wallet core
//!
//! This provides a common [Engine][engine] supporting baking (block and
//! consensus operation) signing with high watermark protection, for
//! execution on hardware wallets.
//!
//! Interactions with the [Engine][engine] are performed via raw APDUs using
//! [`Engine::dispatch`][engine::Engine::dispatch], or directly via
//! [Event][engine::Event]s and [Output][engine::Output]s,
//! see [ledger_tezos_baking_apdu] for APDU objects and wire encodings.
//! Platform key derivation and signing are provided through the
//! [Driver][driver::Driver] trait, durable state through [Storage][storage::Storage].
//!
//! ## Operations
//!
//! ### Setup
//!
//! A baker is configured with [`SetupReq`][ledger_tezos_baking_apdu::setup::SetupReq],
//! which authorizes the baking key and sets the main chain id and starting
//! watermarks following operator approval. Keys may also be authorized with
//! [`AuthorizeBakingReq`][ledger_tezos_baking_apdu::public_key::AuthorizeBakingReq]
//! and watermarks reset with [`ResetReq`][ledger_tezos_baking_apdu::setup::ResetReq].
//!
//! ### Signing
//!
//! Messages are sent as a sequence of packets, see [`sign`][ledger_tezos_baking_apdu::sign].
//!
//! 1. Issue a `FIRST` packet containing the derivation path of the signing key
//! 2. Issue `NEXT` packets containing message data, with the `LAST` marker set on
//!    the final packet
//!
//! Message data is hashed (blake2b-256) as it arrives and the hash is signed.
//!
//! - Blocks and consensus operations must be signed by the authorized baking key,
//!   and are checked against and raise the [high watermark][hwm] for their chain.
//! - Operation groups are parsed in a streaming manner, only reveals and
//!   self-delegation (following operator approval) of the baking key are permitted.
//!

#![cfg_attr(not(feature = "std"), no_std)]

pub use ledger_tezos_baking_apdu::{self as apdu};

pub mod baking;

pub mod driver;

pub mod engine;

pub mod helpers;

pub mod hwm;

pub mod parser;

pub mod reassembler;

pub mod registry;

pub mod storage;

pub mod wire;
