// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Protocol / APDU definitions for Tezos baking app communication
//!
//! This module defines the protocol and its encodings for communication
//! with the Tezos baking application.
//!
//! Commands follow the legacy Tezos Ledger framing, a single class byte (`0x80`) with
//! instruction codes shared with the existing baker tooling, and packet position carried in `P1`
//! for multi-packet signing requests. Where an instruction takes a key curve this is provided
//! in `P2` as a [`DerivationType`][types::DerivationType].
//!
//! Unlike most APDU encodings in the ledger ecosystem all multi-byte integer fields are
//! **big-endian**, matching the Tezos binary encoding of levels, rounds and chain identifiers.
//!

#![no_std]

pub use ledger_proto::{ApduError, ApduReq, ApduStatic};

pub mod command;
pub mod hmac;
pub mod path;
pub mod prelude;
pub mod public_key;
pub mod query;
pub mod setup;
pub mod sign;
pub mod status;
pub mod types;
pub mod version;

mod helpers;

/// Tezos APDU Class
pub const BAKING_APDU_CLA: u8 = 0x80;

/// Maximum APDU payload length accepted by the device
pub const MAX_APDU_SIZE: usize = 235;

/// Tezos APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch application version
    Version = 0x00,

    /// Authorize a key for baking (with user approval)
    AuthorizeBaking = 0x01,

    /// Fetch a public key without prompting
    GetPublicKey = 0x02,

    /// Fetch a public key, displaying it for confirmation
    PromptPublicKey = 0x03,

    /// Sign a block, consensus operation or operation group
    Sign = 0x04,

    /// Reset high watermarks (with user approval)
    Reset = 0x06,

    /// Fetch the authorized key path
    QueryAuthKey = 0x07,

    /// Fetch the main chain high watermark
    QueryMainHwm = 0x08,

    /// Setup baking key, chain and watermarks (with user approval)
    Setup = 0x0a,

    /// Fetch all high watermarks and the main chain id
    QueryAllHwm = 0x0b,

    /// Clear the authorized baking key
    Deauthorize = 0x0c,

    /// Fetch the authorized key path and curve
    QueryAuthKeyWithCurve = 0x0d,

    /// Compute a key-bound HMAC
    Hmac = 0x0e,

    /// Sign, returning the message hash alongside the signature
    SignWithHash = 0x0f,
}

/// Packet position markers carried in `P1` for multi-packet requests
pub mod p1 {
    /// First packet, carries the derivation path
    pub const FIRST: u8 = 0x00;

    /// Subsequent packet, carries message data
    pub const NEXT: u8 = 0x01;

    /// Marks the final packet of a message
    pub const LAST_MARKER: u8 = 0x80;
}
