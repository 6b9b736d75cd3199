// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Tests for Tezos baking wallet integration.
//!
//! Flows are generic over [Exchange] for reuse against engine instances
//! or device transports, with message builders in [builders] and a typed
//! APDU [Client][client::Client] used by each flow.
//!

use async_trait::async_trait;

use ledger_tezos_baking_apdu::{status::StatusWord, ApduError};

pub mod builders;

pub mod client;

pub mod baking;

pub mod delegation;

pub mod keys;


/// Response APDU, split into payload and status word
#[derive(Clone, PartialEq, Debug)]
pub struct Response {
    pub data: Vec<u8>,
    pub status: StatusWord,
}

impl Response {
    /// Parse a raw response APDU (payload followed by a two byte status word)
    pub fn parse(buff: &[u8]) -> Result<Self, Error> {
        if buff.len() < 2 {
            return Err(Error::Transport(anyhow::anyhow!(
                "response too short ({} bytes)",
                buff.len()
            )));
        }

        let (data, sw) = buff.split_at(buff.len() - 2);
        let sw = u16::from_be_bytes([sw[0], sw[1]]);

        let status = StatusWord::try_from(sw)
            .map_err(|_| Error::Transport(anyhow::anyhow!("unrecognised status word {sw:04x}")))?;

        Ok(Self {
            data: data.to_vec(),
            status,
        })
    }

    /// Return the payload for successful responses
    pub fn check(self) -> Result<Vec<u8>, Error> {
        match self.status {
            StatusWord::Ok => Ok(self.data),
            sw => Err(Error::Status(sw)),
        }
    }
}

/// Result of issuing a command
#[derive(Clone, PartialEq, Debug)]
pub enum Answer {
    /// Response available immediately
    Ready(Response),
    /// Command awaits operator confirmation, resolve with [Exchange::confirm]
    Pending,
}

/// Raw APDU exchange with an engine or device
#[async_trait]
pub trait Exchange {
    /// Issue a raw command APDU
    async fn exchange(&self, command: &[u8]) -> anyhow::Result<Answer>;

    /// Approve or deny the pending command, returning its delayed response
    async fn confirm(&self, approve: bool) -> anyhow::Result<Response>;
}

/// Test client error
#[derive(Debug)]
pub enum Error {
    /// Command failed with a status word
    Status(StatusWord),
    /// APDU encoding or decoding failed
    Apdu(ApduError),
    /// Transport failure
    Transport(anyhow::Error),
}

impl Error {
    /// Fetch the failing status word, if any
    pub fn status(&self) -> Option<StatusWord> {
        match self {
            Error::Status(sw) => Some(*sw),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Status(sw) => write!(f, "command failed: {sw} ({:04x})", *sw as u16),
            Error::Apdu(e) => write!(f, "apdu error: {e:?}"),
            Error::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Transport(e)
    }
}

/// Check a result failed with the expected status word
pub fn expect_status<T: std::fmt::Debug>(
    r: Result<T, Error>,
    expected: StatusWord,
) -> anyhow::Result<()> {
    match r {
        Err(Error::Status(sw)) if sw == expected => Ok(()),
        r => Err(anyhow::anyhow!("expected {expected}, got {r:?}")),
    }
}
