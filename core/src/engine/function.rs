// Copyright (c) 2023-2024 The Tezos Baking App Developers

use blake2::Digest;

use ledger_tezos_baking_apdu::{path::Bip32Path, types::DerivationType};

use super::Error;
use crate::{
    baking::{is_baking_magic, BakingCollector, BakingData},
    helpers::{MessageHasher, MESSAGE_HASH_LEN},
    parser::{OperationGroup, OperationParser, Signer, MAGIC_OPERATION},
};

/// Per-request function context, shared between instructions
/// and cleared on completion or error
pub struct Function {
    inner: FunctionType,
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::large_enum_variant)]
enum FunctionType {
    None,
    Sign(SignContext),
}

impl Function {
    /// Create a new / empty function context
    pub const fn new() -> Self {
        Self {
            inner: FunctionType::None,
        }
    }

    /// Setup signing context for a new message
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn sign_init(&mut self, curve: DerivationType, path: Bip32Path, signer: Signer) {
        self.inner = FunctionType::Sign(SignContext {
            curve,
            path,
            signer,
            hasher: MessageHasher::new(),
            message: Message::Unknown,
        });
    }

    /// Fetch the active signing context
    pub fn sign_ctx_mut(&mut self) -> Option<&mut SignContext> {
        match &mut self.inner {
            FunctionType::Sign(s) => Some(s),
            _ => None,
        }
    }

    /// Take the active signing context, clearing the function
    pub fn take_sign(&mut self) -> Option<SignContext> {
        match core::mem::replace(&mut self.inner, FunctionType::None) {
            FunctionType::Sign(s) => Some(s),
            _ => None,
        }
    }

    /// Check whether a signing context is active
    pub fn is_signing(&self) -> bool {
        matches!(self.inner, FunctionType::Sign(_))
    }

    /// Drop any active context
    pub fn clear(&mut self) {
        self.inner = FunctionType::None;
    }
}

/// Message classification, by magic byte
#[derive(Clone, Debug)]
enum Message {
    Unknown,
    Operations(OperationParser),
    Baking(BakingCollector),
}

/// Decoded message content on completion
#[derive(Clone, PartialEq, Debug)]
pub enum Payload {
    Baking(BakingData),
    Operations(OperationGroup),
}

/// Signing request context
pub struct SignContext {
    pub curve: DerivationType,
    pub path: Bip32Path,
    pub signer: Signer,
    hasher: MessageHasher,
    message: Message,
}

impl SignContext {
    /// Push a message packet, updating the hash and routing data to the
    /// parser selected by the first message byte
    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        self.hasher.update(data);

        if let (Message::Unknown, Some(b)) = (&self.message, data.first()) {
            self.message = match *b {
                MAGIC_OPERATION => Message::Operations(OperationParser::new(self.signer.clone())),
                b if is_baking_magic(b) => Message::Baking(BakingCollector::new()),
                _ => {
                    #[cfg(feature = "log")]
                    log::warn!("unrecognised message magic: 0x{:02x}", b);

                    return Err(Error::ParseError);
                }
            };
        }

        match &mut self.message {
            Message::Unknown => Ok(()),
            Message::Operations(p) => p.feed(data),
            Message::Baking(c) => c.push(data),
        }
    }

    /// Complete the message, returning decoded contents and the message hash
    pub fn finish(self) -> Result<(Payload, [u8; MESSAGE_HASH_LEN]), Error> {
        let payload = match &self.message {
            Message::Unknown => return Err(Error::Incomplete),
            Message::Operations(p) => Payload::Operations(*p.finish()?),
            Message::Baking(c) => Payload::Baking(c.finish()?),
        };

        let mut hash = [0u8; MESSAGE_HASH_LEN];
        hash.copy_from_slice(&self.hasher.finalize());

        Ok((payload, hash))
    }
}
