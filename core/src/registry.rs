// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Authorized baking key registry

use ledger_tezos_baking_apdu::{path::Bip32Path, types::DerivationType};

use crate::engine::Error;

/// Baking key, a derivation path and curve
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BakingKey {
    pub path: Bip32Path,
    pub curve: DerivationType,
}

/// Holds the single key authorized for baking
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct KeyRegistry {
    key: Option<BakingKey>,
}

impl KeyRegistry {
    pub const fn new() -> Self {
        Self { key: None }
    }

    /// Restore a registry from a persisted key
    pub fn with_key(key: Option<BakingKey>) -> Self {
        Self { key }
    }

    /// Authorize a key for baking, replacing any existing key
    pub fn authorize_key(&mut self, path: &Bip32Path, curve: DerivationType) -> Result<(), Error> {
        if path.is_empty() {
            return Err(Error::InvalidPath);
        }

        self.key = Some(BakingKey {
            path: path.clone(),
            curve,
        });

        Ok(())
    }

    /// Clear the authorized key
    pub fn deauthorize(&mut self) {
        self.key = None;
    }

    /// Fetch the authorized key
    pub fn current(&self) -> Option<&BakingKey> {
        self.key.as_ref()
    }

    /// Check a path and curve against the authorized key
    pub fn is_authorized(&self, path: &Bip32Path, curve: DerivationType) -> bool {
        match &self.key {
            Some(k) => k.curve == curve && k.path == *path,
            None => false,
        }
    }
}
