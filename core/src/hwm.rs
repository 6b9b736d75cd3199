// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! High watermark guard
//!
//! Each chain (main and test) tracks the highest (level, round) signed,
//! along with the consensus votes cast at that position. Requests are
//! accepted only when strictly above the watermark, or at the watermark
//! to cast a vote not yet cast.
//!
//! Authorization is split from commit so the caller can produce a
//! signature before the watermark is durably raised, and drop the
//! signature if the commit fails.

use core::cmp::Ordering;

use strum::{Display, EnumIter};

use crate::{baking::BakingKind, engine::Error, wire::is_valid_level};

/// Watermark for a single chain
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct HighWatermark {
    pub highest_level: u32,
    pub highest_round: u32,
    pub had_attestation: bool,
    pub had_preattestation: bool,
    /// Set once a round-based (Tenderbake) request has been signed
    pub migrated: bool,
}

impl HighWatermark {
    /// Create a watermark at `level`, round zero with no votes cast
    pub const fn at_level(level: u32) -> Self {
        Self {
            highest_level: level,
            highest_round: 0,
            had_attestation: false,
            had_preattestation: false,
            migrated: false,
        }
    }

    /// Check whether a request may be signed against this watermark
    pub fn permits(&self, level: u32, round: u32, kind: BakingKind) -> bool {
        if !is_valid_level(level) {
            return false;
        }

        match (level, round).cmp(&(self.highest_level, self.highest_round)) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match kind {
                BakingKind::Block => false,
                BakingKind::Attestation => !self.had_attestation,
                BakingKind::Preattestation => !self.had_attestation && !self.had_preattestation,
            },
        }
    }

    /// Apply an authorized request
    fn apply(&mut self, level: u32, round: u32, kind: BakingKind) {
        if (level, round) > (self.highest_level, self.highest_round) {
            self.had_attestation = false;
            self.had_preattestation = false;
        }

        self.highest_level = level;
        self.highest_round = round;

        match kind {
            BakingKind::Attestation => self.had_attestation = true,
            BakingKind::Preattestation => self.had_preattestation = true,
            BakingKind::Block => (),
        }

        self.migrated = true;
    }

    /// Reset to `level` with round zero and no votes
    fn reset(&mut self, level: u32) {
        self.highest_level = level;
        self.highest_round = 0;
        self.had_attestation = false;
        self.had_preattestation = false;
    }
}

/// Watermark selector
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum Chain {
    Main,
    Test,
}

/// Reset target
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum ResetTarget {
    Main,
    Test,
    All,
}

/// Token issued by [HwmGuard::authorize], carrying the update
/// to be applied by [HwmGuard::commit]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[must_use]
pub struct Authorization {
    chain: Chain,
    level: u32,
    round: u32,
    kind: BakingKind,
}

impl Authorization {
    pub fn chain(&self) -> Chain {
        self.chain
    }
}

/// Per-chain high watermarks
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct HwmGuard {
    /// Main chain id, zero selects main for every chain
    pub main_chain_id: u32,
    pub main: HighWatermark,
    pub test: HighWatermark,
}

impl HwmGuard {
    pub const fn new() -> Self {
        Self {
            main_chain_id: 0,
            main: HighWatermark::at_level(0),
            test: HighWatermark::at_level(0),
        }
    }

    /// Select the watermark for a chain id
    pub fn select(&self, chain_id: u32) -> Chain {
        match self.main_chain_id {
            0 => Chain::Main,
            id if id == chain_id => Chain::Main,
            _ => Chain::Test,
        }
    }

    /// Fetch a watermark
    pub fn get(&self, chain: Chain) -> &HighWatermark {
        match chain {
            Chain::Main => &self.main,
            Chain::Test => &self.test,
        }
    }

    fn get_mut(&mut self, chain: Chain) -> &mut HighWatermark {
        match chain {
            Chain::Main => &mut self.main,
            Chain::Test => &mut self.test,
        }
    }

    /// Fetch the watermark for a chain id
    pub fn query(&self, chain_id: u32) -> &HighWatermark {
        self.get(self.select(chain_id))
    }

    /// Check a signing request against the watermark for its chain
    pub fn authorize(
        &self,
        chain_id: u32,
        level: u32,
        round: u32,
        kind: BakingKind,
    ) -> Result<Authorization, Error> {
        let chain = self.select(chain_id);

        if !self.get(chain).permits(level, round, kind) {
            #[cfg(feature = "log")]
            log::warn!(
                "watermark rejected {} at {}/{} on {} chain",
                kind,
                level,
                round,
                chain
            );

            return Err(Error::WatermarkRejected);
        }

        Ok(Authorization {
            chain,
            level,
            round,
            kind,
        })
    }

    /// Apply an authorization, the caller is responsible for persisting the result
    pub fn commit(&mut self, a: Authorization) {
        self.get_mut(a.chain).apply(a.level, a.round, a.kind);
    }

    /// Reset watermarks to `level` with round zero
    pub fn reset(&mut self, target: ResetTarget, level: u32) -> Result<(), Error> {
        if !is_valid_level(level) {
            return Err(Error::InvalidLevel);
        }

        match target {
            ResetTarget::Main => self.main.reset(level),
            ResetTarget::Test => self.test.reset(level),
            ResetTarget::All => {
                self.main.reset(level);
                self.test.reset(level);
            }
        }

        Ok(())
    }
}
