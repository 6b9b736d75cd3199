// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Baking (consensus) data parser
//!
//! Blocks and consensus operations are signed without a full parse, only
//! the fixed header is needed to check the signing request against the
//! high watermark. The message prefix is collected across packets and
//! decoded once the final packet arrives.

use heapless::Vec;
use strum::{Display, EnumIter};

use crate::{
    engine::Error,
    wire::{read_u32_be, read_u8},
};

/// Block magic byte
pub const MAGIC_BLOCK: u8 = 0x11;
/// Preattestation magic byte
pub const MAGIC_PREATTESTATION: u8 = 0x12;
/// Attestation magic byte
pub const MAGIC_ATTESTATION: u8 = 0x13;

/// Length of message prefix retained for decoding
pub const MAX_BAKING_PREFIX: usize = 128;

/// Block header length up to and including the fitness size
const BLOCK_HEADER_LEN: usize = 1 + 4 + 4 + 1 + 32 + 8 + 1 + 32 + 4;

/// Fitness size bounds (without / with a locked round)
const MIN_FITNESS_SIZE: usize = 33;
const MAX_FITNESS_SIZE: usize = 37;

/// Tenderbake fitness version
const FITNESS_VERSION: u8 = 2;

/// Consensus operation length
const CONSENSUS_LEN: usize = 1 + 4 + 32 + 1 + 2 + 4 + 4 + 32;

const TAG_PREATTESTATION: u8 = 20;
const TAG_ATTESTATION: u8 = 21;
const TAG_ATTESTATION_DAL: u8 = 23;

/// Kind of baking data being signed
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum BakingKind {
    Block,
    Preattestation,
    Attestation,
}

impl BakingKind {
    /// Consensus votes are any non-block kind
    pub fn is_vote(&self) -> bool {
        !matches!(self, BakingKind::Block)
    }
}

/// Header fields of a block or consensus operation
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BakingData {
    pub chain_id: u32,
    pub level: u32,
    pub round: u32,
    pub kind: BakingKind,
}

/// Check whether a magic byte introduces baking data
pub fn is_baking_magic(b: u8) -> bool {
    matches!(b, MAGIC_BLOCK | MAGIC_PREATTESTATION | MAGIC_ATTESTATION)
}

/// Decode baking data from a message prefix
pub fn parse_baking_data(buff: &[u8]) -> Result<BakingData, Error> {
    match read_u8(buff, 0)? {
        MAGIC_BLOCK => parse_block(buff),
        MAGIC_PREATTESTATION | MAGIC_ATTESTATION => parse_consensus(buff),
        _ => Err(Error::ParseError),
    }
}

fn parse_block(buff: &[u8]) -> Result<BakingData, Error> {
    if buff.len() < BLOCK_HEADER_LEN + MIN_FITNESS_SIZE {
        return Err(Error::Incomplete);
    }

    let fitness = &buff[BLOCK_HEADER_LEN..];

    // Each fitness field carries a 4 byte size prefix
    if fitness[4] != FITNESS_VERSION {
        return Err(Error::ParseError);
    }

    let fitness_size = read_u32_be(buff, BLOCK_HEADER_LEN - 4)? as usize;
    if !(MIN_FITNESS_SIZE..=MAX_FITNESS_SIZE).contains(&fitness_size)
        || fitness_size > fitness.len()
    {
        return Err(Error::ParseError);
    }

    Ok(BakingData {
        chain_id: read_u32_be(buff, 1)?,
        level: read_u32_be(buff, 5)?,
        round: read_u32_be(fitness, fitness_size - 4)?,
        kind: BakingKind::Block,
    })
}

fn parse_consensus(buff: &[u8]) -> Result<BakingData, Error> {
    if buff.len() < CONSENSUS_LEN {
        return Err(Error::Incomplete);
    }

    let kind = match buff[37] {
        TAG_PREATTESTATION => BakingKind::Preattestation,
        TAG_ATTESTATION | TAG_ATTESTATION_DAL => BakingKind::Attestation,
        _ => return Err(Error::ParseError),
    };

    Ok(BakingData {
        chain_id: read_u32_be(buff, 1)?,
        level: read_u32_be(buff, 40)?,
        round: read_u32_be(buff, 44)?,
        kind,
    })
}

/// Collects the baking data prefix across packets
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BakingCollector {
    prefix: Vec<u8, MAX_BAKING_PREFIX>,
}

impl BakingCollector {
    pub const fn new() -> Self {
        Self { prefix: Vec::new() }
    }

    /// Push message data, the magic byte is checked on first use
    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.prefix.is_empty() {
            match data.first() {
                Some(b) if !is_baking_magic(*b) => return Err(Error::ParseError),
                _ => (),
            }
        }

        let n = (self.prefix.capacity() - self.prefix.len()).min(data.len());
        self.prefix
            .extend_from_slice(&data[..n])
            .map_err(|_| Error::Unknown)?;

        Ok(())
    }

    /// Decode collected data
    pub fn finish(&self) -> Result<BakingData, Error> {
        parse_baking_data(&self.prefix)
    }
}
