// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Persistent record and storage interface
//!
//! The engine keeps a single [NvmData] record. Updates build the
//! complete next record and commit it through [Storage] before the
//! in-memory copy is replaced, so a failed commit leaves the previous
//! state in effect.
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    VERSION    |                 MAIN_CHAIN_ID                 :
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! :               |    MAIN_HWM (LEVEL(4), ROUND(4), FLAGS(1))    /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /               TEST_HWM (LEVEL(4), ROUND(4), FLAGS(1))         /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | HWM_DISABLED  |  KEY_CURVE    |   PATH_LEN    |               /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               /
//! /              PATH COMPONENTS (PATH_LEN * u32, BE)             /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! A zero `PATH_LEN` indicates no baking key is set.

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use ledger_tezos_baking_apdu::{
    path::{Bip32Path, MAX_BIP32_PATH_LEN},
    types::DerivationType,
};

use crate::{
    engine::Error,
    hwm::{HighWatermark, HwmGuard},
    registry::BakingKey,
};

/// Persistent record layout version, bump on any layout change
pub const NVM_VERSION: u8 = 1;

/// Encoded watermark length
const HWM_LEN: usize = 9;

/// Maximum encoded record length
pub const NVM_RECORD_LEN: usize = 1 + 4 + 2 * HWM_LEN + 1 + 2 + MAX_BIP32_PATH_LEN * 4;

bitflags::bitflags! {
    /// Persisted watermark flags
    pub struct HwmFlags: u8 {
        const HAD_ATTESTATION = 1 << 0;
        const HAD_PREATTESTATION = 1 << 1;
        const MIGRATED = 1 << 2;
    }
}

/// Persistent engine state
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct NvmData {
    pub hwm: HwmGuard,
    /// Watermarks are enforced in memory only, commits are not persisted
    pub hwm_disabled: bool,
    pub baking_key: Option<BakingKey>,
}

fn encode_hwm(w: &HighWatermark, buff: &mut [u8]) -> usize {
    BigEndian::write_u32(&mut buff[0..4], w.highest_level);
    BigEndian::write_u32(&mut buff[4..8], w.highest_round);

    let mut flags = HwmFlags::empty();
    flags.set(HwmFlags::HAD_ATTESTATION, w.had_attestation);
    flags.set(HwmFlags::HAD_PREATTESTATION, w.had_preattestation);
    flags.set(HwmFlags::MIGRATED, w.migrated);
    buff[8] = flags.bits();

    HWM_LEN
}

fn decode_hwm(buff: &[u8]) -> Result<HighWatermark, Error> {
    let flags = HwmFlags::from_bits(buff[8]).ok_or(Error::StorageError)?;

    Ok(HighWatermark {
        highest_level: BigEndian::read_u32(&buff[0..4]),
        highest_round: BigEndian::read_u32(&buff[4..8]),
        had_attestation: flags.contains(HwmFlags::HAD_ATTESTATION),
        had_preattestation: flags.contains(HwmFlags::HAD_PREATTESTATION),
        migrated: flags.contains(HwmFlags::MIGRATED),
    })
}

impl Encode for NvmData {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        let path_len = match &self.baking_key {
            Some(k) => k.path.len() * 4,
            None => 0,
        };
        Ok(1 + 4 + 2 * HWM_LEN + 1 + 2 + path_len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(Error::StorageError);
        }

        let mut index = 0;

        buff[index] = NVM_VERSION;
        index += 1;

        BigEndian::write_u32(&mut buff[index..][..4], self.hwm.main_chain_id);
        index += 4;

        index += encode_hwm(&self.hwm.main, &mut buff[index..]);
        index += encode_hwm(&self.hwm.test, &mut buff[index..]);

        buff[index] = self.hwm_disabled as u8;
        index += 1;

        match &self.baking_key {
            Some(k) => {
                buff[index] = k.curve as u8;
                buff[index + 1] = k.path.len() as u8;
                index += 2;

                for c in k.path.components() {
                    BigEndian::write_u32(&mut buff[index..][..4], *c);
                    index += 4;
                }
            }
            None => {
                buff[index..][..2].copy_from_slice(&[0x00, 0x00]);
                index += 2;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for NvmData {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let fixed = 1 + 4 + 2 * HWM_LEN + 1 + 2;
        if buff.len() < fixed {
            return Err(Error::StorageError);
        }

        if buff[0] != NVM_VERSION {
            return Err(Error::StorageError);
        }

        let mut index = 1;

        let main_chain_id = BigEndian::read_u32(&buff[index..][..4]);
        index += 4;

        let main = decode_hwm(&buff[index..][..HWM_LEN])?;
        index += HWM_LEN;
        let test = decode_hwm(&buff[index..][..HWM_LEN])?;
        index += HWM_LEN;

        let hwm_disabled = match buff[index] {
            0 => false,
            1 => true,
            _ => return Err(Error::StorageError),
        };
        index += 1;

        let curve = buff[index];
        let path_len = buff[index + 1] as usize;
        index += 2;

        let baking_key = match path_len {
            0 => None,
            _ if path_len > MAX_BIP32_PATH_LEN => return Err(Error::StorageError),
            _ => {
                let components = buff
                    .get(index..index + path_len * 4)
                    .ok_or(Error::StorageError)?;
                index += path_len * 4;

                let mut path = Vec::<u32, MAX_BIP32_PATH_LEN>::new();
                for c in components.chunks_exact(4) {
                    path.push(BigEndian::read_u32(c))
                        .map_err(|_| Error::StorageError)?;
                }

                Some(BakingKey {
                    path: Bip32Path::from_slice(&path).map_err(|_| Error::StorageError)?,
                    curve: DerivationType::try_from(curve).map_err(|_| Error::StorageError)?,
                })
            }
        };

        Ok((
            Self {
                hwm: HwmGuard {
                    main_chain_id,
                    main,
                    test,
                },
                hwm_disabled,
                baking_key,
            },
            index,
        ))
    }
}

/// Durable storage for the engine record
pub trait Storage {
    /// Read the persisted record into `buff`, returning its length (zero if empty)
    fn load(&self, buff: &mut [u8]) -> Result<usize, Error>;

    /// Atomically replace the persisted record
    fn commit(&mut self, data: &[u8]) -> Result<(), Error>;
}

impl<T: Storage> Storage for &mut T {
    fn load(&self, buff: &mut [u8]) -> Result<usize, Error> {
        T::load(self, buff)
    }

    fn commit(&mut self, data: &[u8]) -> Result<(), Error> {
        T::commit(self, data)
    }
}

/// In-memory [Storage], for simulation and tests
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct MemoryStorage {
    data: Vec<u8, NVM_RECORD_LEN>,
}

impl MemoryStorage {
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Raw persisted record
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Storage for MemoryStorage {
    fn load(&self, buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < self.data.len() {
            return Err(Error::StorageError);
        }

        buff[..self.data.len()].copy_from_slice(&self.data);
        Ok(self.data.len())
    }

    fn commit(&mut self, data: &[u8]) -> Result<(), Error> {
        self.data = Vec::from_slice(data).map_err(|_| Error::StorageError)?;
        Ok(())
    }
}
