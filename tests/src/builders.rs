// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Message builders and shared vectors
//!
//! Produces the Tezos binary encodings of blocks, consensus operations
//! and manager operation groups accepted by the baking engine.

use blake2::{
    digest::{consts::U20, consts::U32, Digest},
    Blake2b,
};
use lazy_static::lazy_static;
use rand::{thread_rng, Rng};

use ledger_tezos_baking_apdu::{path::Bip32Path, types::DerivationType};

/// Main chain id used by test flows (`NetXdQprcVkpaWU`)
pub const MAIN_CHAIN_ID: u32 = 0x7a06_a770;

/// Chain id of a secondary (test) chain
pub const TEST_CHAIN_ID: u32 = 0x9caf_2e42;

pub const MAGIC_BLOCK: u8 = 0x11;
pub const MAGIC_PREATTESTATION: u8 = 0x12;
pub const MAGIC_ATTESTATION: u8 = 0x13;
pub const MAGIC_OPERATION: u8 = 0x03;

pub const TAG_PREATTESTATION: u8 = 20;
pub const TAG_ATTESTATION: u8 = 21;
pub const TAG_REVEAL: u8 = 107;
pub const TAG_TRANSACTION: u8 = 108;
pub const TAG_DELEGATION: u8 = 110;

/// Tenderbake fitness version
const FITNESS_VERSION: u8 = 2;

lazy_static! {
    /// Baking key path `m/44'/1729'/0'/0'`
    pub static ref BAKING_PATH: Bip32Path =
        Bip32Path::from_slice(&[0x8000_002c, 0x8000_06c1, 0x8000_0000, 0x8000_0000]).unwrap();

    /// Alternate (non-baking) key path `m/44'/1729'/1'/0'`
    pub static ref OTHER_PATH: Bip32Path =
        Bip32Path::from_slice(&[0x8000_002c, 0x8000_06c1, 0x8000_0001, 0x8000_0000]).unwrap();

    /// Block branch used by operation groups
    pub static ref BRANCH: [u8; 32] = core::array::from_fn(|i| 0xa0 ^ i as u8);
}

/// Encode a Zarith (LEB128-style) natural
pub fn zarith(mut v: u64) -> Vec<u8> {
    let mut b = vec![];

    loop {
        let c = (v & 0x7f) as u8;
        v >>= 7;

        if v == 0 {
            b.push(c);
            return b;
        }

        b.push(c | 0x80);
    }
}

/// Compute the blake2b-256 message hash signed by the engine
pub fn message_hash(message: &[u8]) -> [u8; 32] {
    let mut h = Blake2b::<U32>::new();
    h.update(message);
    h.finalize().into()
}

/// Compute the blake2b-160 public key hash
pub fn public_key_hash(public_key: &[u8]) -> [u8; 20] {
    let mut h = Blake2b::<U20>::new();
    h.update(public_key);
    h.finalize().into()
}

/// Implicit account, identified by a compressed public key
#[derive(Clone, PartialEq, Debug)]
pub struct Account {
    pub curve: DerivationType,
    pub public_key: Vec<u8>,
}

impl Account {
    pub fn new(curve: DerivationType, public_key: &[u8]) -> Self {
        Self {
            curve,
            public_key: public_key.to_vec(),
        }
    }

    /// Implicit account encoding, `SIG_TYPE || PKH`
    pub fn implicit(&self) -> Vec<u8> {
        let mut b = vec![self.curve.signature_type() as u8];
        b.extend_from_slice(&public_key_hash(&self.public_key));
        b
    }

    /// Contract (transaction destination) encoding
    pub fn contract(&self) -> Vec<u8> {
        let mut b = vec![0x00];
        b.extend_from_slice(&self.implicit());
        b
    }
}

/// Manager operation fields
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Manager {
    pub fee: u64,
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
}

impl Default for Manager {
    fn default() -> Self {
        Self {
            fee: 1_420,
            counter: 4_131_218,
            gas_limit: 10_600,
            storage_limit: 0,
        }
    }
}

/// Operation group builder
#[derive(Clone, PartialEq, Debug)]
pub struct OperationGroup {
    buff: Vec<u8>,
}

impl OperationGroup {
    /// Start a group on the provided branch
    pub fn new(branch: &[u8; 32]) -> Self {
        let mut buff = vec![MAGIC_OPERATION];
        buff.extend_from_slice(branch);
        Self { buff }
    }

    fn manager(&mut self, tag: u8, source: &Account, m: &Manager) {
        self.buff.push(tag);
        self.buff.extend_from_slice(&source.implicit());
        self.buff.extend_from_slice(&zarith(m.fee));
        self.buff.extend_from_slice(&zarith(m.counter));
        self.buff.extend_from_slice(&zarith(m.gas_limit));
        self.buff.extend_from_slice(&zarith(m.storage_limit));
    }

    /// Append a reveal of the source public key
    pub fn reveal(mut self, source: &Account, m: &Manager) -> Self {
        self.manager(TAG_REVEAL, source, m);
        self.buff.push(source.curve.signature_type() as u8);
        self.buff.extend_from_slice(&source.public_key);
        self
    }

    /// Append a delegation, `None` withdraws the delegate
    pub fn delegation(mut self, source: &Account, delegate: Option<&Account>, m: &Manager) -> Self {
        self.manager(TAG_DELEGATION, source, m);
        match delegate {
            Some(d) => {
                self.buff.push(0xff);
                self.buff.extend_from_slice(&d.implicit());
            }
            None => self.buff.push(0x00),
        }
        self
    }

    /// Append a plain transfer
    pub fn transaction(mut self, source: &Account, amount: u64, dest: &Account, m: &Manager) -> Self {
        self.manager(TAG_TRANSACTION, source, m);
        self.buff.extend_from_slice(&zarith(amount));
        self.buff.extend_from_slice(&dest.contract());
        // No parameters
        self.buff.push(0x00);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buff
    }
}

/// Build a block header with a Tenderbake fitness
pub fn block(chain_id: u32, level: u32, round: u32) -> Vec<u8> {
    let mut b = vec![MAGIC_BLOCK];
    b.extend_from_slice(&chain_id.to_be_bytes());
    b.extend_from_slice(&level.to_be_bytes());
    // Proto
    b.push(0x12);
    // Predecessor
    b.extend_from_slice(&[0x5b; 32]);
    // Timestamp
    b.extend_from_slice(&1_700_000_000u64.to_be_bytes());
    // Validation pass
    b.push(0x04);
    // Operations hash
    b.extend_from_slice(&[0x3c; 32]);

    let mut fitness = vec![];
    fitness.extend_from_slice(&[0, 0, 0, 1, FITNESS_VERSION]);
    fitness.extend_from_slice(&[0, 0, 0, 4]);
    fitness.extend_from_slice(&level.to_be_bytes());
    // No locked round
    fitness.extend_from_slice(&[0, 0, 0, 0]);
    fitness.extend_from_slice(&[0, 0, 0, 4, 0xff, 0xff, 0xff, 0xff]);
    fitness.extend_from_slice(&[0, 0, 0, 4]);
    fitness.extend_from_slice(&round.to_be_bytes());

    b.extend_from_slice(&(fitness.len() as u32).to_be_bytes());
    b.extend_from_slice(&fitness);

    // Context, payload hash and proof of work
    b.extend_from_slice(&[0xe1; 32]);
    b.extend_from_slice(&[0xe2; 32]);
    b.extend_from_slice(&[0xe3; 8]);
    b.push(0x00);

    b
}

fn consensus(magic: u8, tag: u8, chain_id: u32, level: u32, round: u32) -> Vec<u8> {
    let mut b = vec![magic];
    b.extend_from_slice(&chain_id.to_be_bytes());
    b.extend_from_slice(&BRANCH[..]);
    b.push(tag);
    // Slot
    b.extend_from_slice(&[0x00, 0x07]);
    b.extend_from_slice(&level.to_be_bytes());
    b.extend_from_slice(&round.to_be_bytes());
    // Block payload hash
    b.extend_from_slice(&[0xd4; 32]);
    b
}

/// Build a preattestation
pub fn preattestation(chain_id: u32, level: u32, round: u32) -> Vec<u8> {
    consensus(MAGIC_PREATTESTATION, TAG_PREATTESTATION, chain_id, level, round)
}

/// Build an attestation
pub fn attestation(chain_id: u32, level: u32, round: u32) -> Vec<u8> {
    consensus(MAGIC_ATTESTATION, TAG_ATTESTATION, chain_id, level, round)
}

/// Split a message length into random chunk sizes of at most `max` bytes
pub fn random_partition(len: usize, max: usize) -> Vec<usize> {
    let mut rng = thread_rng();
    let mut chunks = vec![];

    let mut remaining = len;
    while remaining > 0 {
        let n = rng.gen_range(1..=remaining.min(max));
        chunks.push(n);
        remaining -= n;
    }

    chunks
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zarith_encoding() {
        assert_eq!(zarith(0), vec![0x00]);
        assert_eq!(zarith(127), vec![0x7f]);
        assert_eq!(zarith(128), vec![0x80, 0x01]);
        assert_eq!(zarith(300), vec![0xac, 0x02]);
    }

    #[test]
    fn consensus_layout() {
        let a = attestation(MAIN_CHAIN_ID, 0x0102_0304, 5);
        assert_eq!(a.len(), 80);
        assert_eq!(a[37], TAG_ATTESTATION);
        assert_eq!(&a[40..44], &[1, 2, 3, 4]);
        assert_eq!(&a[44..48], &[0, 0, 0, 5]);
    }

    #[test]
    fn partition_covers_message() {
        for _ in 0..32 {
            let p = random_partition(200, 17);
            assert_eq!(p.iter().sum::<usize>(), 200);
            assert!(p.iter().all(|n| *n >= 1 && *n <= 17));
        }
    }
}
