// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Streaming operation group parser
//!
//! Operation groups (magic `0x03`) are decoded one byte at a time by an
//! explicit state machine, so a group may be split across any number of
//! packets while only a single fixed-size field is ever buffered.
//!
//! ```text
//! HEADER:    MAGIC(1) || BRANCH(32)
//! OPERATION: TAG(1) || SOURCE(21) || FEE(Z) || COUNTER(Z) || GAS_LIMIT(Z) || STORAGE_LIMIT(Z) || BODY
//!
//! REVEAL:      SIG_TYPE(1) || PUBLIC_KEY(32 | 33 | 48)
//! DELEGATION:  PRESENT(1) || [SIG_TYPE(1) || PKH(20)]
//! TRANSACTION: AMOUNT(Z) || DESTINATION(22) || PARAMETERS(1)
//! ```
//!
//! Any number of reveals may be included, with at most one other
//! (primary) operation per group.

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

use ledger_tezos_baking_apdu::types::SignatureType;

use crate::{
    driver::PublicKey,
    engine::Error,
    wire::ZarithDecoder,
};

/// Operation group magic byte
pub const MAGIC_OPERATION: u8 = 0x03;

/// Branch (block hash) length
pub const BRANCH_LEN: usize = 32;

/// Public key hash length
pub const PKH_LEN: usize = 20;

/// Group header length (magic and branch)
const HEADER_LEN: usize = 1 + BRANCH_LEN;

/// Implicit contract length (signature type and key hash)
const IMPLICIT_LEN: usize = 1 + PKH_LEN;

/// Contract length (discriminant, hash and type / padding)
const CONTRACT_LEN: usize = 22;

/// Largest fixed length field (BLS public key)
const MAX_FIELD_LEN: usize = 48;

/// Recognised operation tags
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum OperationTag {
    Reveal = 107,
    Transaction = 108,
    Delegation = 110,
}

/// Implicit (`tz`) account, identified by key hash
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ImplicitContract {
    pub signature_type: SignatureType,
    pub pkh: [u8; PKH_LEN],
}

impl ImplicitContract {
    /// Decode from `SIG_TYPE(1) || PKH(20)`
    pub fn decode(buff: &[u8]) -> Result<Self, Error> {
        if buff.len() < IMPLICIT_LEN {
            return Err(Error::Incomplete);
        }

        let signature_type = SignatureType::try_from(buff[0]).map_err(|_| Error::ParseError)?;

        let mut pkh = [0u8; PKH_LEN];
        pkh.copy_from_slice(&buff[1..IMPLICIT_LEN]);

        Ok(Self {
            signature_type,
            pkh,
        })
    }
}

/// Transaction destination
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Contract {
    /// Implicit account
    Implicit(ImplicitContract),
    /// Originated (`KT1`) contract
    Originated([u8; PKH_LEN]),
}

impl Contract {
    /// Decode from the 22 byte contract encoding
    pub fn decode(buff: &[u8]) -> Result<Self, Error> {
        if buff.len() < CONTRACT_LEN {
            return Err(Error::Incomplete);
        }

        match buff[0] {
            0x00 => ImplicitContract::decode(&buff[1..]).map(Contract::Implicit),
            0x01 if buff[CONTRACT_LEN - 1] == 0 => {
                let mut hash = [0u8; PKH_LEN];
                hash.copy_from_slice(&buff[1..][..PKH_LEN]);
                Ok(Contract::Originated(hash))
            }
            _ => Err(Error::ParseError),
        }
    }
}

/// Key used to sign the group, every operation source must match
#[derive(Clone, PartialEq, Debug)]
pub struct Signer {
    pub contract: ImplicitContract,
    /// Compressed public key, compared against reveals
    pub public_key: PublicKey,
}

/// Kind-specific operation fields
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OperationKind {
    Reveal,
    Delegation {
        delegate: Option<ImplicitContract>,
    },
    Transaction {
        amount: u64,
        destination: Contract,
    },
}

impl OperationKind {
    /// Wire tag for this kind
    pub fn tag(&self) -> OperationTag {
        match self {
            OperationKind::Reveal => OperationTag::Reveal,
            OperationKind::Delegation { .. } => OperationTag::Delegation,
            OperationKind::Transaction { .. } => OperationTag::Transaction,
        }
    }
}

/// A single decoded operation
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Operation {
    pub source: ImplicitContract,
    pub fee: u64,
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
    pub kind: OperationKind,
}

impl Operation {
    fn new(tag: OperationTag, source: ImplicitContract) -> Self {
        let kind = match tag {
            OperationTag::Reveal => OperationKind::Reveal,
            OperationTag::Delegation => OperationKind::Delegation { delegate: None },
            // Destination is always overwritten before completion
            OperationTag::Transaction => OperationKind::Transaction {
                amount: 0,
                destination: Contract::Implicit(source),
            },
        };

        Self {
            source,
            fee: 0,
            counter: 0,
            gas_limit: 0,
            storage_limit: 0,
            kind,
        }
    }
}

/// Decoded operation group summary
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OperationGroup {
    pub branch: [u8; BRANCH_LEN],
    pub signer: ImplicitContract,
    pub reveal_count: u32,
    pub total_fee: u64,
    pub total_storage_limit: u64,
    /// The single non-reveal operation, if any
    pub primary: Option<Operation>,
}

impl OperationGroup {
    pub fn has_reveal(&self) -> bool {
        self.reveal_count > 0
    }

    /// Check whether the group is a delegation of the signer to itself
    pub fn is_self_delegation(&self) -> bool {
        match &self.primary {
            Some(Operation {
                source,
                kind: OperationKind::Delegation {
                    delegate: Some(d), ..
                },
                ..
            }) => *source == self.signer && *d == self.signer,
            _ => false,
        }
    }

    /// Check whether the group contains only reveals of the signer key
    pub fn is_reveal_only(&self) -> bool {
        self.primary.is_none() && self.has_reveal()
    }
}

/// Parser position in the operation grammar
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum Step {
    Header,
    Tag,
    Source,
    Fee,
    Counter,
    GasLimit,
    StorageLimit,
    RevealKeyType,
    RevealKey,
    DelegatePresence,
    Delegate,
    Amount,
    Destination,
    Parameters,
    /// Terminal failure, all further input is rejected
    Failed,
}

/// Fixed length field accumulator
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
struct FixedField {
    buff: [u8; MAX_FIELD_LEN],
    fill: usize,
    len: usize,
}

impl FixedField {
    fn new(len: usize) -> Self {
        Self {
            buff: [0u8; MAX_FIELD_LEN],
            fill: 0,
            len,
        }
    }
}

/// Sub-parser for the field at the current step
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Field {
    /// Single byte steps
    Byte,
    Integer(ZarithDecoder),
    Fixed(FixedField),
}

/// Resumable operation group parser
#[derive(Clone, PartialEq, Debug)]
pub struct OperationParser {
    step: Step,
    field: Field,
    tag: Option<OperationTag>,
    signer: Signer,
    current: Option<Operation>,
    group: OperationGroup,
}

impl OperationParser {
    /// Create a parser for a group signed by `signer`
    pub fn new(signer: Signer) -> Self {
        let group = OperationGroup {
            branch: [0u8; BRANCH_LEN],
            signer: signer.contract,
            reveal_count: 0,
            total_fee: 0,
            total_storage_limit: 0,
            primary: None,
        };

        Self {
            step: Step::Header,
            field: Field::Fixed(FixedField::new(HEADER_LEN)),
            tag: None,
            signer,
            current: None,
            group,
        }
    }

    /// Current grammar position
    pub fn step(&self) -> Step {
        self.step
    }

    /// Feed message bytes, any failure latches the parser into [Step::Failed]
    pub fn feed(&mut self, data: &[u8]) -> Result<(), Error> {
        for b in data {
            if let Err(e) = self.step_byte(*b) {
                #[cfg(feature = "log")]
                log::warn!("operation parse failed at {}: {:?}", self.step, e);

                self.step = Step::Failed;
                self.field = Field::Byte;
                return Err(e);
            }
        }

        Ok(())
    }

    /// Complete parsing, the group must end on an operation boundary
    /// and contain at least one operation
    pub fn finish(&self) -> Result<&OperationGroup, Error> {
        match self.step {
            Step::Failed => Err(Error::ParseError),
            Step::Tag if self.group.has_reveal() || self.group.primary.is_some() => {
                Ok(&self.group)
            }
            _ => Err(Error::Incomplete),
        }
    }

    fn enter(&mut self, step: Step) {
        let field = match step {
            Step::Header => Field::Fixed(FixedField::new(HEADER_LEN)),
            Step::Source | Step::Delegate => Field::Fixed(FixedField::new(IMPLICIT_LEN)),
            Step::Destination => Field::Fixed(FixedField::new(CONTRACT_LEN)),
            Step::RevealKey => Field::Fixed(FixedField::new(
                self.signer.contract.signature_type.public_key_len(),
            )),
            Step::Fee | Step::Counter | Step::GasLimit | Step::StorageLimit | Step::Amount => {
                Field::Integer(ZarithDecoder::new())
            }
            _ => Field::Byte,
        };

        self.step = step;
        self.field = field;
    }

    fn step_byte(&mut self, b: u8) -> Result<(), Error> {
        match self.step {
            Step::Failed => return Err(Error::ParseError),
            Step::Tag => return self.on_tag(b),
            Step::RevealKeyType => {
                if b != self.signer.contract.signature_type as u8 {
                    return Err(Error::ParseError);
                }
                self.enter(Step::RevealKey);
                return Ok(());
            }
            Step::DelegatePresence => {
                if b == 0 {
                    return self.complete();
                }
                self.enter(Step::Delegate);
                return Ok(());
            }
            Step::Parameters => {
                // Contract calls are never signed
                if b != 0 {
                    return Err(Error::ParseError);
                }
                return self.complete();
            }
            _ => (),
        }

        match &mut self.field {
            Field::Fixed(f) => {
                f.buff[f.fill] = b;
                f.fill += 1;

                if f.fill == f.len {
                    let done = *f;
                    self.on_fixed(&done.buff[..done.len])?;
                }
                Ok(())
            }
            Field::Integer(z) => match z.push(b)? {
                Some(v) => self.on_integer(v),
                None => Ok(()),
            },
            Field::Byte => Err(Error::ParseError),
        }
    }

    fn on_tag(&mut self, b: u8) -> Result<(), Error> {
        let tag = OperationTag::try_from(b).map_err(|_| Error::UnknownTag)?;

        if tag != OperationTag::Reveal && self.group.primary.is_some() {
            return Err(Error::DuplicateOperation);
        }

        self.tag = Some(tag);
        self.current = Some(Operation::new(tag, self.signer.contract));
        self.enter(Step::Source);

        Ok(())
    }

    fn on_fixed(&mut self, data: &[u8]) -> Result<(), Error> {
        match self.step {
            Step::Header => {
                if data[0] != MAGIC_OPERATION {
                    return Err(Error::ParseError);
                }
                self.group.branch.copy_from_slice(&data[1..]);
                self.enter(Step::Tag);
            }
            Step::Source => {
                let source = ImplicitContract::decode(data)?;
                if source != self.signer.contract {
                    return Err(Error::ParseError);
                }
                self.current_mut()?.source = source;
                self.enter(Step::Fee);
            }
            Step::RevealKey => {
                if data != &self.signer.public_key[..] {
                    return Err(Error::ParseError);
                }
                self.complete()?;
            }
            Step::Delegate => {
                let delegate = ImplicitContract::decode(data)?;
                self.current_mut()?.kind = OperationKind::Delegation {
                    delegate: Some(delegate),
                };
                self.complete()?;
            }
            Step::Destination => {
                let destination = Contract::decode(data)?;
                if let OperationKind::Transaction { destination: d, .. } =
                    &mut self.current_mut()?.kind
                {
                    *d = destination;
                }
                self.enter(Step::Parameters);
            }
            _ => return Err(Error::ParseError),
        }

        Ok(())
    }

    fn on_integer(&mut self, v: u64) -> Result<(), Error> {
        match self.step {
            Step::Fee => {
                self.current_mut()?.fee = v;
                self.group.total_fee = self
                    .group
                    .total_fee
                    .checked_add(v)
                    .ok_or(Error::Overflow)?;
                self.enter(Step::Counter);
            }
            Step::Counter => {
                self.current_mut()?.counter = v;
                self.enter(Step::GasLimit);
            }
            Step::GasLimit => {
                self.current_mut()?.gas_limit = v;
                self.enter(Step::StorageLimit);
            }
            Step::StorageLimit => {
                self.current_mut()?.storage_limit = v;
                self.group.total_storage_limit = self
                    .group
                    .total_storage_limit
                    .checked_add(v)
                    .ok_or(Error::Overflow)?;

                match self.tag {
                    Some(OperationTag::Reveal) => self.enter(Step::RevealKeyType),
                    Some(OperationTag::Delegation) => self.enter(Step::DelegatePresence),
                    Some(OperationTag::Transaction) => self.enter(Step::Amount),
                    None => return Err(Error::ParseError),
                }
            }
            Step::Amount => {
                if let OperationKind::Transaction { amount, .. } = &mut self.current_mut()?.kind {
                    *amount = v;
                }
                self.enter(Step::Destination);
            }
            _ => return Err(Error::ParseError),
        }

        Ok(())
    }

    /// Complete the current operation and return to the tag boundary
    fn complete(&mut self) -> Result<(), Error> {
        let op = self.current.take().ok_or(Error::ParseError)?;

        match op.kind {
            OperationKind::Reveal => {
                self.group.reveal_count = self
                    .group
                    .reveal_count
                    .checked_add(1)
                    .ok_or(Error::Overflow)?;
            }
            _ => {
                if self.group.primary.is_some() {
                    return Err(Error::DuplicateOperation);
                }
                self.group.primary = Some(op);
            }
        }

        self.tag = None;
        self.enter(Step::Tag);

        Ok(())
    }

    fn current_mut(&mut self) -> Result<&mut Operation, Error> {
        self.current.as_mut().ok_or(Error::ParseError)
    }
}
