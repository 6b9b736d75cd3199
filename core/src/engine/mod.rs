// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! The [Engine] provides the baking signer functionality required by hardware wallets.
//!
//! This handles [Event] inputs and returns [Output] responses to the caller,
//! see [apdu][crate::apdu] for APDU protocol / encoding definitions.
//!
//! Operations requiring operator approval (key authorization, setup, reset,
//! public key prompts and self-delegation) return [Output::Pending] and
//! hold a [Pending] value until [Engine::approve] or [Engine::deny] is called.
//! Nothing is mutated before approval.
//!
//! A persisted record that cannot be restored leaves the engine with unknown
//! watermarks. Baking signatures and record updates are then refused until
//! an approved setup or reset establishes new watermarks.

use encdec::{DecodeOwned, Encode};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};
use zeroize::Zeroize;

use ledger_tezos_baking_apdu::types::DerivationType;

use crate::{
    baking::BakingData,
    driver::{Driver, PublicKey},
    helpers::{key_bound_hmac, signer_for, HMAC_KEY_SEED, MESSAGE_HASH_LEN},
    hwm::{HwmGuard, ResetTarget},
    reassembler::{Packet, Reassembler},
    registry::{BakingKey, KeyRegistry},
    storage::{MemoryStorage, NvmData, Storage, NVM_RECORD_LEN},
    wire::is_valid_level,
};

mod dispatch;
pub use dispatch::Reply;

mod error;
pub use error::Error;

mod event;
pub use event::Event;
use event::read_path;

mod function;
pub use function::{Function, Payload, SignContext};

mod output;
pub use output::Output;

/// Application version, from the crate version
pub const APP_VERSION: (u8, u8, u8) = (
    parse_u8(env!("CARGO_PKG_VERSION_MAJOR")),
    parse_u8(env!("CARGO_PKG_VERSION_MINOR")),
    parse_u8(env!("CARGO_PKG_VERSION_PATCH")),
);

const fn parse_u8(s: &str) -> u8 {
    let b = s.as_bytes();
    let mut v = 0u8;
    let mut i = 0;
    while i < b.len() {
        v = v * 10 + (b[i] - b'0');
        i += 1;
    }
    v
}

/// Engine state, derived from the active function and pending confirmation
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// No request in progress
    Idle,
    /// Receiving a multi-packet signing request
    Signing,
    /// Awaiting operator confirmation
    Pending,
}

/// Request awaiting operator confirmation
#[derive(Clone, PartialEq, Debug)]
pub enum Pending {
    /// Display a public key
    PromptPublicKey { public_key: PublicKey },

    /// Authorize a baking key
    Authorize {
        key: BakingKey,
        public_key: PublicKey,
    },

    /// Authorize a baking key and configure chain and watermarks
    Setup {
        key: BakingKey,
        main_chain_id: u32,
        main_level: u32,
        test_level: u32,
        public_key: PublicKey,
    },

    /// Reset both watermarks
    Reset { level: u32 },

    /// Sign a self-delegation by the baking key
    SignDelegation {
        key: BakingKey,
        hash: [u8; MESSAGE_HASH_LEN],
        with_hash: bool,
    },
}

/// [Engine] provides hardware-independent support for Tezos baking operations
pub struct Engine<DRV: Driver, STO: Storage = MemoryStorage> {
    unlocked: bool,

    reassembler: Reassembler,
    function: Function,

    registry: KeyRegistry,

    /// Working watermarks, diverge from `nvm` only while tracking is disabled
    hwm: HwmGuard,

    /// Mirror of the persisted record
    nvm: NvmData,

    /// Persisted record failed to load, cleared by an approved setup or reset
    record_invalid: bool,

    pending: Option<Pending>,

    drv: DRV,
    sto: STO,
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new engine instance with the provided driver,
    /// using volatile [MemoryStorage]
    pub fn new(drv: DRV) -> Self {
        Self::new_with_storage(drv, MemoryStorage::new())
    }
}

impl<DRV: Driver, STO: Storage> Engine<DRV, STO> {
    /// Create a new engine instance with the provided driver and storage,
    /// restoring persisted state where available
    pub fn new_with_storage(drv: DRV, sto: STO) -> Self {
        let (nvm, record_invalid) = match load_record(&sto) {
            Ok(nvm) => (nvm, false),
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("persisted record invalid, setup or reset required: {:?}", _e);

                (NvmData::default(), true)
            }
        };

        Self {
            unlocked: false,
            reassembler: Reassembler::new(),
            function: Function::new(),
            registry: KeyRegistry::with_key(nvm.baking_key.clone()),
            hwm: nvm.hwm,
            nvm,
            record_invalid,
            pending: None,
            drv,
            sto,
        }
    }

    /// Handle incoming events
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {:02x?}", evt);

        let r = self.handle(evt);

        // Any failure aborts the active request
        if let Err(_e) = &r {
            #[cfg(feature = "log")]
            log::warn!("request failed: {:?}", _e);

            self.clear_sign();
        }

        r
    }

    fn handle(&mut self, evt: &Event) -> Result<Output, Error> {
        if self.pending.is_some() {
            return Err(Error::ApprovalPending);
        }

        match evt {
            Event::None => Ok(Output::None),

            Event::Version => {
                let (major, minor, patch) = APP_VERSION;
                Ok(Output::Version {
                    major,
                    minor,
                    patch,
                })
            }

            Event::GetPublicKey {
                curve,
                path,
                prompt,
            } => {
                let public_key = self.drv.public_key(*curve, path.components())?;

                match *prompt {
                    false => Ok(Output::PublicKey { public_key }),
                    true => self.set_pending(Pending::PromptPublicKey { public_key }),
                }
            }

            Event::AuthorizeBaking { curve, path } => {
                if self.record_invalid {
                    return Err(Error::RecordInvalid);
                }

                let key = match path {
                    Some(path) => BakingKey {
                        path: path.clone(),
                        curve: *curve,
                    },
                    // Re-authorize the stored key, path and curve
                    None => self.registry.current().cloned().ok_or(Error::NotFound)?,
                };

                let public_key = self.drv.public_key(key.curve, key.path.components())?;

                self.set_pending(Pending::Authorize { key, public_key })
            }

            Event::Sign {
                with_hash,
                p1,
                p2,
                data,
            } => self.sign_packet(*with_hash, *p1, *p2, data),

            Event::Reset { level } => {
                if !is_valid_level(*level) {
                    return Err(Error::InvalidLevel);
                }

                self.set_pending(Pending::Reset { level: *level })
            }

            Event::QueryAuthKey => Ok(Output::AuthKey {
                path: self.registry.current().map(|k| k.path.clone()),
            }),

            Event::QueryAuthKeyWithCurve => {
                let k = self.registry.current().ok_or(Error::NotFound)?;

                Ok(Output::AuthKeyWithCurve {
                    curve: k.curve,
                    path: k.path.clone(),
                })
            }

            Event::QueryMainHwm => {
                let w = &self.hwm.main;

                Ok(Output::MainHwm {
                    level: w.highest_level,
                    round: w.migrated.then_some(w.highest_round),
                })
            }

            Event::QueryAllHwm => {
                let (m, t) = (&self.hwm.main, &self.hwm.test);

                Ok(Output::AllHwm {
                    main_level: m.highest_level,
                    test_level: t.highest_level,
                    rounds: (m.migrated || t.migrated)
                        .then_some((m.highest_round, t.highest_round)),
                    main_chain_id: self.hwm.main_chain_id,
                })
            }

            Event::Setup {
                curve,
                path,
                main_chain_id,
                main_level,
                test_level,
            } => {
                if !is_valid_level(*main_level) || !is_valid_level(*test_level) {
                    return Err(Error::InvalidLevel);
                }

                let public_key = self.drv.public_key(*curve, path.components())?;

                self.set_pending(Pending::Setup {
                    key: BakingKey {
                        path: path.clone(),
                        curve: *curve,
                    },
                    main_chain_id: *main_chain_id,
                    main_level: *main_level,
                    test_level: *test_level,
                    public_key,
                })
            }

            Event::Deauthorize => {
                let mut registry = self.registry.clone();
                registry.deauthorize();

                self.persist(NvmData {
                    baking_key: registry.current().cloned(),
                    ..self.nvm.clone()
                })?;

                Ok(Output::None)
            }

            Event::Hmac {
                curve,
                path,
                message,
            } => {
                let mut seed_signature =
                    self.drv.sign(*curve, path.components(), &HMAC_KEY_SEED)?;
                let hmac = key_bound_hmac(&seed_signature, message);

                // Seed signature is key material
                seed_signature.as_mut_slice().zeroize();
                let hmac = hmac?;

                Ok(Output::Hmac { hmac })
            }
        }
    }

    /// Handle a signing packet
    #[cfg_attr(feature = "noinline", inline(never))]
    fn sign_packet(
        &mut self,
        with_hash: bool,
        p1: u8,
        p2: u8,
        data: &[u8],
    ) -> Result<Output, Error> {
        if !self.unlocked {
            return Err(Error::Locked);
        }

        match self.reassembler.accept(p1)? {
            Packet::First => {
                // Discard any previous message
                self.function.clear();

                let curve = DerivationType::try_from(p2).map_err(|_| Error::WrongParam)?;
                let (path, n) = read_path(data)?;
                if n != data.len() {
                    return Err(Error::TrailingData);
                }

                let public_key = self.drv.public_key(curve, path.components())?;
                let signer = signer_for(curve, public_key)?;

                self.function.sign_init(curve, path, signer);

                Ok(Output::None)
            }
            Packet::Next { last, .. } => {
                let ctx = self
                    .function
                    .sign_ctx_mut()
                    .ok_or(Error::UnexpectedPacket)?;
                ctx.push(data)?;

                if !last {
                    return Ok(Output::None);
                }

                let ctx = self.function.take_sign().ok_or(Error::UnexpectedPacket)?;
                self.reassembler.reset();

                self.sign_complete(ctx, with_hash)
            }
        }
    }

    /// Check a completed message against the registry and watermarks
    fn sign_complete(&mut self, ctx: SignContext, with_hash: bool) -> Result<Output, Error> {
        let key = BakingKey {
            path: ctx.path.clone(),
            curve: ctx.curve,
        };
        let authorized = self.registry.is_authorized(&key.path, key.curve);

        let (payload, hash) = ctx.finish()?;

        match payload {
            Payload::Baking(data) if authorized => self.sign_baking(&key, &data, hash, with_hash),
            Payload::Baking(_) => {
                #[cfg(feature = "log")]
                log::warn!("baking request for unauthorized key");

                Err(Error::UnauthorizedKey)
            }
            Payload::Operations(g) if authorized && g.is_self_delegation() => {
                self.set_pending(Pending::SignDelegation {
                    key,
                    hash,
                    with_hash,
                })
            }
            Payload::Operations(g) if authorized && g.is_reveal_only() => {
                self.sign_hash(&key, hash, with_hash)
            }
            Payload::Operations(_g) => {
                #[cfg(feature = "log")]
                log::warn!("operation group not permitted: {:?}", _g.primary.map(|o| o.kind.tag()));

                Err(Error::NotPermitted)
            }
        }
    }

    /// Sign baking data, committing the watermark before the signature is returned
    fn sign_baking(
        &mut self,
        key: &BakingKey,
        data: &BakingData,
        hash: [u8; MESSAGE_HASH_LEN],
        with_hash: bool,
    ) -> Result<Output, Error> {
        // Watermarks are unknown
        if self.record_invalid {
            return Err(Error::RecordInvalid);
        }

        let a = self
            .hwm
            .authorize(data.chain_id, data.level, data.round, data.kind)?;

        let signature = self.drv.sign(key.curve, key.path.components(), &hash)?;

        let mut hwm = self.hwm;
        hwm.commit(a);

        // A failed commit drops the signature
        if !self.nvm.hwm_disabled {
            self.persist(NvmData {
                hwm,
                ..self.nvm.clone()
            })?;
        }
        self.hwm = hwm;

        #[cfg(feature = "log")]
        log::info!(
            "signed {} at {}/{} ({} chain)",
            data.kind,
            data.level,
            data.round,
            a.chain()
        );

        Ok(Output::Signature {
            hash: with_hash.then_some(hash),
            signature,
        })
    }

    /// Sign a message hash without watermark checks
    fn sign_hash(
        &mut self,
        key: &BakingKey,
        hash: [u8; MESSAGE_HASH_LEN],
        with_hash: bool,
    ) -> Result<Output, Error> {
        let signature = self.drv.sign(key.curve, key.path.components(), &hash)?;

        Ok(Output::Signature {
            hash: with_hash.then_some(hash),
            signature,
        })
    }

    fn set_pending(&mut self, p: Pending) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("awaiting approval: {:?}", p);

        self.pending = Some(p);
        Ok(Output::Pending)
    }

    /// Encode and commit the next persisted record, updating
    /// the in-memory mirror only on success
    fn persist(&mut self, next: NvmData) -> Result<(), Error> {
        // Only setup or reset may replace an invalid record
        if self.record_invalid {
            return Err(Error::RecordInvalid);
        }

        self.commit_record(next)
    }

    fn commit_record(&mut self, next: NvmData) -> Result<(), Error> {
        let mut buff = [0u8; NVM_RECORD_LEN];
        let n = next.encode(&mut buff)?;

        if let Err(e) = self.sto.commit(&buff[..n]) {
            #[cfg(feature = "log")]
            log::error!("storage commit failed: {:?}", e);

            return Err(e);
        }

        self.registry = KeyRegistry::with_key(next.baking_key.clone());
        self.nvm = next;

        Ok(())
    }

    /// Approve a pending request, applying it and returning the delayed response
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn approve(&mut self) -> Result<Output, Error> {
        let p = self.pending.take().ok_or(Error::UnexpectedEvent)?;

        #[cfg(feature = "log")]
        log::debug!("approved: {:?}", p);

        match p {
            Pending::PromptPublicKey { public_key } => Ok(Output::PublicKey { public_key }),

            Pending::Authorize { key, public_key } => {
                let mut registry = self.registry.clone();
                registry.authorize_key(&key.path, key.curve)?;

                self.persist(NvmData {
                    baking_key: registry.current().cloned(),
                    ..self.nvm.clone()
                })?;

                Ok(Output::PublicKey { public_key })
            }

            Pending::Setup {
                key,
                main_chain_id,
                main_level,
                test_level,
                public_key,
            } => {
                let mut registry = self.registry.clone();
                registry.authorize_key(&key.path, key.curve)?;

                let mut hwm = self.hwm;
                hwm.main_chain_id = main_chain_id;
                hwm.reset(ResetTarget::Main, main_level)?;
                hwm.reset(ResetTarget::Test, test_level)?;

                self.commit_record(NvmData {
                    hwm,
                    hwm_disabled: self.nvm.hwm_disabled,
                    baking_key: registry.current().cloned(),
                })?;
                self.hwm = hwm;
                self.record_invalid = false;

                Ok(Output::PublicKey { public_key })
            }

            Pending::Reset { level } => {
                let mut hwm = self.hwm;
                hwm.reset(ResetTarget::All, level)?;

                self.commit_record(NvmData {
                    hwm,
                    ..self.nvm.clone()
                })?;
                self.hwm = hwm;
                self.record_invalid = false;

                Ok(Output::None)
            }

            Pending::SignDelegation {
                key,
                hash,
                with_hash,
            } => {
                if !self.unlocked {
                    return Err(Error::Locked);
                }

                self.sign_hash(&key, hash, with_hash)
            }
        }
    }

    /// Deny a pending request, discarding it
    pub fn deny(&mut self) -> Result<Output, Error> {
        match self.pending.take() {
            Some(_p) => {
                #[cfg(feature = "log")]
                log::debug!("denied: {:?}", _p);

                Err(Error::Rejected)
            }
            None => Err(Error::UnexpectedEvent),
        }
    }

    /// Enable or disable persistence of watermark updates.
    ///
    /// While disabled watermarks are still enforced in memory, re-enabling
    /// persists the in-memory watermarks.
    pub fn set_hwm_disabled(&mut self, disabled: bool) -> Result<(), Error> {
        let hwm = match disabled {
            true => self.nvm.hwm,
            false => self.hwm,
        };

        self.persist(NvmData {
            hwm,
            hwm_disabled: disabled,
            baking_key: self.nvm.baking_key.clone(),
        })
    }

    /// Fetch current engine state
    pub fn state(&self) -> State {
        if self.pending.is_some() {
            State::Pending
        } else if self.function.is_signing() {
            State::Signing
        } else {
            State::Idle
        }
    }

    /// Fetch the pending request, for display
    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    /// Fetch working watermarks
    pub fn hwm(&self) -> &HwmGuard {
        &self.hwm
    }

    /// Fetch the persisted record mirror
    pub fn nvm(&self) -> &NvmData {
        &self.nvm
    }

    /// Fetch the authorized key
    pub fn baking_key(&self) -> Option<&BakingKey> {
        self.registry.current()
    }

    /// Check whether the persisted record was restored, signing baking
    /// data requires a valid record
    pub fn is_record_valid(&self) -> bool {
        !self.record_invalid
    }

    /// Check whether engine is unlocked (ie. PIN validated, signing permitted)
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Unlock the engine (allowing signing)
    pub fn unlock(&mut self) {
        self.unlocked = true;
    }

    /// Lock the engine, aborting any active or pending signing request
    pub fn lock(&mut self) {
        self.unlocked = false;
        self.clear_sign();

        if let Some(Pending::SignDelegation { .. }) = self.pending {
            self.pending = None;
        }
    }

    /// Reset engine state, aborting active and pending requests
    pub fn reset(&mut self) {
        self.clear_sign();
        self.pending = None;
    }

    fn clear_sign(&mut self) {
        self.reassembler.reset();
        self.function.clear();
    }
}

/// Load the persisted record, empty storage yields defaults
fn load_record<STO: Storage>(sto: &STO) -> Result<NvmData, Error> {
    let mut buff = [0u8; NVM_RECORD_LEN];

    match sto.load(&mut buff)? {
        0 => Ok(NvmData::default()),
        n => NvmData::decode_owned(&buff[..n]).map(|(d, _)| d),
    }
}
