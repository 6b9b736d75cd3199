// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Command dispatch, from raw APDU to response APDU
//!
//! Preconditions are checked in order (command length, class, pending
//! confirmation) before per-instruction parsing. Every failure aborts the
//! active request and is translated to a status word here, and only here.

use ledger_tezos_baking_apdu::{
    command::Command, status::StatusWord, BAKING_APDU_CLA, MAX_APDU_SIZE,
};

use super::{Engine, Error, Event, Output};
use crate::{driver::Driver, storage::Storage};

/// Dispatch result
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Reply {
    /// Response APDU (payload and status word) of the given length
    Ready(usize),
    /// Awaiting operator confirmation, the response is produced by [Engine::confirm]
    Pending,
}

impl From<Error> for StatusWord {
    fn from(e: Error) -> Self {
        use Error::*;

        match e {
            InvalidLength | UnexpectedPacket => StatusWord::WrongLengthForIns,
            TrailingData => StatusWord::WrongLength,
            WrongClass => StatusWord::Class,
            UnknownInstruction => StatusWord::InvalidIns,
            WrongParam => StatusWord::WrongParam,
            UnexpectedData | InvalidPath => StatusWord::WrongValues,
            TooManyPackets | ParseError | Overflow | UnknownTag | DuplicateOperation
            | Incomplete | InvalidLevel => StatusWord::ParseError,
            Locked | UnauthorizedKey | WatermarkRejected | NotPermitted | ApprovalPending
            | RecordInvalid => StatusWord::Security,
            NotFound => StatusWord::ReferencedDataNotFound,
            Rejected => StatusWord::Reject,
            StorageError | EncodingFailed => StatusWord::MemoryError,
            DriverError | UnexpectedEvent | Unknown => StatusWord::Unknown,
        }
    }
}

impl<DRV: Driver, STO: Storage> Engine<DRV, STO> {
    /// Handle a raw command APDU, writing the response APDU to `buff`
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn dispatch(&mut self, apdu: &[u8], buff: &mut [u8]) -> Reply {
        match self.dispatch_command(apdu) {
            Ok(Output::Pending) => Reply::Pending,
            r => Reply::Ready(write_response(r, buff)),
        }
    }

    fn dispatch_command(&mut self, apdu: &[u8]) -> Result<Output, Error> {
        let r = self.check_command(apdu).and_then(|cmd| {
            let evt = Event::parse(&cmd)?;
            self.update(&evt)
        });

        if let Err(_e) = &r {
            #[cfg(feature = "log")]
            log::debug!("command {:02x?} failed: {:?}", apdu.get(..4), _e);

            self.clear_sign();
        }

        r
    }

    fn check_command<'a>(&self, apdu: &'a [u8]) -> Result<Command<'a>, Error> {
        let cmd = Command::parse(apdu).map_err(|_| Error::InvalidLength)?;

        if cmd.lc as usize > MAX_APDU_SIZE {
            return Err(Error::InvalidLength);
        }

        if cmd.cla != BAKING_APDU_CLA {
            return Err(Error::WrongClass);
        }

        if self.pending.is_some() {
            return Err(Error::ApprovalPending);
        }

        Ok(cmd)
    }

    /// Approve or deny a pending request, writing the delayed response APDU to `buff`
    pub fn confirm(&mut self, approve: bool, buff: &mut [u8]) -> usize {
        let r = match approve {
            true => self.approve(),
            false => self.deny(),
        };

        write_response(r, buff)
    }
}

/// Write response payload and status word, returning the response length
fn write_response(r: Result<Output, Error>, buff: &mut [u8]) -> usize {
    // Reserve space for the status word
    let max = buff.len().saturating_sub(2);

    let (n, sw) = match r.and_then(|o| o.encode(&mut buff[..max]).map_err(|_| Error::EncodingFailed)) {
        Ok(n) => (n, StatusWord::Ok),
        Err(e) => (0, StatusWord::from(e)),
    };

    match buff.get_mut(n..n + 2) {
        Some(b) => {
            b.copy_from_slice(&sw.to_bytes());
            n + 2
        }
        None => 0,
    }
}
