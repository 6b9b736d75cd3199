// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Raw command framing
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      CLA      |      INS      |       P1      |       P2      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      LC       |                                               /
//! +-+-+-+-+-+-+-+-+             DATA (LC bytes)                   /
//! /                                                               /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use encdec::Encode;
use ledger_proto::{ApduError, ApduStatic};

/// Command header length (CLA, INS, P1, P2, LC)
pub const COMMAND_HEADER_LEN: usize = 5;

/// A single command unit as received from the transport
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Command<'a> {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    /// Declared payload length, may exceed `data.len()` only
    /// where the transport truncated the command
    pub lc: u8,
    pub data: &'a [u8],
}

impl<'a> Command<'a> {
    /// Create a new command, `lc` is taken from the data length
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: &'a [u8]) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            lc: data.len() as u8,
            data,
        }
    }

    /// Parse a command from a raw APDU buffer
    pub fn parse(buff: &'a [u8]) -> Result<Self, ApduError> {
        if buff.len() < COMMAND_HEADER_LEN {
            return Err(ApduError::InvalidLength);
        }

        let lc = buff[4];
        let data = match buff.get(COMMAND_HEADER_LEN..COMMAND_HEADER_LEN + lc as usize) {
            Some(d) => d,
            None => return Err(ApduError::InvalidLength),
        };

        Ok(Self {
            cla: buff[0],
            ins: buff[1],
            p1: buff[2],
            p2: buff[3],
            lc,
            data,
        })
    }

    /// Encode a static APDU object into `buff` and return a command referencing it
    pub fn from_apdu<A>(apdu: &A, buff: &'a mut [u8]) -> Result<Self, ApduError>
    where
        A: ApduStatic + Encode<Error = ApduError>,
    {
        let n = apdu.encode(buff)?;
        if n > u8::MAX as usize {
            return Err(ApduError::InvalidLength);
        }

        Ok(Self {
            cla: A::CLA,
            ins: A::INS,
            p1: apdu.p1(),
            p2: apdu.p2(),
            lc: n as u8,
            data: &buff[..n],
        })
    }
}

impl<'a> Encode for Command<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(COMMAND_HEADER_LEN + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n || self.data.len() > u8::MAX as usize {
            return Err(ApduError::InvalidLength);
        }

        buff[..COMMAND_HEADER_LEN].copy_from_slice(&[
            self.cla,
            self.ins,
            self.p1,
            self.p2,
            self.data.len() as u8,
        ]);
        buff[COMMAND_HEADER_LEN..n].copy_from_slice(self.data);

        Ok(n)
    }
}
