// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Packet reassembly for multi-packet signing requests
//!
//! Packets are classified by `P1` and handed on immediately, so memory
//! use is bounded by a single packet regardless of message length.

use ledger_tezos_baking_apdu::p1;

use crate::engine::Error;

/// Maximum number of continuation packets per message
pub const MAX_PACKETS: u8 = 0xff;

/// Packet classification
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Packet {
    /// Start of a new message
    First,
    /// Continuation of the active message
    Next {
        /// Continuation index, starting at 1
        index: u8,
        /// Final packet of the message
        last: bool,
    },
}

/// Tracks packet sequencing for the active message
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Reassembler {
    active: bool,
    packets: u8,
}

impl Reassembler {
    pub const fn new() -> Self {
        Self {
            active: false,
            packets: 0,
        }
    }

    /// Classify an incoming packet by `P1`, updating sequencing state
    pub fn accept(&mut self, p1: u8) -> Result<Packet, Error> {
        let last = p1 & p1::LAST_MARKER != 0;

        match p1 & !p1::LAST_MARKER {
            p1::FIRST => {
                self.active = true;
                self.packets = 0;
                Ok(Packet::First)
            }
            p1::NEXT => {
                if !self.active {
                    return Err(Error::UnexpectedPacket);
                }
                if self.packets >= MAX_PACKETS {
                    return Err(Error::TooManyPackets);
                }
                self.packets += 1;

                Ok(Packet::Next {
                    index: self.packets,
                    last,
                })
            }
            _ => Err(Error::WrongParam),
        }
    }

    /// Check whether a message is in progress
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of continuation packets received
    pub fn packets(&self) -> u8 {
        self.packets
    }

    /// Clear sequencing state, on completion or error
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
