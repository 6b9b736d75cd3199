// Copyright (c) 2023-2024 The Tezos Baking App Developers

use ledger_proto::ApduError;

/// [Engine][super::Engine] errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Invalid payload length for instruction
    #[cfg_attr(feature = "thiserror", error("invalid payload length for instruction"))]
    InvalidLength = 0x00,

    /// Payload contains trailing bytes
    #[cfg_attr(feature = "thiserror", error("trailing payload bytes"))]
    TrailingData = 0x01,

    /// Unsupported command class
    #[cfg_attr(feature = "thiserror", error("wrong class"))]
    WrongClass = 0x02,

    /// Unsupported instruction
    #[cfg_attr(feature = "thiserror", error("unknown instruction"))]
    UnknownInstruction = 0x03,

    /// Invalid `P1` / `P2` parameter
    #[cfg_attr(feature = "thiserror", error("wrong parameter"))]
    WrongParam = 0x04,

    /// Payload provided where none is expected, or malformed payload values
    #[cfg_attr(feature = "thiserror", error("unexpected payload"))]
    UnexpectedData = 0x05,

    /// Derivation path missing or invalid
    #[cfg_attr(feature = "thiserror", error("invalid derivation path"))]
    InvalidPath = 0x06,

    /// Continuation packet with no active message
    #[cfg_attr(feature = "thiserror", error("unexpected packet"))]
    UnexpectedPacket = 0x07,

    /// Message exceeds the packet limit
    #[cfg_attr(feature = "thiserror", error("too many packets"))]
    TooManyPackets = 0x08,

    /// Message grammar violation
    #[cfg_attr(feature = "thiserror", error("parse error"))]
    ParseError = 0x09,

    /// Integer or sum overflow
    #[cfg_attr(feature = "thiserror", error("integer overflow"))]
    Overflow = 0x0a,

    /// Unrecognised operation tag
    #[cfg_attr(feature = "thiserror", error("unknown operation tag"))]
    UnknownTag = 0x0b,

    /// More than one non-reveal operation in a group
    #[cfg_attr(feature = "thiserror", error("duplicate primary operation"))]
    DuplicateOperation = 0x0c,

    /// Message ended inside a field or operation
    #[cfg_attr(feature = "thiserror", error("incomplete message"))]
    Incomplete = 0x0d,

    /// Level outside of the valid range
    #[cfg_attr(feature = "thiserror", error("invalid level"))]
    InvalidLevel = 0x0e,

    /// Engine locked
    #[cfg_attr(feature = "thiserror", error("engine locked"))]
    Locked = 0x10,

    /// Key is not the authorized baking key
    #[cfg_attr(feature = "thiserror", error("unauthorized key"))]
    UnauthorizedKey = 0x11,

    /// Request rejected by the high watermark
    #[cfg_attr(feature = "thiserror", error("watermark rejected"))]
    WatermarkRejected = 0x12,

    /// Operation group is not signable by the baking key
    #[cfg_attr(feature = "thiserror", error("operation not permitted"))]
    NotPermitted = 0x13,

    /// Pending user approval
    #[cfg_attr(feature = "thiserror", error("pending user approval"))]
    ApprovalPending = 0x14,

    /// Referenced data is not set
    #[cfg_attr(feature = "thiserror", error("referenced data not found"))]
    NotFound = 0x15,

    /// Rejected by the operator
    #[cfg_attr(feature = "thiserror", error("rejected"))]
    Rejected = 0x16,

    /// Persistent storage failure
    #[cfg_attr(feature = "thiserror", error("storage error"))]
    StorageError = 0x17,

    /// Key derivation or signing failure
    #[cfg_attr(feature = "thiserror", error("driver error"))]
    DriverError = 0x18,

    /// Response encoding failed
    #[cfg_attr(feature = "thiserror", error("encoding failed"))]
    EncodingFailed = 0x19,

    /// Unexpected event for engine state
    #[cfg_attr(feature = "thiserror", error("unexpected event"))]
    UnexpectedEvent = 0x1a,

    /// Persisted record could not be restored, watermarks are unknown
    /// until an approved setup or reset
    #[cfg_attr(feature = "thiserror", error("persisted record invalid"))]
    RecordInvalid = 0x1b,

    /// Unknown / not-yet defined error (placeholder)
    #[cfg_attr(feature = "thiserror", error("unknown"))]
    Unknown = 0xf0,
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidLength => Error::InvalidLength,
            ApduError::InvalidEncoding => Error::ParseError,
            _ => Error::Unknown,
        }
    }
}

impl From<encdec::Error> for Error {
    fn from(_e: encdec::Error) -> Self {
        Error::StorageError
    }
}
