// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! BIP-0032 derivation paths

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;
use ledger_proto::ApduError;

/// Maximum number of BIP-0032 path components
pub const MAX_BIP32_PATH_LEN: usize = 10;

/// BIP-0032 derivation path, up to [MAX_BIP32_PATH_LEN] components
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    PATH_LEN   |         COMPONENT_0 (big-endian u32)          :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :               |                                               /
/// +-+-+-+-+-+-+-+-+       COMPONENT_1..PATH_LEN (u32, BE)         /
/// /                                                               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// A zero length path is not a valid encoding, the empty path
/// is used internally to represent "no key".
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Bip32Path(Vec<u32, MAX_BIP32_PATH_LEN>);

impl Bip32Path {
    /// Create an empty path
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a slice of components
    pub fn from_slice(components: &[u32]) -> Result<Self, ApduError> {
        if components.is_empty() {
            return Err(ApduError::InvalidEncoding);
        }

        Vec::from_slice(components)
            .map(Self)
            .map_err(|_| ApduError::InvalidLength)
    }

    /// Fetch path components
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of components in the path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u32]> for Bip32Path {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl Encode for Bip32Path {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + self.0.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, c) in self.0.iter().enumerate() {
            BigEndian::write_u32(&mut buff[1 + i * 4..][..4], *c);
        }

        Ok(n)
    }
}

impl DecodeOwned for Bip32Path {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let len = buff[0] as usize;
        if len == 0 || len > MAX_BIP32_PATH_LEN {
            return Err(ApduError::InvalidEncoding);
        }
        if buff.len() < 1 + len * 4 {
            return Err(ApduError::InvalidLength);
        }

        let mut components = Vec::new();
        for i in 0..len {
            let c = BigEndian::read_u32(&buff[1 + i * 4..][..4]);
            // Capacity checked against MAX_BIP32_PATH_LEN above
            let _ = components.push(c);
        }

        Ok((Self(components), 1 + len * 4))
    }
}
