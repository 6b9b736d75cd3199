// Copyright (c) 2023-2024 The Tezos Baking App Developers

#![allow(unused)]

/// encdec helper module for big-endian `u32` fields
/// (derived `encdec` encodings are little-endian)
pub(crate) mod be_u32 {
    use byteorder::{BigEndian, ByteOrder};
    use ledger_proto::ApduError;

    pub fn enc(v: &u32, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(&mut buff[..4], *v);

        Ok(4)
    }

    pub fn enc_len(_v: &u32) -> Result<usize, ApduError> {
        Ok(4)
    }

    pub fn dec(buff: &[u8]) -> Result<(u32, usize), ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u32(&buff[..4]), 4))
    }
}

/// encdec helper module for optional big-endian `u32` fields,
/// `None` is encoded as zero bytes and must therefore be the final field
pub(crate) mod opt_be_u32 {
    use ledger_proto::ApduError;

    use super::be_u32;

    pub fn enc(v: &Option<u32>, buff: &mut [u8]) -> Result<usize, ApduError> {
        match v {
            Some(v) => be_u32::enc(v, buff),
            None => Ok(0),
        }
    }

    pub fn enc_len(v: &Option<u32>) -> Result<usize, ApduError> {
        Ok(if v.is_some() { 4 } else { 0 })
    }

    pub fn dec(buff: &[u8]) -> Result<(Option<u32>, usize), ApduError> {
        match buff.len() {
            0 => Ok((None, 0)),
            _ => be_u32::dec(buff).map(|(v, n)| (Some(v), n)),
        }
    }
}

/// Encoding helper for fixed length arrays (pending nightly array constructors)
pub(crate) mod arr {
    use encdec::Error;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < d.len() {
            return Err(Error::Length);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, Error> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), Error> {
        if buff.len() < N {
            return Err(Error::Length);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Encoding helper for length-prefixed byte slices (`LEN(u8) || DATA`)
pub(crate) mod lv {
    use ledger_proto::ApduError;

    pub fn enc(d: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
        if d.len() > u8::MAX as usize || buff.len() < d.len() + 1 {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = d.len() as u8;
        buff[1..][..d.len()].copy_from_slice(d);

        Ok(d.len() + 1)
    }

    pub fn enc_len(d: &[u8]) -> Result<usize, ApduError> {
        Ok(d.len() + 1)
    }

    pub fn dec(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let n = buff[0] as usize;
        if buff.len() < n + 1 {
            return Err(ApduError::InvalidLength);
        }

        Ok((&buff[1..][..n], n + 1))
    }
}
