// Copyright (c) 2023-2024 The Tezos Baking App Developers

//! Typed APDU client over an [Exchange]

use encdec::{Decode, Encode};
use log::{debug, trace};

use ledger_tezos_baking_apdu::{
    command::{Command, COMMAND_HEADER_LEN},
    prelude::*,
    sign::SIGN_HASH_LEN,
    ApduError, ApduStatic,
};

use crate::{Answer, Error, Exchange, Response};

/// Signing request options
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SignOpts {
    /// Use `SIGN_WITH_HASH`, returning the message hash
    pub with_hash: bool,
    /// Maximum message bytes per packet
    pub chunk_size: usize,
    /// Operator response where the request prompts
    pub approve: bool,
}

impl Default for SignOpts {
    fn default() -> Self {
        Self {
            with_hash: true,
            chunk_size: MAX_APDU_SIZE,
            approve: true,
        }
    }
}

/// Signing response
#[derive(Clone, PartialEq, Debug)]
pub struct Signed {
    pub hash: Option<[u8; SIGN_HASH_LEN]>,
    pub signature: Vec<u8>,
}

/// Client for baking app instructions
pub struct Client<T: Exchange> {
    t: T,
}

impl<T: Exchange> Client<T> {
    pub fn new(t: T) -> Self {
        Self { t }
    }

    /// Fetch the underlying exchange
    pub fn inner(&self) -> &T {
        &self.t
    }

    /// Issue a raw command APDU, resolving any confirmation prompt with `approve`
    pub async fn raw(&self, apdu: &[u8], approve: bool) -> Result<Response, Error> {
        trace!("command: {:02x?}", apdu);

        let r = match self.t.exchange(apdu).await? {
            Answer::Ready(r) => r,
            Answer::Pending => {
                debug!("confirmation requested, approve: {approve}");
                self.t.confirm(approve).await?
            }
        };

        trace!("response: {:02x?} ({})", r.data, r.status);

        Ok(r)
    }

    /// Encode and issue a request object
    pub async fn request<A>(&self, req: &A, approve: bool) -> Result<Response, Error>
    where
        A: ApduStatic + Encode<Error = ApduError>,
    {
        let mut payload = [0u8; 256];
        let mut apdu = [0u8; COMMAND_HEADER_LEN + 256];

        let cmd = Command::from_apdu(req, &mut payload)?;
        let n = cmd.encode(&mut apdu)?;

        self.raw(&apdu[..n], approve).await
    }

    /// Fetch the application version
    pub async fn version(&self) -> Result<VersionResp, Error> {
        let r = self.request(&VersionReq, false).await?.check()?;
        let (v, _) = VersionResp::decode(&r)?;
        Ok(v)
    }

    /// Fetch a public key without prompting
    pub async fn public_key(&self, curve: DerivationType, path: &Bip32Path) -> Result<Vec<u8>, Error> {
        let r = self
            .request(&GetPublicKeyReq::new(curve, path.clone()), false)
            .await?
            .check()?;
        decode_public_key(&r)
    }

    /// Fetch a public key, displaying it for confirmation
    pub async fn prompt_public_key(
        &self,
        curve: DerivationType,
        path: &Bip32Path,
        approve: bool,
    ) -> Result<Vec<u8>, Error> {
        let r = self
            .request(&PromptPublicKeyReq::new(curve, path.clone()), approve)
            .await?
            .check()?;
        decode_public_key(&r)
    }

    /// Authorize a key for baking, returning its public key
    pub async fn authorize(
        &self,
        curve: DerivationType,
        path: &Bip32Path,
        approve: bool,
    ) -> Result<Vec<u8>, Error> {
        let r = self
            .request(&AuthorizeBakingReq::new(curve, path.clone()), approve)
            .await?
            .check()?;
        decode_public_key(&r)
    }

    /// Re-authorize the stored baking key
    pub async fn authorize_stored(&self, curve: DerivationType, approve: bool) -> Result<Vec<u8>, Error> {
        let r = self
            .request(&AuthorizeBakingReq::stored(curve), approve)
            .await?
            .check()?;
        decode_public_key(&r)
    }

    /// Clear the authorized key
    pub async fn deauthorize(&self) -> Result<(), Error> {
        self.request(&DeauthorizeReq, false).await?.check()?;
        Ok(())
    }

    /// Configure the baking key, main chain and watermarks
    pub async fn setup(&self, req: &SetupReq, approve: bool) -> Result<Vec<u8>, Error> {
        let r = self.request(req, approve).await?.check()?;
        decode_public_key(&r)
    }

    /// Reset both watermarks to `level`
    pub async fn reset(&self, level: u32, approve: bool) -> Result<(), Error> {
        self.request(&ResetReq::new(level), approve).await?.check()?;
        Ok(())
    }

    /// Fetch the authorized key path, empty when unset
    pub async fn auth_key(&self) -> Result<Bip32Path, Error> {
        let r = self.request(&QueryAuthKeyReq, false).await?.check()?;
        let (a, _) = AuthKeyResp::decode(&r)?;
        Ok(a.path)
    }

    /// Fetch the authorized key path and curve
    pub async fn auth_key_with_curve(&self) -> Result<AuthKeyWithCurveResp, Error> {
        let r = self.request(&QueryAuthKeyWithCurveReq, false).await?.check()?;
        let (a, _) = AuthKeyWithCurveResp::decode(&r)?;
        Ok(a)
    }

    /// Fetch the main chain watermark
    pub async fn main_hwm(&self) -> Result<MainHwmResp, Error> {
        let r = self.request(&QueryMainHwmReq, false).await?.check()?;
        let (h, _) = MainHwmResp::decode(&r)?;
        Ok(h)
    }

    /// Fetch all watermarks and the main chain id
    pub async fn all_hwm(&self) -> Result<AllHwmResp, Error> {
        let r = self.request(&QueryAllHwmReq, false).await?.check()?;
        let (h, _) = AllHwmResp::decode(&r)?;
        Ok(h)
    }

    /// Compute a key-bound HMAC
    pub async fn hmac(
        &self,
        curve: DerivationType,
        path: &Bip32Path,
        message: &[u8],
    ) -> Result<[u8; 32], Error> {
        let r = self
            .request(&HmacReq::new(curve, path.clone(), message), false)
            .await?
            .check()?;
        let (h, _) = HmacResp::decode(&r)?;
        Ok(h.hmac)
    }

    /// Sign a message, split into packets of at most `opts.chunk_size` bytes
    pub async fn sign(
        &self,
        curve: DerivationType,
        path: &Bip32Path,
        message: &[u8],
        opts: SignOpts,
    ) -> Result<Signed, Error> {
        let chunks: Vec<usize> = message
            .chunks(opts.chunk_size.max(1))
            .map(|c| c.len())
            .collect();

        self.sign_chunks(curve, path, message, &chunks, opts).await
    }

    /// Sign a message split into the provided chunk sizes
    pub async fn sign_chunks(
        &self,
        curve: DerivationType,
        path: &Bip32Path,
        message: &[u8],
        chunks: &[usize],
        opts: SignOpts,
    ) -> Result<Signed, Error> {
        debug!("sign {} bytes in {} packets", message.len(), chunks.len());

        let first = self.sign_packet(opts.with_hash, SignPacket::First {
            curve,
            path: path.clone(),
        });
        self.request_packet(first, false).await?.check()?;

        let mut index = 0;
        let mut data = vec![];

        for (i, n) in chunks.iter().enumerate() {
            let last = i == chunks.len() - 1;
            let chunk = &message[index..][..*n];
            index += n;

            let p = self.sign_packet(opts.with_hash, SignPacket::Next { data: chunk, last });
            data = self.request_packet(p, opts.approve).await?.check()?;
        }

        let (r, _) = SignResp::decode_with_hash(opts.with_hash, &data)?;

        Ok(Signed {
            hash: r.hash,
            signature: r.signature.to_vec(),
        })
    }

    fn sign_packet<'a>(&self, with_hash: bool, p: SignPacket<'a>) -> SignKind<'a> {
        match with_hash {
            true => SignKind::WithHash(SignWithHashReq(p)),
            false => SignKind::Plain(SignReq(p)),
        }
    }

    async fn request_packet(&self, p: SignKind<'_>, approve: bool) -> Result<Response, Error> {
        match &p {
            SignKind::WithHash(r) => self.request(r, approve).await,
            SignKind::Plain(r) => self.request(r, approve).await,
        }
    }
}

enum SignKind<'a> {
    WithHash(SignWithHashReq<'a>),
    Plain(SignReq<'a>),
}

fn decode_public_key(buff: &[u8]) -> Result<Vec<u8>, Error> {
    let (r, _) = PublicKeyResp::decode(buff)?;
    Ok(r.public_key.to_vec())
}
