// Copyright (c) 2023-2024 The Tezos Baking App Developers

use encdec::{Decode, DecodeOwned};

use ledger_tezos_baking_apdu::{prelude::*, ApduStatic};

use super::Error;

/// [`Engine`][super::Engine] input events, typically decoded from request [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Event<'a> {
    None,

    /// Fetch application version
    Version,

    /// Authorize a key for baking, `None` re-authorizes the stored key
    AuthorizeBaking {
        curve: DerivationType,
        path: Option<Bip32Path>,
    },

    /// Fetch a public key, optionally displaying it for confirmation
    GetPublicKey {
        curve: DerivationType,
        path: Bip32Path,
        prompt: bool,
    },

    /// Signing packet, parameters are validated by the engine
    /// so the lock is checked before packet contents
    Sign {
        with_hash: bool,
        p1: u8,
        p2: u8,
        data: &'a [u8],
    },

    /// Reset both watermarks to `level`
    Reset {
        level: u32,
    },

    /// Fetch the authorized key path
    QueryAuthKey,

    /// Fetch the authorized key path and curve
    QueryAuthKeyWithCurve,

    /// Fetch the main chain watermark
    QueryMainHwm,

    /// Fetch all watermarks and the main chain id
    QueryAllHwm,

    /// Configure baking key, main chain and watermarks
    Setup {
        curve: DerivationType,
        path: Bip32Path,
        main_chain_id: u32,
        main_level: u32,
        test_level: u32,
    },

    /// Clear the authorized key
    Deauthorize,

    /// Compute a key-bound HMAC
    Hmac {
        curve: DerivationType,
        path: Bip32Path,
        message: &'a [u8],
    },
}

/// Require zero `P1` and `P2`
fn no_params(cmd: &Command) -> Result<(), Error> {
    match (cmd.p1, cmd.p2) {
        (0, 0) => Ok(()),
        _ => Err(Error::WrongParam),
    }
}

/// Require zero `P1` and a valid curve in `P2`
fn curve_param(cmd: &Command) -> Result<DerivationType, Error> {
    if cmd.p1 != 0 {
        return Err(Error::WrongParam);
    }

    DerivationType::try_from(cmd.p2).map_err(|_| Error::WrongParam)
}

/// Require an empty payload
fn no_data(cmd: &Command) -> Result<(), Error> {
    match cmd.data.is_empty() {
        true => Ok(()),
        false => Err(Error::UnexpectedData),
    }
}

/// Decode a path, returning the path and bytes consumed
pub(crate) fn read_path(buff: &[u8]) -> Result<(Bip32Path, usize), Error> {
    Bip32Path::decode_owned(buff).map_err(|_| Error::InvalidPath)
}

/// Require the payload to be fully consumed
fn no_trailing(cmd: &Command, n: usize) -> Result<(), Error> {
    match n == cmd.data.len() {
        true => Ok(()),
        false => Err(Error::TrailingData),
    }
}

impl<'a> Event<'a> {
    /// Parse an incoming command to engine event, applying
    /// per-instruction parameter and payload checks
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn parse(cmd: &Command<'a>) -> Result<Self, Error> {
        match cmd.ins {
            VersionReq::INS => {
                no_params(cmd)?;
                no_data(cmd)?;
                Ok(Event::Version)
            }

            GetPublicKeyReq::INS | PromptPublicKeyReq::INS => {
                let curve = curve_param(cmd)?;
                let (path, n) = read_path(cmd.data)?;
                no_trailing(cmd, n)?;

                Ok(Event::GetPublicKey {
                    curve,
                    path,
                    prompt: cmd.ins == PromptPublicKeyReq::INS,
                })
            }

            AuthorizeBakingReq::INS => {
                let curve = curve_param(cmd)?;
                if cmd.data.is_empty() {
                    return Ok(Event::AuthorizeBaking { curve, path: None });
                }

                let (path, n) = read_path(cmd.data)?;
                no_trailing(cmd, n)?;

                Ok(Event::AuthorizeBaking {
                    curve,
                    path: Some(path),
                })
            }

            SignReq::INS | SignWithHashReq::INS => Ok(Event::Sign {
                with_hash: cmd.ins == SignWithHashReq::INS,
                p1: cmd.p1,
                p2: cmd.p2,
                data: cmd.data,
            }),

            ResetReq::INS => {
                no_params(cmd)?;
                if cmd.data.len() != 4 {
                    return Err(Error::InvalidLength);
                }
                let (r, _) = ResetReq::decode(cmd.data)?;

                Ok(Event::Reset { level: r.level })
            }

            QueryAuthKeyReq::INS => {
                no_params(cmd)?;
                no_data(cmd)?;
                Ok(Event::QueryAuthKey)
            }

            QueryAuthKeyWithCurveReq::INS => {
                no_params(cmd)?;
                no_data(cmd)?;
                Ok(Event::QueryAuthKeyWithCurve)
            }

            QueryMainHwmReq::INS => {
                no_params(cmd)?;
                no_data(cmd)?;
                Ok(Event::QueryMainHwm)
            }

            QueryAllHwmReq::INS => {
                no_params(cmd)?;
                no_data(cmd)?;
                Ok(Event::QueryAllHwm)
            }

            SetupReq::INS => {
                let curve = curve_param(cmd)?;
                if cmd.data.len() < 12 {
                    return Err(Error::UnexpectedData);
                }

                let r = match SetupReq::decode_with_p2(cmd.p2, cmd.data) {
                    Ok((r, n)) => {
                        no_trailing(cmd, n)?;
                        r
                    }
                    Err(_) => return Err(Error::InvalidPath),
                };

                Ok(Event::Setup {
                    curve,
                    path: r.path,
                    main_chain_id: r.main_chain_id,
                    main_level: r.main_level,
                    test_level: r.test_level,
                })
            }

            DeauthorizeReq::INS => {
                no_params(cmd)?;
                no_data(cmd)?;
                Ok(Event::Deauthorize)
            }

            HmacReq::INS => {
                let curve = curve_param(cmd)?;
                let (path, n) = read_path(cmd.data)?;

                Ok(Event::Hmac {
                    curve,
                    path,
                    message: &cmd.data[n..],
                })
            }

            _ => Err(Error::UnknownInstruction),
        }
    }
}
