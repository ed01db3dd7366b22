//! L3 — TLS capability negotiation and authentication (spec.md §4.3).

use crate::error::{Error, Result};
use crate::opts::{AuthMethod, Opts, TlsMode};
use crate::proto::codec::Envelope;
use crate::proto::messages as m;
use crate::wire::frame::FrameTransport;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Runs the capabilities-set/TLS-upgrade step (spec.md §4.3 step 2). Returns
/// the transport unchanged if `opts.tls.mode` is `Disabled`.
pub fn negotiate_tls<S: Read + Write>(
    transport: &mut FrameTransport<S>,
    opts: &Opts,
    trace: bool,
) -> Result<()> {
    if opts.tls.mode == TlsMode::Disabled {
        return Ok(());
    }

    let set = Envelope::CapabilitiesSet(m::CapabilitiesSet {
        capabilities: Some(m::Capabilities {
            capabilities: vec![m::Capability {
                name: crate::constant::CAPABILITY_TLS.to_string(),
                value: Some(m::Scalar {
                    value: Some(m::ScalarValue::VBool(true)),
                }),
            }],
        }),
    });
    send(transport, &set, trace)?;
    match recv(transport, trace)? {
        Envelope::Ok(_) => Ok(()),
        Envelope::Error(e) => Err(Error::from_server_error(e.code, e.sql_state, e.msg)),
        other => Err(unexpected("capabilities-set ack", &other)),
    }
}

/// Sends the expired-password-tolerance capability (spec.md §4.3 step 3).
pub fn negotiate_pwd_expire_ok<S: Read + Write>(
    transport: &mut FrameTransport<S>,
    trace: bool,
) -> Result<()> {
    let set = Envelope::CapabilitiesSet(m::CapabilitiesSet {
        capabilities: Some(m::Capabilities {
            capabilities: vec![m::Capability {
                name: crate::constant::CAPABILITY_PWD_EXPIRE_OK.to_string(),
                value: Some(m::Scalar {
                    value: Some(m::ScalarValue::VBool(true)),
                }),
            }],
        }),
    });
    send(transport, &set, trace)?;
    match recv(transport, trace)? {
        Envelope::Ok(_) => Ok(()),
        Envelope::Error(e) => Err(Error::from_server_error(e.code, e.sql_state, e.msg)),
        other => Err(unexpected("pwd_expire_ok ack", &other)),
    }
}

/// Outcome of a successful authentication exchange.
pub struct AuthOutcome {
    /// `true` if the server reported `session-state-changed(account-expired)`
    /// instead of failing outright (spec.md §4.3 "Post-auth bootstrapping").
    pub password_expired: bool,
}

/// Picks PLAIN when TLS is active and no method was forced, challenge-response
/// otherwise (spec.md §4.3 "Selection rule").
pub fn select_auth_method(opts: &Opts, tls_active: bool) -> AuthMethod {
    opts.auth_method.unwrap_or(if tls_active {
        AuthMethod::Plain
    } else {
        AuthMethod::ChallengeResponse
    })
}

pub fn authenticate<S: Read + Write>(
    transport: &mut FrameTransport<S>,
    opts: &Opts,
    method: AuthMethod,
    trace: bool,
) -> Result<AuthOutcome> {
    match method {
        AuthMethod::Plain => authenticate_plain(transport, opts, trace),
        AuthMethod::ChallengeResponse => authenticate_challenge_response(transport, opts, trace),
    }
}

fn authenticate_plain<S: Read + Write>(
    transport: &mut FrameTransport<S>,
    opts: &Opts,
    trace: bool,
) -> Result<AuthOutcome> {
    let password = opts.password.as_deref().unwrap_or_default();
    let mut payload = Vec::new();
    payload.push(0u8); // authz-id is empty
    payload.extend_from_slice(opts.user.as_bytes());
    payload.push(0u8);
    payload.extend_from_slice(password.as_bytes());

    let start = Envelope::AuthenticateStart(m::AuthenticateStart {
        mech_name: "PLAIN".to_string(),
        auth_data: None,
        initial_response: Some(payload),
    });
    send(transport, &start, trace)?;
    finish_auth_exchange(transport, trace)
}

fn authenticate_challenge_response<S: Read + Write>(
    transport: &mut FrameTransport<S>,
    opts: &Opts,
    trace: bool,
) -> Result<AuthOutcome> {
    let start = Envelope::AuthenticateStart(m::AuthenticateStart {
        mech_name: "MYSQL41".to_string(),
        auth_data: None,
        initial_response: None,
    });
    send(transport, &start, trace)?;

    let salt = match recv(transport, trace)? {
        Envelope::AuthenticateContinue(m::AuthenticateContinue { auth_data }) => auth_data,
        Envelope::Error(e) => return Err(Error::from_server_error(e.code, e.sql_state, e.msg)),
        other => return Err(unexpected("authenticate-continue (salt)", &other)),
    };

    let password = opts.password.as_deref().unwrap_or_default();
    let hash = scramble(password, &salt);
    let schema = opts.schema.as_deref().unwrap_or_default();

    let mut payload = Vec::new();
    payload.extend_from_slice(schema.as_bytes());
    payload.push(0u8);
    payload.extend_from_slice(opts.user.as_bytes());
    payload.push(0u8);
    if !password.is_empty() {
        payload.extend_from_slice(format!("*{hash}").as_bytes());
    }

    let cont = Envelope::AuthenticateContinue(m::AuthenticateContinue { auth_data: payload });
    send(transport, &cont, trace)?;
    finish_auth_exchange(transport, trace)
}

/// `sha1(password) XOR sha1(salt || sha1(sha1(password)))`, hex-encoded
/// (spec.md §4.3 "Challenge-response").
fn scramble(password: &str, salt: &[u8]) -> String {
    let pwd_hash = Sha1::digest(password.as_bytes());
    let pwd_hash_hash = Sha1::digest(pwd_hash);

    let mut salted = Vec::with_capacity(salt.len() + pwd_hash_hash.len());
    salted.extend_from_slice(salt);
    salted.extend_from_slice(&pwd_hash_hash);
    let salted_hash = Sha1::digest(&salted);

    let mut xored = [0u8; 20];
    for (i, byte) in xored.iter_mut().enumerate() {
        *byte = pwd_hash[i] ^ salted_hash[i];
    }
    xored.iter().map(|b| format!("{b:02x}")).collect()
}

fn finish_auth_exchange<S: Read + Write>(
    transport: &mut FrameTransport<S>,
    trace: bool,
) -> Result<AuthOutcome> {
    match recv(transport, trace)? {
        Envelope::AuthenticateOk(_) => Ok(AuthOutcome {
            password_expired: false,
        }),
        Envelope::Notice(frame) => {
            let outcome = interpret_account_expired_notice(&frame)?;
            match recv(transport, trace)? {
                Envelope::AuthenticateOk(_) => Ok(outcome),
                Envelope::AuthenticateFail(fail) => Err(Error::AuthFailed(fail.message)),
                other => Err(unexpected("authenticate-ok after notice", &other)),
            }
        }
        Envelope::AuthenticateFail(fail) => Err(Error::AuthFailed(fail.message)),
        Envelope::Error(e) => Err(Error::from_server_error(e.code, e.sql_state, e.msg)),
        other => Err(unexpected("authenticate-ok", &other)),
    }
}

fn interpret_account_expired_notice(frame: &m::Frame) -> Result<AuthOutcome> {
    use crate::constant::{NoticeType, SESSION_STATE_ACCOUNT_EXPIRED};
    let payload = frame
        .payload
        .as_deref()
        .ok_or_else(|| Error::Malformed("notice frame carried no payload".to_string()))?;

    if NoticeType::from_u32(frame.notice_type) != Some(NoticeType::SessionStateChanged) {
        return Err(Error::ProtocolViolation {
            kind: format!("notice-type {}", frame.notice_type),
            state: "authenticate".to_string(),
        });
    }
    let changed: m::SessionStateChanged = prost::Message::decode(payload)
        .map_err(|e| Error::Malformed(format!("undecodable session-state-changed: {e}")))?;
    Ok(AuthOutcome {
        password_expired: changed.param == SESSION_STATE_ACCOUNT_EXPIRED,
    })
}

fn send<S: Write>(transport: &mut FrameTransport<S>, env: &Envelope, trace: bool) -> Result<()> {
    transport.write_frame(env.kind() as u8, &env.encode(trace))
}

fn recv<S: Read>(transport: &mut FrameTransport<S>, trace: bool) -> Result<Envelope> {
    let (kind, payload) = transport.read_frame()?;
    crate::proto::codec::decode_frame(kind, &payload, trace)
}

fn unexpected(expected: &str, got: &Envelope) -> Error {
    Error::ProtocolViolation {
        kind: format!("expected {expected}, got {:?}", got.kind()),
        state: "handshake".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scramble_is_deterministic_and_twenty_bytes_hex() {
        let salt = b"01234567890123456789";
        let hash = scramble("secret", salt);
        assert_eq!(hash.len(), 40);
        assert_eq!(hash, scramble("secret", salt));
        assert_ne!(hash, scramble("other", salt));
    }

    #[test]
    fn selection_rule_prefers_plain_over_tls() {
        let opts = Opts {
            auth_method: None,
            ..Opts::default()
        };
        assert_eq!(select_auth_method(&opts, true), AuthMethod::Plain);
        assert_eq!(
            select_auth_method(&opts, false),
            AuthMethod::ChallengeResponse
        );
    }

    #[test]
    fn selection_rule_honors_explicit_override() {
        let opts = Opts {
            auth_method: Some(AuthMethod::ChallengeResponse),
            ..Opts::default()
        };
        assert_eq!(
            select_auth_method(&opts, true),
            AuthMethod::ChallengeResponse
        );
    }
}
