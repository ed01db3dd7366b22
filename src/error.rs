//! Error kinds for the session engine, one variant per spec.md §7 failure kind.

use thiserror::Error;

pub use color_eyre::eyre::eyre;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Peer closed, reset, or the pipe broke mid-frame.
    #[error("transport lost: {0}")]
    TransportLost(String),

    /// Declared frame length out of range, unknown message kind, or payload
    /// failed protobuf schema parse.
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshakeFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The server sent a typed Error message.
    #[error("server error {code} ({sql_state}): {message}")]
    ServerError {
        code: u32,
        sql_state: String,
        message: String,
    },

    /// Builder method called out of the chain grammar.
    #[error("chain violation: `{method}` is not legal in state `{state}`")]
    ChainViolation { method: String, state: String },

    /// `execute` invoked with a referenced placeholder left unbound.
    #[error("unbound placeholder: `{0}`")]
    UnboundPlaceholder(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// The result state machine received a message kind not valid for its
    /// current state.
    #[error("protocol violation: unexpected message `{kind}` in state `{state}`")]
    ProtocolViolation { kind: String, state: String },

    #[error("bad configuration: {0}")]
    BadConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("a bug in mysqlx-session-core: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!(format!("{:#?}", err)))
    }

    /// A distinguished subset of server error codes is surfaced as
    /// `transport-lost`, which callers treat as fatal to the session (§4.2).
    pub fn from_server_error(code: u32, sql_state: String, message: String) -> Self {
        const SERVER_GONE: u32 = 2006;
        const BAD_PIPE: u32 = 2013;
        if code == SERVER_GONE || code == BAD_PIPE {
            Error::TransportLost(message)
        } else {
            Error::ServerError {
                code,
                sql_state,
                message,
            }
        }
    }

    /// Whether this error, once observed on a session, must close it rather
    /// than merely fail the in-flight operation (spec §7 local-recovery rules).
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            Error::TransportLost(_) | Error::TlsHandshakeFailed(_) | Error::ProtocolViolation { .. }
        )
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::TransportLost(s) => Error::TransportLost(s.clone()),
            Error::Malformed(s) => Error::Malformed(s.clone()),
            Error::TlsHandshakeFailed(s) => Error::TlsHandshakeFailed(s.clone()),
            Error::AuthFailed(s) => Error::AuthFailed(s.clone()),
            Error::ServerError {
                code,
                sql_state,
                message,
            } => Error::ServerError {
                code: *code,
                sql_state: sql_state.clone(),
                message: message.clone(),
            },
            Error::ChainViolation { method, state } => Error::ChainViolation {
                method: method.clone(),
                state: state.clone(),
            },
            Error::UnboundPlaceholder(s) => Error::UnboundPlaceholder(s.clone()),
            Error::Timeout(ms) => Error::Timeout(*ms),
            Error::ProtocolViolation { kind, state } => Error::ProtocolViolation {
                kind: kind.clone(),
                state: state.clone(),
            },
            Error::BadConfig(s) => Error::BadConfig(s.clone()),
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::LibraryBug(report) => Error::LibraryBug(eyre!(format!("{report:#}"))),
        }
    }
}
