//! L3 — session lifecycle: connect, authenticate, bootstrap, execute,
//! close (spec.md §4.3).

pub mod handshake;
pub mod notice;

use crate::constant::BOOTSTRAP_QUERY;
use crate::error::{Error, Result};
use crate::opts::{AuthMethod, Opts, TlsMode};
use crate::proto::codec::{value_to_any, Envelope};
use crate::proto::messages as m;
use crate::result::{InitialShape, ResultHandle, ResultStream};
use crate::value::Value;
use crate::wire::frame::FrameTransport;
use crate::wire::stream::Stream;
use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::unix::net::UnixStream;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Bound on the wait for `ok(bye!)` after a close frame (spec.md §4.3
/// "Close": "If the expected reply does not arrive within a bounded time,
/// the socket is closed unconditionally").
const CLOSE_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// `namespace` accepted by [`Session::execute_stmt`] (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Sql,
    XPlugin,
    Mysqlx,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Namespace::Sql => "sql",
            Namespace::XPlugin => "xplugin",
            Namespace::Mysqlx => "mysqlx",
        }
    }
}

/// A CRUD operation ready to submit (spec.md §4.4 "Execute").
pub enum Crud {
    Find(m::Find),
    Insert(m::Insert),
    Update(m::Update),
    Delete(m::Delete),
}

pub struct Session {
    transport: Rc<RefCell<FrameTransport<Stream>>>,
    trace: bool,
    account_expired: Rc<Cell<bool>>,
    previous_result: Weak<RefCell<ResultStream<Stream>>>,
    /// Set once an error fatal to the session has been observed (spec.md §7
    /// "all others terminate the session"); every further `submit` rejects
    /// with `TransportLost` instead of writing to the dead transport.
    closed: Cell<bool>,

    pub server_version: Option<String>,
    pub connection_id: Option<u32>,
    pub tls_cipher: Option<String>,
    pub case_sensitive_identifiers: Option<bool>,
}

impl Session {
    /// Opens a transport, negotiates TLS and expired-password tolerance,
    /// authenticates, and (unless the account is expired) runs the
    /// bootstrap query (spec.md §4.3 "Connect").
    pub fn connect(opts: &Opts) -> Result<Self> {
        let raw = dial(opts)?;
        let trace = opts.trace;
        if let Some(timeout) = opts.connect_timeout {
            raw.set_read_timeout(Some(timeout))?;
        }
        let mut transport = FrameTransport::new(raw);

        let tls_requested = opts.tls.mode != TlsMode::Disabled;
        if tls_requested {
            handshake::negotiate_tls(&mut transport, opts, trace)
                .map_err(|e| Error::TlsHandshakeFailed(e.to_string()))?;
            transport = upgrade_tls(transport, opts)?;
        }
        handshake::negotiate_pwd_expire_ok(&mut transport, trace)?;

        let method = handshake::select_auth_method(opts, tls_requested);
        let outcome = handshake::authenticate(&mut transport, opts, method, trace)?;

        if opts.connect_timeout.is_some() {
            transport.get_ref().set_read_timeout(None)?;
        }

        let account_expired = Rc::new(Cell::new(outcome.password_expired));
        let transport = Rc::new(RefCell::new(transport));

        let mut session = Self {
            transport,
            trace,
            account_expired,
            previous_result: Weak::new(),
            closed: Cell::new(false),
            server_version: None,
            connection_id: None,
            tls_cipher: None,
            case_sensitive_identifiers: None,
        };

        if !session.account_expired.get() {
            session.bootstrap()?;
        }
        Ok(session)
    }

    fn bootstrap(&mut self) -> Result<()> {
        let handle = self.query(BOOTSTRAP_QUERY, true)?;
        handle.buffer(false)?;
        if let Some(row) = handle.fetch_one()? {
            let lower_case_table_names = row.get(0)?.as_i64().unwrap_or(0);
            self.case_sensitive_identifiers = Some(lower_case_table_names == 0);
            self.server_version = row.get(1).ok().and_then(|v| v.as_str().ok().map(str::to_string));
            self.connection_id = row
                .get(2)
                .ok()
                .and_then(|v| v.as_i64().ok())
                .map(|v| v as u32);
            self.tls_cipher = row.get(3).ok().and_then(|v| v.as_str().ok().map(str::to_string));
        }
        Ok(())
    }

    pub fn password_expired(&self) -> bool {
        self.account_expired.get()
    }

    /// Runs `sql` as a `sql-stmt-execute` with no bind arguments.
    pub fn query(&mut self, sql: &str, buffered: bool) -> Result<ResultHandle<Stream>> {
        let handle = self.execute_stmt(Namespace::Sql, sql.as_bytes().to_vec(), Vec::new())?;
        if buffered {
            handle.buffer(false)?;
            handle.rewind();
        }
        Ok(handle)
    }

    /// Convenience that drains the Result (spec.md §6).
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.query(sql, true).map(|_| ())
    }

    pub fn execute_stmt(
        &mut self,
        namespace: Namespace,
        stmt: Vec<u8>,
        args: Vec<Value>,
    ) -> Result<ResultHandle<Stream>> {
        let env = Envelope::StmtExecute(m::StmtExecute {
            namespace: Some(namespace.as_str().to_string()),
            stmt,
            args: args.iter().map(value_to_any).collect(),
            compact_metadata: None,
        });
        self.submit(env, InitialShape::MayReturnRows)
    }

    pub fn execute_crud(&mut self, crud: Crud) -> Result<ResultHandle<Stream>> {
        let (env, shape) = match crud {
            Crud::Find(find) => (Envelope::CrudFind(find), InitialShape::MayReturnRows),
            Crud::Insert(insert) => (Envelope::CrudInsert(insert), InitialShape::ExecOnly),
            Crud::Update(update) => (Envelope::CrudUpdate(update), InitialShape::ExecOnly),
            Crud::Delete(delete) => (Envelope::CrudDelete(delete), InitialShape::ExecOnly),
        };
        self.submit(env, shape)
    }

    /// Enforces the at-most-one-live-Result invariant, then sends `env` and
    /// opens a new [`ResultStream`] in `shape`'s initial state (spec.md
    /// §4.2 "At-most-one live Result invariant"). Rejects outright once a
    /// prior error has poisoned the session (spec.md §7 "all others
    /// terminate the session").
    fn submit(&mut self, env: Envelope, shape: InitialShape) -> Result<ResultHandle<Stream>> {
        if self.closed.get() {
            return Err(Error::TransportLost(
                "session is closed after a fatal error".to_string(),
            ));
        }

        if let Some(previous) = self.previous_result.upgrade() {
            if !previous.borrow().is_terminal() {
                if let Err(e) = previous.borrow_mut().buffer(true) {
                    self.poison_if_fatal(&e);
                    return Err(e);
                }
            }
        }

        if let Err(e) = self
            .transport
            .borrow_mut()
            .write_frame(env.kind() as u8, &env.encode(self.trace))
        {
            self.poison_if_fatal(&e);
            return Err(e);
        }

        let stream = ResultStream::new(
            self.transport.clone(),
            shape,
            self.trace,
            self.account_expired.clone(),
        );
        let (handle, weak) = ResultHandle::new(stream);
        self.previous_result = weak;
        Ok(handle)
    }

    fn poison_if_fatal(&self, err: &Error) {
        if err.is_fatal_to_session() {
            self.closed.set(true);
        }
    }

    /// Sends a close frame, expects `ok(bye!)`, and shuts the socket down
    /// unconditionally if the reply does not arrive in time (spec.md §4.3
    /// "Close").
    pub fn close(mut self) -> Result<()> {
        self.close_mut()
    }

    fn close_mut(&mut self) -> Result<()> {
        if let Some(previous) = self.previous_result.upgrade() {
            if !previous.borrow().is_terminal() {
                let _ = previous.borrow_mut().buffer(true);
            }
        }
        self.transport
            .borrow_mut()
            .write_frame(Envelope::Close(m::Close {}).kind() as u8, &[])?;

        match self
            .transport
            .borrow_mut()
            .read_frame_with_deadline(CLOSE_REPLY_TIMEOUT)
        {
            Ok((kind, payload)) => {
                match crate::proto::codec::decode_frame(kind, &payload, self.trace) {
                    Ok(Envelope::Ok(_)) => {}
                    _ => tracing::warn!("server did not reply ok(bye!) to close"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "close reply did not arrive; closing socket anyway"),
        }
        Ok(())
    }
}

fn dial(opts: &Opts) -> Result<Stream> {
    let use_unix = opts.unix_socket.is_some()
        && (opts.host.is_empty() || opts.host == "localhost");
    if use_unix {
        let path = opts.unix_socket.as_deref().expect("checked above");
        let socket = UnixStream::connect(path)?;
        return Ok(Stream::unix(socket));
    }
    let addr = format!("{}:{}", opts.host, opts.port);
    let socket = TcpStream::connect(&addr)?;
    Ok(Stream::tcp(socket))
}

/// Upgrades to TLS, honoring `ssl-mode`'s verification strictness: `preferred`
/// and `required` encrypt without verifying the peer; `verify-ca` checks the
/// certificate chain but not the hostname; `verify-identity` checks both
/// (spec.md §3 "Connection options").
fn upgrade_tls(transport: FrameTransport<Stream>, opts: &Opts) -> Result<FrameTransport<Stream>> {
    let mut builder = native_tls::TlsConnector::builder();
    match opts.tls.mode {
        TlsMode::Disabled => unreachable!("caller only upgrades when TLS was requested"),
        TlsMode::Preferred | TlsMode::Required => {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsMode::VerifyCa => {
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsMode::VerifyIdentity => {}
    }
    if let Some(ca_path) = &opts.tls.ca_path {
        let pem = std::fs::read(ca_path)?;
        let cert = native_tls::Certificate::from_pem(&pem)
            .map_err(|e| Error::TlsHandshakeFailed(e.to_string()))?;
        builder.add_root_certificate(cert);
    }
    let connector = builder
        .build()
        .map_err(|e| Error::TlsHandshakeFailed(e.to_string()))?;
    let stream = transport.into_inner();
    let upgraded = stream
        .upgrade_to_tls(&opts.host, &connector)
        .map_err(|e| Error::TlsHandshakeFailed(e.to_string()))?;
    Ok(FrameTransport::new(upgraded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_names_are_bit_exact() {
        assert_eq!(Namespace::Sql.as_str(), "sql");
        assert_eq!(Namespace::XPlugin.as_str(), "xplugin");
        assert_eq!(Namespace::Mysqlx.as_str(), "mysqlx");
    }
}
