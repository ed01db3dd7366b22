//! End-to-end scenarios (spec.md §8 S1-S6) driven over a real TCP loop back
//! connection: a scripted server thread plays the other side of the
//! handshake and statement exchange, and `Session::connect`/`query`/
//! `execute_crud` drive the client side exactly as a real caller would.

use mysqlx_session_core::proto::codec::Envelope;
use mysqlx_session_core::proto::messages as m;
use mysqlx_session_core::wire::frame::FrameTransport;
use mysqlx_session_core::{Crud, Find, Opts, Session, TlsMode};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;

fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out
}

fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn listener_opts(listener: &TcpListener) -> Opts {
    Opts {
        host: "127.0.0.1".to_string(),
        port: listener.local_addr().unwrap().port(),
        user: "root".to_string(),
        password: Some("secret".to_string()),
        tls: mysqlx_session_core::TlsOptions {
            mode: TlsMode::Disabled,
            ..Default::default()
        },
        ..Opts::default()
    }
}

fn recv(transport: &mut FrameTransport<TcpStream>) -> Envelope {
    let (kind, payload) = transport.read_frame().unwrap();
    mysqlx_session_core::proto::codec::decode_frame(kind, &payload, false).unwrap()
}

fn send(transport: &mut FrameTransport<TcpStream>, env: &Envelope) {
    transport
        .write_frame(env.kind() as u8, &env.encode(false))
        .unwrap();
}

/// Drives the pre-auth + challenge-response auth exchange common to S1/S2/S3.
/// Returns the transport positioned right after `authenticate-ok` (or, if
/// `account_expired`, right after the trailing notice+ok).
fn drive_handshake(transport: &mut FrameTransport<TcpStream>, account_expired: bool) {
    // pwd_expire_ok capability negotiation.
    assert!(matches!(recv(transport), Envelope::CapabilitiesSet(_)));
    send(transport, &Envelope::Ok(m::Ok { msg: None }));

    // Challenge-response auth (no TLS requested by these scenarios).
    assert!(matches!(recv(transport), Envelope::AuthenticateStart(_)));
    send(
        transport,
        &Envelope::AuthenticateContinue(m::AuthenticateContinue {
            auth_data: b"0123456789012345678901234567890123456789".to_vec(),
        }),
    );
    assert!(matches!(recv(transport), Envelope::AuthenticateContinue(_)));

    if account_expired {
        send(
            transport,
            &Envelope::Notice(m::Frame {
                notice_type: 3,
                payload: Some(
                    prost::Message::encode_to_vec(&m::SessionStateChanged {
                        param: "account-expired".to_string(),
                        value: None,
                    }),
                ),
            }),
        );
    }
    send(
        transport,
        &Envelope::AuthenticateOk(m::AuthenticateOk { auth_data: None }),
    );
}

fn send_bootstrap_result(transport: &mut FrameTransport<TcpStream>) {
    assert!(matches!(recv(transport), Envelope::StmtExecute(_)));
    for name in ["lower_case_table_names", "version", "connection_id", "ssl_cipher"] {
        let col_type = if name == "version" || name == "ssl_cipher" { 7 } else { 1 };
        send(
            transport,
            &Envelope::ColumnMetaData(m::ColumnMetaData {
                col_type,
                name: Some(name.to_string()),
                original_name: None,
                table: None,
                original_table: None,
                schema: None,
                catalog: None,
                collation: None,
                fractional_digits: None,
                length: None,
                flags: None,
                content_type: None,
            }),
        );
    }
    send(
        transport,
        &Envelope::Row(m::Row {
            field: vec![
                encode_varint(zigzag_encode(0)),
                b"8.0.34".to_vec(),
                encode_varint(zigzag_encode(42)),
                b"AES256-GCM-SHA384".to_vec(),
            ],
        }),
    );
    send(transport, &Envelope::FetchDone(m::FetchDone {}));
    send(
        transport,
        &Envelope::StmtExecuteOk(m::StmtExecuteOk {
            last_insert_id: None,
            rows_affected: None,
            generated_document_id: None,
        }),
    );
}

fn spawn_server(listener: TcpListener, script: impl FnOnce(FrameTransport<TcpStream>) + Send + 'static) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let transport = FrameTransport::new(stream);
        script(transport);
    })
}

#[test]
fn s1_sql_select_returns_one_row_with_no_warnings() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let opts = listener_opts(&listener);

    let handle = spawn_server(listener, |mut transport| {
        drive_handshake(&mut transport, false);
        send_bootstrap_result(&mut transport);

        assert!(matches!(recv(&mut transport), Envelope::StmtExecute(_)));
        send(
            &mut transport,
            &Envelope::ColumnMetaData(m::ColumnMetaData {
                col_type: 1,
                name: Some("1".to_string()),
                original_name: None,
                table: None,
                original_table: None,
                schema: None,
                catalog: None,
                collation: None,
                fractional_digits: None,
                length: None,
                flags: None,
                content_type: None,
            }),
        );
        send(
            &mut transport,
            &Envelope::ColumnMetaData(m::ColumnMetaData {
                col_type: 7,
                name: Some("x".to_string()),
                original_name: None,
                table: None,
                original_table: None,
                schema: None,
                catalog: None,
                collation: None,
                fractional_digits: None,
                length: None,
                flags: None,
                content_type: None,
            }),
        );
        send(
            &mut transport,
            &Envelope::Row(m::Row {
                field: vec![encode_varint(zigzag_encode(1)), b"x".to_vec()],
            }),
        );
        send(&mut transport, &Envelope::FetchDone(m::FetchDone {}));
        send(
            &mut transport,
            &Envelope::StmtExecuteOk(m::StmtExecuteOk {
                last_insert_id: None,
                rows_affected: None,
                generated_document_id: None,
            }),
        );
    });

    let mut session = Session::connect(&opts).unwrap();
    let result = session.query("select 1, 'x'", true).unwrap();
    assert!(result.has_data());
    assert_eq!(result.affected_items(), -1);
    assert!(result.warnings().is_empty());

    let rows = result.fetch_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(0).unwrap().as_i64().unwrap(), 1);
    assert_eq!(rows[0].get(1).unwrap().as_str().unwrap(), "x");

    handle.join().unwrap();
}

#[test]
fn s2_sql_insert_reports_affected_items_and_last_insert_id() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let opts = listener_opts(&listener);

    let handle = spawn_server(listener, |mut transport| {
        drive_handshake(&mut transport, false);
        send_bootstrap_result(&mut transport);

        assert!(matches!(recv(&mut transport), Envelope::StmtExecute(_)));
        send(
            &mut transport,
            &Envelope::StmtExecuteOk(m::StmtExecuteOk {
                last_insert_id: Some(43),
                rows_affected: Some(1),
                generated_document_id: None,
            }),
        );
    });

    let mut session = Session::connect(&opts).unwrap();
    let result = session.query("insert into t(a) values (42)", true).unwrap();
    assert!(!result.has_data());
    assert_eq!(result.affected_items(), 1);
    assert_eq!(result.last_insert_id(), 43);

    handle.join().unwrap();
}

#[test]
fn s3_expired_account_connects_and_skips_bootstrap() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let opts = listener_opts(&listener);

    let handle = spawn_server(listener, |mut transport| {
        drive_handshake(&mut transport, true);
        // No bootstrap StmtExecute should follow.
    });

    let session = Session::connect(&opts).unwrap();
    assert!(session.password_expired());
    assert!(session.server_version.is_none());

    handle.join().unwrap();
}

fn int_column(name: &str) -> m::ColumnMetaData {
    m::ColumnMetaData {
        col_type: 1,
        name: Some(name.to_string()),
        original_name: None,
        table: None,
        original_table: None,
        schema: None,
        catalog: None,
        collation: None,
        fractional_digits: None,
        length: None,
        flags: None,
        content_type: None,
    }
}

#[test]
fn s4_crud_find_with_bind_substitutes_the_placeholder_before_sending() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let opts = listener_opts(&listener);

    let handle = spawn_server(listener, |mut transport| {
        drive_handshake(&mut transport, false);
        send_bootstrap_result(&mut transport);

        let find = match recv(&mut transport) {
            Envelope::CrudFind(find) => find,
            other => panic!("expected crud-find, got {other:?}"),
        };
        // The placeholder must already be resolved to a literal by the time
        // the message reaches the wire — no positional args array.
        assert!(find.args.is_empty());
        assert_eq!(find.collection.name, "docs");

        send(&mut transport, &Envelope::ColumnMetaData(int_column("age")));
        send(
            &mut transport,
            &Envelope::Row(m::Row {
                field: vec![encode_varint(zigzag_encode(42))],
            }),
        );
        send(&mut transport, &Envelope::FetchDone(m::FetchDone {}));
        send(
            &mut transport,
            &Envelope::StmtExecuteOk(m::StmtExecuteOk {
                last_insert_id: None,
                rows_affected: None,
                generated_document_id: None,
            }),
        );
    });

    let mut session = Session::connect(&opts).unwrap();
    let find = Find::collection("docs")
        .where_("age > :min_age")
        .unwrap()
        .bind("min_age", 21_i64)
        .build()
        .unwrap();
    let result = session.execute_crud(Crud::Find(find)).unwrap();

    let rows = result.fetch_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(0).unwrap().as_i64().unwrap(), 42);

    handle.join().unwrap();
}

#[test]
fn s5_multi_result_set_statement_traverses_both_sets_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let opts = listener_opts(&listener);

    let handle = spawn_server(listener, |mut transport| {
        drive_handshake(&mut transport, false);
        send_bootstrap_result(&mut transport);

        assert!(matches!(recv(&mut transport), Envelope::StmtExecute(_)));

        // First result set.
        send(&mut transport, &Envelope::ColumnMetaData(int_column("a")));
        send(
            &mut transport,
            &Envelope::Row(m::Row {
                field: vec![encode_varint(zigzag_encode(1))],
            }),
        );
        send(
            &mut transport,
            &Envelope::FetchDoneMoreResultsets(m::FetchDoneMoreResultsets {}),
        );

        // Second result set, reachable only via `next_result_set`.
        send(&mut transport, &Envelope::ColumnMetaData(int_column("b")));
        send(
            &mut transport,
            &Envelope::Row(m::Row {
                field: vec![encode_varint(zigzag_encode(2))],
            }),
        );
        send(&mut transport, &Envelope::FetchDone(m::FetchDone {}));

        send(
            &mut transport,
            &Envelope::StmtExecuteOk(m::StmtExecuteOk {
                last_insert_id: None,
                rows_affected: None,
                generated_document_id: None,
            }),
        );
    });

    let mut session = Session::connect(&opts).unwrap();
    let result = session.query("call two_sets()", true).unwrap();

    let first = result.fetch_all().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].get(0).unwrap().as_i64().unwrap(), 1);

    assert!(result.next_result_set().unwrap());
    let second = result.fetch_all().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].get(0).unwrap().as_i64().unwrap(), 2);

    assert!(!result.next_result_set().unwrap());

    handle.join().unwrap();
}

#[test]
fn s6_tls_required_but_server_rejects_fails_before_credentials() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut opts = listener_opts(&listener);
    opts.tls.mode = TlsMode::Required;

    let handle = spawn_server(listener, |mut transport| {
        // Server refuses the tls capabilities-set with a server error and
        // closes; the client must never send credentials.
        assert!(matches!(recv(&mut transport), Envelope::CapabilitiesSet(_)));
        send(
            &mut transport,
            &Envelope::Error(m::ServerError {
                code: 5001,
                sql_state: "HY000".to_string(),
                msg: "TLS not supported".to_string(),
            }),
        );
    });

    let result = Session::connect(&opts);
    assert!(matches!(
        result,
        Err(mysqlx_session_core::Error::TlsHandshakeFailed(_))
    ));

    handle.join().unwrap();
}
