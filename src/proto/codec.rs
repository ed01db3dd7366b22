//! L2 — message codec: maps a [`MessageKind`] byte to the
//! `prost::Message` type that owns it and back (spec.md §4.2).
//!
//! Trace mode (`Opts::trace` / `MYSQLX_TRACE_CONNECTION`) logs a
//! human-readable rendering of every frame at `tracing::trace!` level
//! without altering control flow — the session behaves identically
//! whether or not trace logging is enabled (spec.md §6.1).

use crate::constant::MessageKind;
use crate::error::{Error, Result};
use crate::proto::messages as m;
use crate::value::Value;
use prost::Message as _;

/// Converts a host-facing [`Value`] into the `Any` shape carried by
/// `stmt-execute`/CRUD argument lists (spec.md §4.4 "Parameter binding").
pub fn value_to_any(value: &Value) -> m::Any {
    match value {
        Value::Null => m::Any::default(),
        Value::Bool(b) => scalar_any(m::ScalarValue::VBool(*b)),
        Value::Int(i) => scalar_any(m::ScalarValue::VSignedInt(*i)),
        Value::UInt(u) => scalar_any(m::ScalarValue::VUnsignedInt(*u)),
        Value::Double(d) => scalar_any(m::ScalarValue::VDouble(*d)),
        Value::Float(f) => scalar_any(m::ScalarValue::VDouble(f64::from(*f))),
        Value::String(s) | Value::DateTime(s) | Value::Time(s) | Value::Decimal(s) => {
            scalar_any(m::ScalarValue::VString(s.clone()))
        }
        Value::Bytes(b) => scalar_any(m::ScalarValue::VOctets(b.clone())),
        Value::Array(items) => m::Any {
            scalar: None,
            array: Some(m::ArrayValue {
                value: items.iter().map(value_to_any).collect(),
            }),
            obj: None,
        },
        Value::Map(fields) => m::Any {
            scalar: None,
            array: None,
            obj: Some(m::ObjectValue {
                fld: fields
                    .iter()
                    .map(|(k, v)| m::ObjectField {
                        key: k.clone(),
                        value: Some(value_to_any(v)),
                    })
                    .collect(),
            }),
        },
    }
}

fn scalar_any(value: m::ScalarValue) -> m::Any {
    m::Any {
        scalar: Some(m::Scalar { value: Some(value) }),
        array: None,
        obj: None,
    }
}

/// The inverse of [`value_to_any`], used when decoding CRUD document
/// literals back for inspection/logging.
pub fn any_to_value(any: &m::Any) -> Result<Value> {
    if let Some(scalar) = &any.scalar {
        return Ok(match &scalar.value {
            None => Value::Null,
            Some(m::ScalarValue::VBool(b)) => Value::Bool(*b),
            Some(m::ScalarValue::VSignedInt(i)) => Value::Int(*i),
            Some(m::ScalarValue::VUnsignedInt(u)) => Value::UInt(*u),
            Some(m::ScalarValue::VDouble(d)) => Value::Double(*d),
            Some(m::ScalarValue::VString(s)) => Value::String(s.clone()),
            Some(m::ScalarValue::VOctets(b)) => Value::Bytes(b.clone()),
        });
    }
    if let Some(array) = &any.array {
        return Ok(Value::Array(
            array.value.iter().map(any_to_value).collect::<Result<_>>()?,
        ));
    }
    if let Some(obj) = &any.obj {
        return Ok(Value::Map(
            obj.fld
                .iter()
                .map(|f| -> Result<(String, Value)> {
                    let v = f
                        .value
                        .as_ref()
                        .ok_or_else(|| Error::Malformed("object field missing value".to_string()))?;
                    Ok((f.key.clone(), any_to_value(v)?))
                })
                .collect::<Result<_>>()?,
        ));
    }
    Ok(Value::Null)
}

/// A decoded client- or server-bound message, tagged by its concrete type
/// so callers can `match` without re-deriving the kind from raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    AuthenticateStart(m::AuthenticateStart),
    AuthenticateContinue(m::AuthenticateContinue),
    AuthenticateOk(m::AuthenticateOk),
    AuthenticateFail(m::AuthenticateFail),
    CapabilitiesGet(m::CapabilitiesGet),
    CapabilitiesSet(m::CapabilitiesSet),
    Capabilities(m::Capabilities),
    Close(m::Close),
    Ok(m::Ok),
    Error(m::ServerError),
    Notice(m::Frame),
    StmtExecute(m::StmtExecute),
    ColumnMetaData(m::ColumnMetaData),
    Row(m::Row),
    FetchDone(m::FetchDone),
    FetchDoneMoreResultsets(m::FetchDoneMoreResultsets),
    StmtExecuteOk(m::StmtExecuteOk),
    CrudFind(m::Find),
    CrudInsert(m::Insert),
    CrudUpdate(m::Update),
    CrudDelete(m::Delete),
}

impl Envelope {
    pub fn kind(&self) -> MessageKind {
        match self {
            Envelope::AuthenticateStart(_) => MessageKind::AuthenticateStart,
            Envelope::AuthenticateContinue(_) => MessageKind::AuthenticateContinue,
            Envelope::AuthenticateOk(_) => MessageKind::AuthenticateOk,
            Envelope::AuthenticateFail(_) => MessageKind::AuthenticateFail,
            Envelope::CapabilitiesGet(_) => MessageKind::CapabilitiesGet,
            Envelope::CapabilitiesSet(_) => MessageKind::CapabilitiesSet,
            Envelope::Capabilities(_) => MessageKind::Capabilities,
            Envelope::Close(_) => MessageKind::Close,
            Envelope::Ok(_) => MessageKind::Ok,
            Envelope::Error(_) => MessageKind::Error,
            Envelope::Notice(_) => MessageKind::NoticeFrame,
            Envelope::StmtExecute(_) => MessageKind::SqlStmtExecute,
            Envelope::ColumnMetaData(_) => MessageKind::SqlColumnMetaData,
            Envelope::Row(_) => MessageKind::SqlRow,
            Envelope::FetchDone(_) => MessageKind::SqlResultFetchDone,
            Envelope::FetchDoneMoreResultsets(_) => MessageKind::SqlResultFetchDoneMoreResultsets,
            Envelope::StmtExecuteOk(_) => MessageKind::SqlStmtExecuteOk,
            Envelope::CrudFind(_) => MessageKind::CrudFind,
            Envelope::CrudInsert(_) => MessageKind::CrudInsert,
            Envelope::CrudUpdate(_) => MessageKind::CrudUpdate,
            Envelope::CrudDelete(_) => MessageKind::CrudDelete,
        }
    }

    pub fn encode(&self, trace: bool) -> Vec<u8> {
        let kind = self.kind();
        let bytes = match self {
            Envelope::AuthenticateStart(msg) => msg.encode_to_vec(),
            Envelope::AuthenticateContinue(msg) => msg.encode_to_vec(),
            Envelope::AuthenticateOk(msg) => msg.encode_to_vec(),
            Envelope::AuthenticateFail(msg) => msg.encode_to_vec(),
            Envelope::CapabilitiesGet(msg) => msg.encode_to_vec(),
            Envelope::CapabilitiesSet(msg) => msg.encode_to_vec(),
            Envelope::Capabilities(msg) => msg.encode_to_vec(),
            Envelope::Close(msg) => msg.encode_to_vec(),
            Envelope::Ok(msg) => msg.encode_to_vec(),
            Envelope::Error(msg) => msg.encode_to_vec(),
            Envelope::Notice(msg) => msg.encode_to_vec(),
            Envelope::StmtExecute(msg) => msg.encode_to_vec(),
            Envelope::ColumnMetaData(msg) => msg.encode_to_vec(),
            Envelope::Row(msg) => msg.encode_to_vec(),
            Envelope::FetchDone(msg) => msg.encode_to_vec(),
            Envelope::FetchDoneMoreResultsets(msg) => msg.encode_to_vec(),
            Envelope::StmtExecuteOk(msg) => msg.encode_to_vec(),
            Envelope::CrudFind(msg) => msg.encode_to_vec(),
            Envelope::CrudInsert(msg) => msg.encode_to_vec(),
            Envelope::CrudUpdate(msg) => msg.encode_to_vec(),
            Envelope::CrudDelete(msg) => msg.encode_to_vec(),
        };
        if trace {
            tracing::trace!(kind = ?kind, bytes = bytes.len(), "-> {:?}", self);
        }
        bytes
    }

    pub fn decode(kind: MessageKind, payload: &[u8], trace: bool) -> Result<Self> {
        let envelope = match kind {
            MessageKind::AuthenticateStart => {
                Envelope::AuthenticateStart(decode::<m::AuthenticateStart>(payload)?)
            }
            MessageKind::AuthenticateContinue => {
                Envelope::AuthenticateContinue(decode::<m::AuthenticateContinue>(payload)?)
            }
            MessageKind::AuthenticateOk => {
                Envelope::AuthenticateOk(decode::<m::AuthenticateOk>(payload)?)
            }
            MessageKind::AuthenticateFail => {
                Envelope::AuthenticateFail(decode::<m::AuthenticateFail>(payload)?)
            }
            MessageKind::CapabilitiesGet => {
                Envelope::CapabilitiesGet(decode::<m::CapabilitiesGet>(payload)?)
            }
            MessageKind::CapabilitiesSet => {
                Envelope::CapabilitiesSet(decode::<m::CapabilitiesSet>(payload)?)
            }
            MessageKind::Capabilities => Envelope::Capabilities(decode::<m::Capabilities>(payload)?),
            MessageKind::Close => Envelope::Close(decode::<m::Close>(payload)?),
            MessageKind::Ok => Envelope::Ok(decode::<m::Ok>(payload)?),
            MessageKind::Error => Envelope::Error(decode::<m::ServerError>(payload)?),
            MessageKind::NoticeFrame => Envelope::Notice(decode::<m::Frame>(payload)?),
            MessageKind::SqlStmtExecute => Envelope::StmtExecute(decode::<m::StmtExecute>(payload)?),
            MessageKind::CrudFind => Envelope::CrudFind(decode::<m::Find>(payload)?),
            MessageKind::CrudInsert => Envelope::CrudInsert(decode::<m::Insert>(payload)?),
            MessageKind::CrudUpdate => Envelope::CrudUpdate(decode::<m::Update>(payload)?),
            MessageKind::CrudDelete => Envelope::CrudDelete(decode::<m::Delete>(payload)?),
            MessageKind::SqlColumnMetaData => {
                Envelope::ColumnMetaData(decode::<m::ColumnMetaData>(payload)?)
            }
            MessageKind::SqlRow => Envelope::Row(decode::<m::Row>(payload)?),
            MessageKind::SqlResultFetchDone => Envelope::FetchDone(decode::<m::FetchDone>(payload)?),
            MessageKind::SqlResultFetchDoneMoreResultsets => {
                Envelope::FetchDoneMoreResultsets(decode::<m::FetchDoneMoreResultsets>(payload)?)
            }
            MessageKind::SqlStmtExecuteOk => {
                Envelope::StmtExecuteOk(decode::<m::StmtExecuteOk>(payload)?)
            }
        };
        if trace {
            tracing::trace!(kind = ?kind, bytes = payload.len(), "<- {:?}", envelope);
        }
        Ok(envelope)
    }
}

fn decode<T: prost::Message + Default>(payload: &[u8]) -> Result<T> {
    T::decode(payload).map_err(|e| Error::Malformed(format!("undecodable protobuf payload: {e}")))
}

/// Parses a raw `(kind byte, payload)` pair read off a
/// [`crate::wire::frame::FrameTransport`] into a typed [`Envelope`],
/// rejecting kind bytes outside the closed registry (spec.md §6).
pub fn decode_frame(kind_byte: u8, payload: &[u8], trace: bool) -> Result<Envelope> {
    let kind = MessageKind::from_byte(kind_byte)
        .ok_or_else(|| Error::Malformed(format!("unknown message kind 0x{kind_byte:02x}")))?;
    Envelope::decode(kind, payload, trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ok_through_encode_decode() {
        let env = Envelope::Ok(m::Ok {
            msg: Some("bye".to_string()),
        });
        let bytes = env.encode(false);
        let decoded = decode_frame(MessageKind::Ok as u8, &bytes, false).unwrap();
        assert_eq!(decoded, env);
    }

    #[test]
    fn unknown_kind_byte_is_malformed() {
        let err = decode_frame(0x7e, &[], false).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn malformed_payload_is_rejected_not_panicking() {
        let err = decode_frame(MessageKind::StmtExecuteOk as u8, &[0xff, 0xff], false).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn value_any_round_trips_scalars_and_containers() {
        let value = Value::Map(vec![
            ("n".to_string(), Value::Int(-7)),
            (
                "a".to_string(),
                Value::Array(vec![Value::String("x".to_string()), Value::Null]),
            ),
        ]);
        let any = value_to_any(&value);
        assert_eq!(any_to_value(&any).unwrap(), value);
    }
}
