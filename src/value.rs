//! Polymorphic value carrier (spec.md §9 Design note "Polymorphic result
//! carrier"): a tagged sum replacing the source's dynamically-typed `Value`.
//! Accessors check the tag and return `Result<T>` instead of panicking.

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Textual ISO-8601 form; parsing into a calendar type is left to callers.
    DateTime(String),
    Time(String),
    /// Decimal values are carried as their canonical textual form to avoid
    /// imposing a particular decimal crate on every row read.
    Decimal(String),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Result<i64, Error> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::UInt(v) if *v <= i64::MAX as u64 => Ok(*v as i64),
            other => Err(type_mismatch("i64", other)),
        }
    }

    pub fn as_u64(&self) -> Result<u64, Error> {
        match self {
            Value::UInt(v) => Ok(*v),
            Value::Int(v) if *v >= 0 => Ok(*v as u64),
            other => Err(type_mismatch("u64", other)),
        }
    }

    pub fn as_f64(&self) -> Result<f64, Error> {
        match self {
            Value::Double(v) => Ok(*v),
            Value::Float(v) => Ok(*v as f64),
            other => Err(type_mismatch("f64", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            Value::String(v) => Ok(v.as_str()),
            Value::DateTime(v) | Value::Time(v) | Value::Decimal(v) => Ok(v.as_str()),
            // `Row::get` decodes VARCHAR-like columns as `Bytes` (spec.md
            // leaves row field encoding unspecified; this crate's own
            // convention doesn't distinguish a text column from an opaque
            // one at the wire-type level), so callers expecting a string
            // out of a text column need this to succeed too.
            Value::Bytes(v) => simdutf8::basic::from_utf8(v)
                .map_err(|_| type_mismatch("string", self)),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], Error> {
        match self {
            Value::Bytes(v) => Ok(v.as_slice()),
            Value::String(v) => Ok(v.as_bytes()),
            other => Err(type_mismatch("bytes", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(type_mismatch("bool", other)),
        }
    }
}

fn type_mismatch(wanted: &str, got: &Value) -> Error {
    Error::Malformed(format!("value is not a {wanted}: {got:?}"))
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_uint_accessors_cross_convert_when_in_range() {
        assert_eq!(Value::UInt(5).as_i64().unwrap(), 5);
        assert_eq!(Value::Int(5).as_u64().unwrap(), 5);
        assert!(Value::Int(-1).as_u64().is_err());
    }

    #[test]
    fn accessor_mismatch_is_an_error_not_a_panic() {
        assert!(Value::Null.as_i64().is_err());
        assert!(Value::String("x".into()).as_f64().is_err());
    }

    #[test]
    fn as_str_accepts_utf8_bytes_but_rejects_invalid_utf8() {
        assert_eq!(Value::Bytes(b"8.0.34".to_vec()).as_str().unwrap(), "8.0.34");
        assert!(Value::Bytes(vec![0xff, 0xfe]).as_str().is_err());
    }
}
