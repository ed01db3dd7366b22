//! Row: lazy per-column decode referencing the owning `Result`'s column
//! vector (spec.md §3 "Row" — implicit in "Column metadata ... populated
//! once before any row is delivered").
//!
//! Field encodings mirror the host language's scalar kinds rather than
//! classic MySQL's length-encoded strings: fixed-width little-endian for
//! numeric types, a varint for integers (protobuf's own wire convention,
//! since the whole message is Protocol-Buffers), and raw bytes for
//! everything else. This crate's own closed convention — spec.md leaves
//! row field encoding unspecified beyond "per-column record".

use crate::error::{Error, Result};
use crate::result::column::{ColumnMetadata, ColumnType};
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<ColumnMetadata>>,
    fields: Vec<Vec<u8>>,
}

impl Row {
    pub fn new(columns: Arc<Vec<ColumnMetadata>>, fields: Vec<Vec<u8>>) -> Self {
        Self { columns, fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&ColumnMetadata> {
        self.columns.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Decodes field `index` into a [`Value`] according to its column type.
    /// Decoding happens on access, not at row construction.
    pub fn get(&self, index: usize) -> Result<Value> {
        let meta = self
            .columns
            .get(index)
            .ok_or_else(|| Error::Malformed(format!("column index {index} out of range")))?;
        let raw = self
            .fields
            .get(index)
            .ok_or_else(|| Error::Malformed(format!("field index {index} out of range")))?;
        decode_field(meta.col_type, raw)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Value> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::Malformed(format!("no such column `{name}`")))?;
        self.get(index)
    }
}

fn decode_field(col_type: ColumnType, raw: &[u8]) -> Result<Value> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    match col_type {
        ColumnType::SignedInt => Ok(Value::Int(zigzag_decode(decode_varint(raw)?))),
        ColumnType::UnsignedInt => Ok(Value::UInt(decode_varint(raw)?)),
        ColumnType::Double => {
            let bytes: [u8; 8] = raw
                .try_into()
                .map_err(|_| Error::Malformed("double field is not 8 bytes".to_string()))?;
            Ok(Value::Double(f64::from_le_bytes(bytes)))
        }
        ColumnType::Float => {
            let bytes: [u8; 4] = raw
                .try_into()
                .map_err(|_| Error::Malformed("float field is not 4 bytes".to_string()))?;
            Ok(Value::Float(f32::from_le_bytes(bytes)))
        }
        ColumnType::Bytes | ColumnType::Set | ColumnType::Enum => {
            Ok(Value::Bytes(strip_trailing_nul(raw).to_vec()))
        }
        ColumnType::Time => Ok(Value::Time(utf8(raw)?)),
        ColumnType::DateTime => Ok(Value::DateTime(utf8(raw)?)),
        ColumnType::Decimal => Ok(Value::Decimal(utf8(raw)?)),
        ColumnType::Bit => Ok(Value::UInt(decode_varint(raw)?)),
    }
}

fn strip_trailing_nul(raw: &[u8]) -> &[u8] {
    raw.strip_suffix(&[0u8]).unwrap_or(raw)
}

fn utf8(raw: &[u8]) -> Result<String> {
    simdutf8::basic::from_utf8(strip_trailing_nul(raw))
        .map(str::to_string)
        .map_err(|_| Error::Malformed("field is not valid UTF-8".to_string()))
}

fn decode_varint(raw: &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for (i, &byte) in raw.iter().enumerate() {
        if i >= 10 {
            return Err(Error::Malformed("varint field too long".to_string()));
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::Malformed("truncated varint field".to_string()))
}

fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn row_of(col_type: ColumnType, raw: Vec<u8>) -> Row {
        let columns = Arc::new(vec![ColumnMetadata {
            col_type,
            name: "c".to_string(),
            original_name: "c".to_string(),
            table: String::new(),
            original_table: String::new(),
            schema: String::new(),
            catalog: String::new(),
            collation: 0,
            fractional_digits: 0,
            length: 0,
            flags: crate::result::column::ColumnFlags::empty(),
            content_type: 0,
        }]);
        Row::new(columns, vec![raw])
    }

    #[test]
    fn empty_field_decodes_to_null_for_any_type() {
        let row = row_of(ColumnType::SignedInt, vec![]);
        assert_eq!(row.get(0).unwrap(), Value::Null);
    }

    #[test]
    fn signed_int_round_trips_negative_values() {
        let raw = encode_varint(zigzag_encode(-42));
        let row = row_of(ColumnType::SignedInt, raw);
        assert_eq!(row.get(0).unwrap(), Value::Int(-42));
    }

    #[test]
    fn unsigned_int_round_trips() {
        let row = row_of(ColumnType::UnsignedInt, encode_varint(300));
        assert_eq!(row.get(0).unwrap(), Value::UInt(300));
    }

    #[test]
    fn double_round_trips() {
        let row = row_of(ColumnType::Double, 3.5f64.to_le_bytes().to_vec());
        assert_eq!(row.get(0).unwrap(), Value::Double(3.5));
    }

    #[test]
    fn bytes_field_strips_trailing_nul_terminator() {
        let row = row_of(ColumnType::Bytes, b"hello\0".to_vec());
        assert_eq!(row.get(0).unwrap(), Value::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn get_by_name_resolves_through_column_vector() {
        let row = row_of(ColumnType::UnsignedInt, encode_varint(7));
        assert_eq!(row.get_by_name("c").unwrap(), Value::UInt(7));
        assert!(row.get_by_name("missing").is_err());
    }
}
