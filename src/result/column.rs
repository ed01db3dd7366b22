//! Per-column metadata record (spec.md §3 "Column metadata"). Owned by the
//! `Result`; populated once before any row is delivered and never mutated.

bitflags::bitflags! {
    /// `Mysqlx.Resultset.ColumnMetaData.flags` bits (spec.md does not
    /// mandate specific numbers; this crate's own closed registry, in the
    /// same spirit as `ColumnType::from_wire`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u32 {
        const NOT_NULL = 0x0001;
        const PRIMARY_KEY = 0x0002;
        const UNIQUE_KEY = 0x0004;
        const MULTIPLE_KEY = 0x0008;
        const AUTO_INCREMENT = 0x0010;
        /// Set on `Decimal` columns to mean "unsigned" (X Protocol packs
        /// this bit into the same field rather than a separate flag).
        const UNSIGNED = 0x0020;
        /// Set on `Bytes` columns to mean "padded to `length`" (the
        /// blob/enum/set distinction a classic-protocol flag set would make
        /// is already carried by `ColumnType` here, so this flag only needs
        /// to cover padding).
        const PADDED = 0x0040;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SignedInt,
    UnsignedInt,
    Double,
    Float,
    Bytes,
    Time,
    DateTime,
    Set,
    Enum,
    Bit,
    Decimal,
}

impl ColumnType {
    /// `Mysqlx.Resultset.ColumnMetaData.FieldType` values (spec.md does not
    /// mandate specific numbers; this mapping is this crate's own closed
    /// registry, exercised symmetrically by `from_wire`/round-trip tests).
    pub fn from_wire(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::SignedInt,
            2 => Self::UnsignedInt,
            5 => Self::Double,
            6 => Self::Float,
            7 => Self::Bytes,
            8 => Self::Time,
            12 => Self::DateTime,
            15 => Self::Set,
            16 => Self::Enum,
            17 => Self::Bit,
            18 => Self::Decimal,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub col_type: ColumnType,
    pub name: String,
    pub original_name: String,
    pub table: String,
    pub original_table: String,
    pub schema: String,
    pub catalog: String,
    pub collation: u64,
    pub fractional_digits: u32,
    pub length: u32,
    pub flags: ColumnFlags,
    pub content_type: u32,
}

impl TryFrom<crate::proto::messages::ColumnMetaData> for ColumnMetadata {
    type Error = crate::error::Error;

    fn try_from(wire: crate::proto::messages::ColumnMetaData) -> Result<Self, Self::Error> {
        let col_type = ColumnType::from_wire(wire.col_type).ok_or_else(|| {
            crate::error::Error::Malformed(format!("unknown column type {}", wire.col_type))
        })?;
        let flags = ColumnFlags::from_bits(wire.flags.unwrap_or_default()).ok_or_else(|| {
            crate::error::Error::Malformed(format!(
                "column flags {:#x} contain unknown bits",
                wire.flags.unwrap_or_default()
            ))
        })?;
        Ok(Self {
            col_type,
            name: wire.name.unwrap_or_default(),
            original_name: wire.original_name.unwrap_or_default(),
            table: wire.table.unwrap_or_default(),
            original_table: wire.original_table.unwrap_or_default(),
            schema: wire.schema.unwrap_or_default(),
            catalog: wire.catalog.unwrap_or_default(),
            collation: wire.collation.unwrap_or_default(),
            fractional_digits: wire.fractional_digits.unwrap_or_default(),
            length: wire.length.unwrap_or_default(),
            flags,
            content_type: wire.content_type.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_declared_column_type_round_trips_through_from_wire() {
        for ty in [
            ColumnType::SignedInt,
            ColumnType::UnsignedInt,
            ColumnType::Double,
            ColumnType::Float,
            ColumnType::Bytes,
            ColumnType::Time,
            ColumnType::DateTime,
            ColumnType::Set,
            ColumnType::Enum,
            ColumnType::Bit,
            ColumnType::Decimal,
        ] {
            let wire_value = match ty {
                ColumnType::SignedInt => 1,
                ColumnType::UnsignedInt => 2,
                ColumnType::Double => 5,
                ColumnType::Float => 6,
                ColumnType::Bytes => 7,
                ColumnType::Time => 8,
                ColumnType::DateTime => 12,
                ColumnType::Set => 15,
                ColumnType::Enum => 16,
                ColumnType::Bit => 17,
                ColumnType::Decimal => 18,
            };
            assert_eq!(ColumnType::from_wire(wire_value), Some(ty));
        }
    }

    #[test]
    fn unknown_wire_type_is_none() {
        assert_eq!(ColumnType::from_wire(255), None);
    }

    #[test]
    fn column_metadata_parses_known_flag_bits() {
        let wire = crate::proto::messages::ColumnMetaData {
            col_type: 1,
            name: None,
            original_name: None,
            table: None,
            original_table: None,
            schema: None,
            catalog: None,
            collation: None,
            fractional_digits: None,
            length: None,
            flags: Some(0x0003),
            content_type: None,
        };
        let meta = ColumnMetadata::try_from(wire).unwrap();
        assert!(meta.flags.contains(ColumnFlags::NOT_NULL));
        assert!(meta.flags.contains(ColumnFlags::PRIMARY_KEY));
        assert!(!meta.flags.contains(ColumnFlags::AUTO_INCREMENT));
    }

    #[test]
    fn column_metadata_rejects_unknown_flag_bits() {
        let wire = crate::proto::messages::ColumnMetaData {
            col_type: 1,
            name: None,
            original_name: None,
            table: None,
            original_table: None,
            schema: None,
            catalog: None,
            collation: None,
            fractional_digits: None,
            length: None,
            flags: Some(0x8000),
            content_type: None,
        };
        assert!(ColumnMetadata::try_from(wire).is_err());
    }
}
