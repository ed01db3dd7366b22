//! `sql(...)` (spec.md §4.4): the raw-SQL escape hatch, grammar
//! `sql(stmt) -> bind* -> execute`. Named placeholders (`:name`) are
//! substituted with a literal rendering of the bound value at build time,
//! consistent with the CRUD builders' materialize-don't-wire-positionally
//! convention (spec.md §4.4 "Execute").

use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::HashMap;

pub struct Sql {
    stmt: String,
    bindings: HashMap<String, Value>,
}

impl Sql {
    pub fn new(stmt: impl Into<String>) -> Self {
        Self {
            stmt: stmt.into(),
            bindings: HashMap::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Initial Result state is `await-metadata-initial` — a raw `sql-stmt`
    /// may return rows (spec.md §4.4 "Execute").
    pub fn build(self) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(self.stmt.len());
        let mut chars = self.stmt.char_indices().peekable();
        let bytes = self.stmt.as_bytes();

        while let Some((i, ch)) = chars.next() {
            if ch != ':' {
                out.push(ch);
                continue;
            }
            // `::` (e.g. Postgres-style cast) or end-of-string colon: literal.
            if bytes.get(i + 1).is_none_or(|b| !(b.is_ascii_alphabetic() || *b == b'_')) {
                out.push(ch);
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while let Some((j, c)) = chars.peek().copied() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    end = j + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let name = &self.stmt[start..end];
            let value = self
                .bindings
                .get(name)
                .ok_or_else(|| Error::UnboundPlaceholder(name.to_string()))?;
            out.push_str(&literal(value));
        }

        Ok(out.into_bytes())
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Null => "NULL".to_string(),
        Value::String(v) | Value::DateTime(v) | Value::Time(v) | Value::Decimal(v) => {
            format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'"))
        }
        Value::Bytes(v) => format!(
            "x'{}'",
            v.iter().map(|b| format!("{b:02x}")).collect::<String>()
        ),
        Value::Array(_) | Value::Map(_) => {
            // Raw SQL has no container literal syntax; bind scalars instead.
            "NULL".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_placeholders_with_literals() {
        let stmt = Sql::new("SELECT * FROM t WHERE id = :id AND name = :name")
            .bind("id", 7i64)
            .bind("name", "o'brien")
            .build()
            .unwrap();
        let stmt = String::from_utf8(stmt).unwrap();
        assert_eq!(stmt, "SELECT * FROM t WHERE id = 7 AND name = 'o\\'brien'");
    }

    #[test]
    fn double_colon_is_left_untouched() {
        let stmt = Sql::new("SELECT x::int FROM t").build().unwrap();
        assert_eq!(String::from_utf8(stmt).unwrap(), "SELECT x::int FROM t");
    }

    #[test]
    fn unbound_placeholder_fails_at_build() {
        let result = Sql::new("SELECT :missing").build();
        assert!(matches!(result, Err(Error::UnboundPlaceholder(_))));
    }
}
