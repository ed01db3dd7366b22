//! `collection.add` / `table.insert` (spec.md §4.4, "analogous grammars
//! exist for ... insert"): `insert(collection) -> columns? -> values -> bind* -> execute`.

use crate::builder::chain::ChainGuard;
use crate::builder::expr::{self, Expr};
use crate::error::{Error, Result};
use crate::proto::messages as m;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Phase {
    Start,
    Columns,
    Values,
}

pub struct Insert {
    collection: String,
    schema: Option<String>,
    data_model: m::DataModel,
    phase: ChainGuard<Phase>,
    columns: Vec<String>,
    rows: Vec<Vec<Expr>>,
    bindings: HashMap<String, Value>,
}

impl Insert {
    fn new(collection: impl Into<String>, data_model: m::DataModel) -> Self {
        Self {
            collection: collection.into(),
            schema: None,
            data_model,
            phase: ChainGuard::new(Phase::Start),
            columns: Vec::new(),
            rows: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, m::DataModel::Document)
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(name, m::DataModel::Table)
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Table-mode column list. Callable once, before `values`.
    pub fn columns(mut self, names: &[&str]) -> Result<Self> {
        self.phase.advance(Phase::Columns, "columns")?;
        self.columns = names.iter().map(|s| s.to_string()).collect();
        Ok(self)
    }

    /// One or more rows, each a list of value expressions (literals,
    /// placeholders, or parsed sub-expressions). Callable once.
    pub fn values(mut self, rows: Vec<Vec<&str>>) -> Result<Self> {
        self.phase.advance(Phase::Values, "values")?;
        self.rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(expr::parse).collect::<Result<_>>())
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Initial Result state is `await-exec-ok-initial` (spec.md §4.4
    /// "Execute").
    pub fn build(self) -> Result<m::Insert> {
        if self.rows.is_empty() {
            return Err(Error::ChainViolation {
                method: "execute".to_string(),
                state: "no rows supplied via .values(...)".to_string(),
            });
        }
        let projection = self
            .columns
            .iter()
            .map(|name| m::ColumnIdentifier {
                document_path: Vec::new(),
                name: Some(name.clone()),
                table_name: None,
                schema_name: None,
            })
            .collect();
        let row = self
            .rows
            .into_iter()
            .map(|row| -> Result<m::InsertTypedRow> {
                Ok(m::InsertTypedRow {
                    field: row
                        .into_iter()
                        .map(|e| e.substitute(&self.bindings)?.to_wire())
                        .collect::<Result<_>>()?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(m::Insert {
            collection: m::Collection {
                name: self.collection,
                schema: self.schema,
            },
            data_model: self.data_model as i32,
            projection,
            row,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_two_row_insert_with_columns() {
        let insert = Insert::table("people")
            .columns(&["name", "age"])
            .unwrap()
            .values(vec![vec!["'alice'", ":age"], vec!["'bob'", "31"]])
            .unwrap()
            .bind("age", 30i64)
            .build()
            .unwrap();
        assert_eq!(insert.row.len(), 2);
        assert_eq!(insert.projection.len(), 2);
    }

    #[test]
    fn columns_after_values_is_a_chain_violation() {
        let result = Insert::table("t")
            .values(vec![vec!["1"]])
            .unwrap()
            .columns(&["a"]);
        assert!(matches!(result, Err(Error::ChainViolation { .. })));
    }

    #[test]
    fn build_without_values_fails() {
        assert!(Insert::collection("docs").build().is_err());
    }
}
