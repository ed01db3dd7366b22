//! `collection.modify` / `table.update` (spec.md §4.4, "analogous grammars
//! exist for ... modify"): `modify(criteria) -> (orderBy)? -> (limit)? ->
//! operation+ -> bind* -> execute`. `.set`/`.unset`/etc. may repeat like
//! `.bind` — only the structural phases (`where`, `orderBy`, `limit`) are
//! governed by the strict chain guard.

use crate::builder::chain::ChainGuard;
use crate::builder::expr::{self, Expr};
use crate::error::{Error, Result};
use crate::proto::messages as m;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Phase {
    Start,
    Where,
    OrderBy,
    Limit,
}

struct Operation {
    source: String,
    kind: m::UpdateOperationKind,
    value: Option<Expr>,
}

pub struct Update {
    collection: String,
    schema: Option<String>,
    data_model: m::DataModel,
    phase: ChainGuard<Phase>,
    criteria: Option<Expr>,
    order: Vec<(Expr, m::OrderDirection)>,
    limit: Option<u64>,
    operations: Vec<Operation>,
    bindings: HashMap<String, Value>,
}

impl Update {
    fn new(collection: impl Into<String>, data_model: m::DataModel) -> Self {
        Self {
            collection: collection.into(),
            schema: None,
            data_model,
            phase: ChainGuard::new(Phase::Start),
            criteria: None,
            order: Vec::new(),
            limit: None,
            operations: Vec::new(),
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

    pub fn where_(mut self, criteria: &str) -> Result<Self> {
        self.phase.advance(Phase::Where, "where")?;
        self.criteria = Some(expr::parse(criteria)?);
        Ok(self)
    }

    pub fn order_by(mut self, fields: &[&str]) -> Result<Self> {
        self.phase.advance(Phase::OrderBy, "order_by")?;
        for field in fields {
            self.order.push((expr::parse(field)?, m::OrderDirection::Asc));
        }
        Ok(self)
    }

    pub fn limit(mut self, row_count: u64) -> Result<Self> {
        self.phase.advance(Phase::Limit, "limit")?;
        self.limit = Some(row_count);
        Ok(self)
    }

    pub fn set(mut self, field: &str, value: &str) -> Result<Self> {
        self.operations.push(Operation {
            source: field.to_string(),
            kind: m::UpdateOperationKind::Set,
            value: Some(expr::parse(value)?),
        });
        Ok(self)
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.operations.push(Operation {
            source: field.to_string(),
            kind: m::UpdateOperationKind::ItemRemove,
            value: None,
        });
        self
    }

    pub fn array_append(mut self, field: &str, value: &str) -> Result<Self> {
        self.operations.push(Operation {
            source: field.to_string(),
            kind: m::UpdateOperationKind::ArrayAppend,
            value: Some(expr::parse(value)?),
        });
        Ok(self)
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Initial Result state is `await-exec-ok-initial` (spec.md §4.4
    /// "Execute").
    pub fn build(self) -> Result<m::Update> {
        if self.operations.is_empty() {
            return Err(Error::ChainViolation {
                method: "execute".to_string(),
                state: "no operations supplied via .set/.unset/...".to_string(),
            });
        }
        let criteria = self.criteria.map(|e| e.substitute(&self.bindings)).transpose()?;
        let operation = self
            .operations
            .into_iter()
            .map(|op| -> Result<m::UpdateOperation> {
                Ok(m::UpdateOperation {
                    source: m::ColumnIdentifier {
                        document_path: Vec::new(),
                        name: Some(op.source),
                        table_name: None,
                        schema_name: None,
                    },
                    operation: op.kind as i32,
                    value: op
                        .value
                        .map(|e| e.substitute(&self.bindings)?.to_wire())
                        .transpose()?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(m::Update {
            collection: m::Collection {
                name: self.collection,
                schema: self.schema,
            },
            data_model: self.data_model as i32,
            criteria: criteria.map(|e| e.to_wire()).transpose()?,
            order: self
                .order
                .into_iter()
                .map(|(e, dir)| -> Result<m::Order> {
                    Ok(m::Order {
                        expr: Some(e.substitute(&self.bindings)?.to_wire()?),
                        direction: Some(dir as i32),
                    })
                })
                .collect::<Result<_>>()?,
            limit: self.limit.map(|row_count| m::Limit {
                row_count,
                offset: None,
            }),
            operation,
            args: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_may_be_called_multiple_times() {
        let update = Update::collection("docs")
            .where_("id = :id")
            .unwrap()
            .set("name", "'alice'")
            .unwrap()
            .set("age", "30")
            .unwrap()
            .bind("id", 1i64)
            .build()
            .unwrap();
        assert_eq!(update.operation.len(), 2);
    }

    #[test]
    fn build_without_operations_fails() {
        assert!(Update::table("t").where_("1 = 1").unwrap().build().is_err());
    }

    #[test]
    fn where_after_limit_is_a_chain_violation() {
        let result = Update::table("t").limit(1).unwrap().where_("1 = 1");
        assert!(matches!(result, Err(Error::ChainViolation { .. })));
    }
}
