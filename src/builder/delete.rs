//! `collection.remove` / `table.delete` (spec.md §4.4, "analogous grammars
//! exist for ... remove"): `(where)? (orderBy)? (limit)? (bind*) execute`
//! — the same shape as `find`/`select` but without projection/groupBy/having.

use crate::builder::chain::ChainGuard;
use crate::builder::expr::{self, Expr};
use crate::error::Result;
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

pub struct Delete {
    collection: String,
    schema: Option<String>,
    data_model: m::DataModel,
    phase: ChainGuard<Phase>,
    criteria: Option<Expr>,
    order: Vec<(Expr, m::OrderDirection)>,
    limit: Option<u64>,
    bindings: HashMap<String, Value>,
}

impl Delete {
    fn new(collection: impl Into<String>, data_model: m::DataModel) -> Self {
        Self {
            collection: collection.into(),
            schema: None,
            data_model,
            phase: ChainGuard::new(Phase::Start),
            criteria: None,
            order: Vec::new(),
            limit: None,
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

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Initial Result state is `await-exec-ok-initial` (spec.md §4.4
    /// "Execute").
    pub fn build(self) -> Result<m::Delete> {
        let criteria = self.criteria.map(|e| e.substitute(&self.bindings)).transpose()?;
        Ok(m::Delete {
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
            args: Vec::new(),
        })
    }
}
