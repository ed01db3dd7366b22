//! `collection.find` and `table.select` (spec.md §4.4): both produce a
//! `crud-find` message and share one chain grammar:
//! `(where)? (groupBy (having)?)? (orderBy)? (limit (offset)?)? (bind*) execute`.

use crate::builder::chain::ChainGuard;
use crate::builder::expr::{self, Expr};
use crate::error::{Error, Result};
use crate::proto::messages as m;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Phase {
    Start,
    Projection,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
}

pub struct Find {
    collection: String,
    schema: Option<String>,
    data_model: m::DataModel,
    phase: ChainGuard<Phase>,
    projection: Vec<(Expr, Option<String>)>,
    criteria: Option<Expr>,
    grouping: Vec<Expr>,
    grouping_criteria: Option<Expr>,
    order: Vec<(Expr, m::OrderDirection)>,
    limit: Option<(u64, Option<u64>)>,
    bindings: HashMap<String, Value>,
}

impl Find {
    fn new(collection: impl Into<String>, data_model: m::DataModel) -> Self {
        Self {
            collection: collection.into(),
            schema: None,
            data_model,
            phase: ChainGuard::new(Phase::Start),
            projection: Vec::new(),
            criteria: None,
            grouping: Vec::new(),
            grouping_criteria: None,
            order: Vec::new(),
            limit: None,
            bindings: HashMap::new(),
        }
    }

    /// `collection.find(...)` — document data model.
    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, m::DataModel::Document)
    }

    /// `table.select(...)` — table data model.
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(name, m::DataModel::Table)
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Projection list (`select(...)` columns or `find(...)` fields).
    /// Callable once, before `where`.
    pub fn projection(mut self, fields: &[&str]) -> Result<Self> {
        self.phase.advance(Phase::Projection, "projection")?;
        for field in fields {
            let (text, alias) = split_alias(field);
            self.projection.push((expr::parse(text)?, alias));
        }
        Ok(self)
    }

    pub fn where_(mut self, criteria: &str) -> Result<Self> {
        self.phase.advance(Phase::Where, "where")?;
        self.criteria = Some(expr::parse(criteria)?);
        Ok(self)
    }

    pub fn group_by(mut self, fields: &[&str]) -> Result<Self> {
        self.phase.advance(Phase::GroupBy, "group_by")?;
        self.grouping = fields.iter().map(|f| expr::parse(f)).collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn having(mut self, criteria: &str) -> Result<Self> {
        self.phase.advance(Phase::Having, "having")?;
        self.grouping_criteria = Some(expr::parse(criteria)?);
        Ok(self)
    }

    pub fn order_by(mut self, fields: &[&str]) -> Result<Self> {
        self.phase.advance(Phase::OrderBy, "order_by")?;
        for field in fields {
            let (text, direction) = split_direction(field);
            self.order.push((expr::parse(text)?, direction));
        }
        Ok(self)
    }

    pub fn limit(mut self, row_count: u64) -> Result<Self> {
        self.phase.advance(Phase::Limit, "limit")?;
        self.limit = Some((row_count, None));
        Ok(self)
    }

    pub fn offset(mut self, offset: u64) -> Result<Self> {
        let (row_count, _) = self
            .limit
            .ok_or_else(|| Error::ChainViolation {
                method: "offset".to_string(),
                state: "limit not yet called".to_string(),
            })?;
        self.limit = Some((row_count, Some(offset)));
        Ok(self)
    }

    /// May be called any number of times until `execute` (spec.md §3
    /// "Statement builder" invariant).
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Initial Result state is `await-metadata-initial` for both `find`
    /// and `select` (spec.md §4.4 "Execute").
    pub fn build(self) -> Result<m::Find> {
        let criteria = self.criteria.map(|e| e.substitute(&self.bindings)).transpose()?;
        let grouping_criteria = self
            .grouping_criteria
            .map(|e| e.substitute(&self.bindings))
            .transpose()?;

        Ok(m::Find {
            collection: m::Collection {
                name: self.collection,
                schema: self.schema,
            },
            data_model: self.data_model as i32,
            projection: self
                .projection
                .into_iter()
                .map(|(e, alias)| -> Result<m::Projection> {
                    Ok(m::Projection {
                        source: Some(e.substitute(&self.bindings)?.to_wire()?),
                        alias,
                    })
                })
                .collect::<Result<_>>()?,
            criteria: criteria.map(|e| e.to_wire()).transpose()?,
            grouping: self
                .grouping
                .into_iter()
                .map(|e| e.substitute(&self.bindings)?.to_wire())
                .collect::<Result<_>>()?,
            grouping_criteria: grouping_criteria.map(|e| e.to_wire()).transpose()?,
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
            limit: self.limit.map(|(row_count, offset)| m::Limit { row_count, offset }),
            args: Vec::new(),
        })
    }
}

fn split_alias(field: &str) -> (&str, Option<String>) {
    if let Some((expr_part, alias)) = field.split_once(" as ").or_else(|| field.split_once(" AS ")) {
        (expr_part.trim(), Some(alias.trim().to_string()))
    } else {
        (field, None)
    }
}

fn split_direction(field: &str) -> (&str, m::OrderDirection) {
    let trimmed = field.trim();
    if let Some(base) = trimmed.strip_suffix("desc").or_else(|| trimmed.strip_suffix("DESC")) {
        (base.trim(), m::OrderDirection::Desc)
    } else if let Some(base) = trimmed.strip_suffix("asc").or_else(|| trimmed.strip_suffix("ASC")) {
        (base.trim(), m::OrderDirection::Asc)
    } else {
        (trimmed, m::OrderDirection::Asc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_grammar_builds_a_find_message() {
        let find = Find::table("people")
            .where_("age > :min_age")
            .unwrap()
            .order_by(&["name desc"])
            .unwrap()
            .limit(10)
            .unwrap()
            .offset(5)
            .unwrap()
            .bind("min_age", 18i64)
            .build()
            .unwrap();
        assert_eq!(find.data_model, m::DataModel::Table as i32);
        assert_eq!(find.limit.as_ref().unwrap().row_count, 10);
        assert_eq!(find.limit.as_ref().unwrap().offset, Some(5));
        assert_eq!(find.order[0].direction, Some(m::OrderDirection::Desc as i32));
    }

    #[test]
    fn where_after_order_by_is_a_chain_violation() {
        let result = Find::collection("docs").order_by(&["a"]).unwrap().where_("b = 1");
        assert!(matches!(result, Err(Error::ChainViolation { .. })));
    }

    #[test]
    fn unbound_placeholder_fails_at_build() {
        let result = Find::collection("docs").where_("a = :x").unwrap().build();
        assert!(matches!(result, Err(Error::UnboundPlaceholder(_))));
    }

    #[test]
    fn offset_without_limit_is_a_chain_violation() {
        let result = Find::collection("docs").offset(5);
        assert!(matches!(result, Err(Error::ChainViolation { .. })));
    }

    #[test]
    fn repeated_projection_is_a_chain_violation() {
        let result = Find::collection("docs")
            .projection(&["a"])
            .unwrap()
            .projection(&["b"]);
        assert!(matches!(result, Err(Error::ChainViolation { .. })));
    }

    #[test]
    fn projection_after_where_is_a_chain_violation() {
        let result = Find::collection("docs")
            .where_("a = 1")
            .unwrap()
            .projection(&["a"]);
        assert!(matches!(result, Err(Error::ChainViolation { .. })));
    }
}
