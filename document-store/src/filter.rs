//! Backend-agnostic filter expressions and their normalization into native
//! query clauses.

use serde_json::{json, Value};

use crate::StoreError;

/// Comparison operators allowed in a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl ComparisonOp {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            "in" => Self::In,
            "not in" => Self::NotIn,
            _ => return None,
        })
    }
}

/// Boolean composition of child expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Not,
}

impl LogicOp {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            _ => return None,
        })
    }
}

/// A recursive filter tree with two node kinds.
///
/// Leaf conditions compare one field against a value; groups combine child
/// expressions with a logical operator. Nested metadata fields are addressed
/// with dot paths (e.g. `meta.category`).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Comparison {
        field: String,
        op: ComparisonOp,
        value: Value,
    },
    Logic {
        op: LogicOp,
        conditions: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    pub fn comparison(field: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self::Comparison { field: field.into(), op, value }
    }

    pub fn logic(op: LogicOp, conditions: Vec<FilterExpr>) -> Self {
        Self::Logic { op, conditions }
    }

    /// Parses the wire shape of a filter.
    ///
    /// A logic node carries `"operator"` and `"conditions"`; a comparison node
    /// carries `"field"`, `"operator"` and `"value"`. Anything else is rejected
    /// before normalization.
    pub fn from_json(raw: &Value) -> Result<Self, StoreError> {
        let fields = raw
            .as_object()
            .ok_or_else(|| StoreError::InvalidFilter("filter must be an object".into()))?;

        if fields.contains_key("conditions") {
            let operator = fields
                .get("operator")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    StoreError::InvalidFilter("logic node is missing the 'operator' key".into())
                })?;
            let op = LogicOp::parse(operator).ok_or_else(|| {
                StoreError::InvalidFilter(format!("unknown logical operator '{operator}'"))
            })?;
            let conditions = fields
                .get("conditions")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    StoreError::InvalidFilter("'conditions' must be an array".into())
                })?
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::Logic { op, conditions });
        }

        if fields.contains_key("field") {
            let field = fields
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::InvalidFilter("'field' must be a string".into()))?;
            let operator = fields
                .get("operator")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    StoreError::InvalidFilter("comparison node is missing the 'operator' key".into())
                })?;
            let op = ComparisonOp::parse(operator).ok_or_else(|| {
                StoreError::InvalidFilter(format!("unknown comparison operator '{operator}'"))
            })?;
            let value = fields.get("value").cloned().ok_or_else(|| {
                StoreError::InvalidFilter("comparison node is missing the 'value' key".into())
            })?;
            return Ok(Self::Comparison { field: field.to_string(), op, value });
        }

        Err(StoreError::InvalidFilter(
            "filter must contain either 'operator' and 'conditions' keys or 'field', 'operator' and 'value' keys".into(),
        ))
    }
}

/// Converts a filter expression into the backend's native clause.
///
/// Purely structural; no backend calls happen here.
pub fn normalize(expr: &FilterExpr) -> Result<Value, StoreError> {
    match expr {
        FilterExpr::Logic { op, conditions } => normalize_logic(*op, conditions),
        FilterExpr::Comparison { field, op, value } => normalize_comparison(field, *op, value),
    }
}

fn normalize_logic(op: LogicOp, conditions: &[FilterExpr]) -> Result<Value, StoreError> {
    let clauses = conditions.iter().map(normalize).collect::<Result<Vec<_>, _>>()?;
    Ok(match op {
        LogicOp::And => json!({"bool": {"must": clauses}}),
        LogicOp::Or => json!({"bool": {"should": clauses, "minimum_should_match": 1}}),
        LogicOp::Not => json!({"bool": {"must_not": [{"bool": {"must": clauses}}]}}),
    })
}

fn normalize_comparison(field: &str, op: ComparisonOp, value: &Value) -> Result<Value, StoreError> {
    match op {
        ComparisonOp::Eq => Ok(match value {
            Value::Null => json!({"bool": {"must_not": {"exists": {"field": field}}}}),
            Value::Array(_) => json!({"terms": {field: value}}),
            _ => json!({"term": {field: value}}),
        }),
        ComparisonOp::Ne => Ok(match value {
            Value::Null => json!({"exists": {"field": field}}),
            Value::Array(_) => json!({"bool": {"must_not": {"terms": {field: value}}}}),
            _ => json!({"bool": {"must_not": {"term": {field: value}}}}),
        }),
        ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte => {
            if !(value.is_number() || value.is_string()) {
                return Err(StoreError::InvalidFilter(format!(
                    "range comparison on '{field}' requires a number or string value, got {value}"
                )));
            }
            let bound = match op {
                ComparisonOp::Gt => "gt",
                ComparisonOp::Gte => "gte",
                ComparisonOp::Lt => "lt",
                _ => "lte",
            };
            Ok(json!({"range": {field: {bound: value}}}))
        }
        ComparisonOp::In | ComparisonOp::NotIn => {
            if !value.is_array() {
                return Err(StoreError::InvalidFilter(format!(
                    "membership comparison on '{field}' requires an array value, got {value}"
                )));
            }
            Ok(if op == ComparisonOp::In {
                json!({"terms": {field: value}})
            } else {
                json!({"bool": {"must_not": {"terms": {field: value}}}})
            })
        }
    }
}
