//! Business success conditions.
//!
//! A condition maps response-body field names to accepted values. The check
//! passes when any one field matches, e.g.
//! `{ code: [200, 20000, "200"], errCode: [0, "0"], err_code: 1 }`.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Accepted value(s) for one condition field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    /// Any member of the list is accepted.
    AnyOf(Vec<Value>),
    /// Exactly this value is accepted.
    One(Value),
}

impl Expected {
    /// Check an actual body value against this expectation.
    pub fn accepts(&self, actual: &Value) -> bool {
        match self {
            Expected::AnyOf(values) => values.iter().any(|v| strict_eq(v, actual)),
            Expected::One(value) => strict_eq(value, actual),
        }
    }
}

impl From<Value> for Expected {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Expected::AnyOf(values),
            other => Expected::One(other),
        }
    }
}

/// Field-to-expectation mapping, satisfied if any field matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuccessCondition {
    fields: BTreeMap<String, Expected>,
}

impl SuccessCondition {
    /// An empty condition. Add fields with [`equals`](Self::equals) or
    /// [`any_of`](Self::any_of).
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `field == value`.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), Expected::One(value.into()));
        self
    }

    /// Accept `field` being any of `values`.
    pub fn any_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.fields.insert(field.into(), Expected::AnyOf(values));
        self
    }

    /// Whether no field has been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields and their accepted values, ordered by field name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Expected)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `body` passes this condition.
    ///
    /// An empty condition has nothing to match and never passes. A body that
    /// is not a JSON object has no fields and never passes.
    pub fn is_satisfied_by(&self, body: &Value) -> bool {
        self.fields.iter().any(|(field, expected)| {
            body.get(field.as_str())
                .map(|actual| expected.accepts(actual))
                .unwrap_or(false)
        })
    }
}

/// Evaluate an optional condition; no condition means success.
pub fn check(condition: Option<&SuccessCondition>, body: &Value) -> bool {
    condition.map_or(true, |c| c.is_satisfied_by(body))
}

/// Type-strict equality: strings never equal numbers, numbers compare by
/// value regardless of their integer/float representation.
fn strict_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => numbers_eq(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).map_or(false, |y| strict_eq(x, y)))
        }
        (a, b) => a == b,
    }
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
