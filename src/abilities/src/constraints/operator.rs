//! Comparison and logical operators with loose value semantics

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// Column comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
        }
    }

    /// Apply the operator to `left OP right`
    pub fn compare(&self, left: &Value, right: &Value) -> bool {
        match self {
            Operator::Eq => loose_eq(left, right),
            Operator::NotEq => !loose_eq(left, right),
            Operator::Lt => loose_cmp(left, right) == Some(Ordering::Less),
            Operator::Gt => loose_cmp(left, right) == Some(Ordering::Greater),
            Operator::Lte => matches!(loose_cmp(left, right), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gte => matches!(
                loose_cmp(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

impl FromStr for Operator {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::NotEq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Lte),
            ">=" => Ok(Operator::Gte),
            other => Err(AuthzError::InvalidOperator(format!(
                "'{}' is not a comparison operator",
                other
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a constraint joins the result accumulated before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn is_and(&self) -> bool {
        matches!(self, LogicalOperator::And)
    }

    pub fn is_or(&self) -> bool {
        matches!(self, LogicalOperator::Or)
    }
}

impl FromStr for LogicalOperator {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(LogicalOperator::And),
            "or" => Ok(LogicalOperator::Or),
            other => Err(AuthzError::InvalidOperator(format!(
                "'{}' is not a logical operator (expected 'and' or 'or')",
                other
            ))),
        }
    }
}

/// Loose equality: numeric strings compare as numbers, bools by truthiness,
/// null equals the empty/zero value of the other side.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(b), other) | (other, Value::Bool(b)) => truthy(other) == *b,
        (Value::Null, other) | (other, Value::Null) => !truthy(other),
        (Value::String(a), Value::String(b)) => match (numeric(left), numeric(right)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match s.trim().parse::<f64>() {
                Ok(parsed) => n.as_f64() == Some(parsed),
                Err(_) => n.to_string() == *s,
            }
        }
        (Value::Number(_), Value::Number(_)) => numeric(left) == numeric(right),
        _ => left == right,
    }
}

/// Loose ordering; `None` when the two sides are not comparable
pub fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (numeric(left), numeric(right)) {
        return x.partial_cmp(&y);
    }

    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(_) | Value::Null, _) | (_, Value::Bool(_) | Value::Null) => {
            Some(truthy(left).cmp(&truthy(right)))
        }
        _ => None,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_operators() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Gte);
        assert!(matches!("<>".parse::<Operator>(), Err(AuthzError::InvalidOperator(_))));

        assert_eq!("or".parse::<LogicalOperator>().unwrap(), LogicalOperator::Or);
        assert!(matches!("xor".parse::<LogicalOperator>(), Err(AuthzError::InvalidOperator(_))));
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!("1.0"), &json!("1")));
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!(true), &json!("yes")));
        assert!(loose_eq(&json!(null), &json!(0)));
        assert!(loose_eq(&json!(null), &json!("")));
        assert!(!loose_eq(&json!("abc"), &json!("ABC")));
        assert!(!loose_eq(&json!(2), &json!("two")));
    }

    #[test]
    fn test_ordering() {
        assert!(Operator::Lt.compare(&json!(3), &json!("10")));
        assert!(Operator::Gt.compare(&json!("b"), &json!("a")));
        assert!(Operator::Lte.compare(&json!(5), &json!(5)));
        assert!(Operator::Gte.compare(&json!(6), &json!(5)));
        assert!(!Operator::Lt.compare(&json!([1]), &json!({"a": 1})));
    }

    #[test]
    fn test_serde_symbols() {
        assert_eq!(serde_json::to_value(Operator::NotEq).unwrap(), json!("!="));
        let op: Operator = serde_json::from_value(json!("==")).unwrap();
        assert_eq!(op, Operator::Eq);
        assert!(serde_json::from_value::<Operator>(json!("~")).is_err());
    }
}
