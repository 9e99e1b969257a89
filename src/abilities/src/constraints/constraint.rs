//! Constraint leaves and the serializable constraint tree

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::group::Group;
use super::operator::{LogicalOperator, Operator};
use crate::error::{AuthzError, Result};
use crate::types::{Authority, Record};

/// Compares a resource column against a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueConstraint {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
    #[serde(default)]
    pub logical_operator: LogicalOperator,
}

impl ValueConstraint {
    pub fn check(&self, entity: &Record) -> bool {
        self.operator.compare(&entity.attribute(&self.column), &self.value)
    }
}

/// Compares a resource column against a column on the principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConstraint {
    /// Resource column
    pub a: String,
    pub operator: Operator,
    /// Principal column
    pub b: String,
    #[serde(default)]
    pub logical_operator: LogicalOperator,
}

impl ColumnConstraint {
    /// Fails closed when there is no principal to compare against
    pub fn check(&self, entity: &Record, authority: Option<&Authority>) -> bool {
        match authority {
            Some(authority) => self
                .operator
                .compare(&entity.attribute(&self.a), &authority.attribute(&self.b)),
            None => false,
        }
    }
}

/// Constraint tree, persisted as `{"class": ..., "params": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", content = "params")]
pub enum Constraint {
    #[serde(rename = "ValueConstraint")]
    Value(ValueConstraint),
    #[serde(rename = "ColumnConstraint")]
    Column(ColumnConstraint),
    #[serde(rename = "Group")]
    Group(Group),
}

impl Constraint {
    /// `column operator value`, joined with AND
    pub fn where_(column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Result<Self> {
        Self::value_constraint(column, operator, value, LogicalOperator::And)
    }

    /// `column operator value`, joined with OR
    pub fn or_where(column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Result<Self> {
        Self::value_constraint(column, operator, value, LogicalOperator::Or)
    }

    /// `resource.a operator principal.b`, joined with AND
    pub fn where_column(a: impl Into<String>, operator: &str, b: impl Into<String>) -> Result<Self> {
        Self::column_constraint(a, operator, b, LogicalOperator::And)
    }

    /// `resource.a operator principal.b`, joined with OR
    pub fn or_where_column(a: impl Into<String>, operator: &str, b: impl Into<String>) -> Result<Self> {
        Self::column_constraint(a, operator, b, LogicalOperator::Or)
    }

    fn value_constraint(
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
        logical_operator: LogicalOperator,
    ) -> Result<Self> {
        Ok(Constraint::Value(ValueConstraint {
            column: column.into(),
            operator: operator.parse()?,
            value: value.into(),
            logical_operator,
        }))
    }

    fn column_constraint(
        a: impl Into<String>,
        operator: &str,
        b: impl Into<String>,
        logical_operator: LogicalOperator,
    ) -> Result<Self> {
        Ok(Constraint::Column(ColumnConstraint {
            a: a.into(),
            operator: operator.parse()?,
            b: b.into(),
            logical_operator,
        }))
    }

    /// Evaluate against a resource and (optionally) the acting principal
    pub fn check(&self, entity: &Record, authority: Option<&Authority>) -> bool {
        match self {
            Constraint::Value(constraint) => constraint.check(entity),
            Constraint::Column(constraint) => constraint.check(entity, authority),
            Constraint::Group(group) => group.check(entity, authority),
        }
    }

    pub fn logical_operator(&self) -> LogicalOperator {
        match self {
            Constraint::Value(c) => c.logical_operator,
            Constraint::Column(c) => c.logical_operator,
            Constraint::Group(g) => g.logical_operator,
        }
    }

    pub fn with_logical_operator(mut self, operator: LogicalOperator) -> Self {
        match &mut self {
            Constraint::Value(c) => c.logical_operator = operator,
            Constraint::Column(c) => c.logical_operator = operator,
            Constraint::Group(g) => g.logical_operator = operator,
        }
        self
    }

    pub fn is_and(&self) -> bool {
        self.logical_operator().is_and()
    }

    pub fn is_or(&self) -> bool {
        self.logical_operator().is_or()
    }

    /// Serialized `{class, params}` form
    pub fn data(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a tree from its `{class, params}` form
    pub fn from_data(data: Value) -> Result<Self> {
        serde_json::from_value(data).map_err(AuthzError::from)
    }
}

impl From<Group> for Constraint {
    fn from(group: Group) -> Self {
        Constraint::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post() -> Record {
        Record::new("post", 1)
            .with_attribute("price", 50)
            .with_attribute("team_id", 7)
    }

    #[test]
    fn test_value_constraint() {
        assert!(Constraint::where_("price", ">", 40).unwrap().check(&post(), None));
        assert!(!Constraint::where_("price", "<", 40).unwrap().check(&post(), None));
        assert!(Constraint::where_("price", "==", "50").unwrap().check(&post(), None));
        assert!(Constraint::where_("missing", "=", Value::Null).unwrap().check(&post(), None));
    }

    #[test]
    fn test_column_constraint() {
        let user = Authority::new("user", 3).with_attribute("team_id", 7);
        let other = Authority::new("user", 4).with_attribute("team_id", 8);
        let constraint = Constraint::where_column("team_id", "=", "team_id").unwrap();

        assert!(constraint.check(&post(), Some(&user)));
        assert!(!constraint.check(&post(), Some(&other)));
        assert!(!constraint.check(&post(), None));
    }

    #[test]
    fn test_invalid_operator_rejected_at_construction() {
        assert!(matches!(
            Constraint::where_("price", "=>", 1),
            Err(AuthzError::InvalidOperator(_))
        ));
        assert!(matches!(
            Constraint::or_where_column("a", "like", "b"),
            Err(AuthzError::InvalidOperator(_))
        ));
    }

    #[test]
    fn test_data_shape() {
        let constraint = Constraint::or_where("price", ">=", 10).unwrap();
        assert_eq!(
            constraint.data().unwrap(),
            json!({
                "class": "ValueConstraint",
                "params": {
                    "column": "price",
                    "operator": ">=",
                    "value": 10,
                    "logicalOperator": "or"
                }
            })
        );

        let column = Constraint::where_column("user_id", "=", "id").unwrap();
        assert_eq!(
            column.data().unwrap(),
            json!({
                "class": "ColumnConstraint",
                "params": {"a": "user_id", "operator": "=", "b": "id", "logicalOperator": "and"}
            })
        );
    }

    #[test]
    fn test_from_data_rejects_unknown_class() {
        let data = json!({"class": "RegexConstraint", "params": {}});
        assert!(matches!(Constraint::from_data(data), Err(AuthzError::Serialization(_))));
    }
}
