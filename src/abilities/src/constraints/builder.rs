//! Fluent constraint builder

use serde_json::Value;

use super::constraint::Constraint;
use super::group::Group;
use super::operator::LogicalOperator;
use crate::error::Result;

/// Builds a constraint tree from chained calls
///
/// ```rust
/// use cretoai_abilities::constraints::Builder;
///
/// # fn main() -> cretoai_abilities::Result<()> {
/// let constraint = Builder::new()
///     .where_("price", ">", 40)?
///     .or_where_column("user_id", "=", "id")?
///     .build();
/// # let _ = constraint;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    constraints: Vec<Constraint>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(self, column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(self.push(Constraint::where_(column, operator, value)?))
    }

    pub fn or_where(self, column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(self.push(Constraint::or_where(column, operator, value)?))
    }

    /// `column = value`
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Constraint::Value(super::ValueConstraint {
            column: column.into(),
            operator: super::Operator::Eq,
            value: value.into(),
            logical_operator: LogicalOperator::And,
        }))
    }

    pub fn where_column(self, a: impl Into<String>, operator: &str, b: impl Into<String>) -> Result<Self> {
        Ok(self.push(Constraint::where_column(a, operator, b)?))
    }

    pub fn or_where_column(self, a: impl Into<String>, operator: &str, b: impl Into<String>) -> Result<Self> {
        Ok(self.push(Constraint::or_where_column(a, operator, b)?))
    }

    /// Nested group joined with AND
    pub fn where_group<F>(self, nest: F) -> Result<Self>
    where
        F: FnOnce(Builder) -> Result<Builder>,
    {
        let nested = nest(Builder::new())?.into_group(LogicalOperator::And);
        Ok(self.push(nested))
    }

    /// Nested group joined with OR
    pub fn or_where_group<F>(self, nest: F) -> Result<Self>
    where
        F: FnOnce(Builder) -> Result<Builder>,
    {
        let nested = nest(Builder::new())?.into_group(LogicalOperator::Or);
        Ok(self.push(nested))
    }

    /// A single condition collapses to that leaf; anything else becomes an AND group
    pub fn build(mut self) -> Constraint {
        if self.constraints.len() == 1 {
            return self.constraints.remove(0);
        }

        Constraint::Group(Group::new(self.constraints))
    }

    fn into_group(self, logical_operator: LogicalOperator) -> Constraint {
        let mut group = Group::new(self.constraints);
        group.logical_operator = logical_operator;
        Constraint::Group(group)
    }

    fn push(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}
