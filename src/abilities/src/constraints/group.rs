//! Constraint groups

use serde::{Deserialize, Serialize};

use super::constraint::Constraint;
use super::operator::LogicalOperator;
use crate::types::{Authority, Record};

/// Ordered list of constraints folded left to right
///
/// Each child joins the running result with its own logical operator; the
/// first child's operator is ignored. `a OR b AND c` is therefore
/// `((a) OR b) AND c`. An empty group passes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// How this group joins its own predecessor when nested
    #[serde(default)]
    pub logical_operator: LogicalOperator,
}

impl Group {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self {
            constraints,
            logical_operator: LogicalOperator::And,
        }
    }

    /// Empty group joined to its predecessor with AND
    pub fn with_and() -> Self {
        Self::default()
    }

    /// Empty group joined to its predecessor with OR
    pub fn with_or() -> Self {
        Self {
            constraints: Vec::new(),
            logical_operator: LogicalOperator::Or,
        }
    }

    pub fn add(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn check(&self, entity: &Record, authority: Option<&Authority>) -> bool {
        self.constraints
            .iter()
            .fold(None, |result: Option<bool>, constraint| {
                let passes = constraint.check(entity, authority);
                Some(match result {
                    None => passes,
                    Some(acc) if constraint.is_or() => acc || passes,
                    Some(acc) => acc && passes,
                })
            })
            .unwrap_or(true)
    }
}
