//! Per-record constraint trees
//!
//! Constraints further gate an ability after its identifier matched. A leaf
//! compares a resource column against a literal ([`ValueConstraint`]) or
//! against a column of the acting principal ([`ColumnConstraint`]); a
//! [`Group`] folds its children left to right.
//!
//! Trees persist alongside their ability as `{"class": ..., "params": {...}}`
//! and round-trip through [`Constraint::data`] / [`Constraint::from_data`].
//!
//! # Example
//!
//! ```rust
//! use cretoai_abilities::constraints::Constraint;
//! use cretoai_abilities::Record;
//!
//! let constraint = Constraint::where_("price", "<=", 100).unwrap();
//! let book = Record::new("book", 1).with_attribute("price", 20);
//!
//! assert!(constraint.check(&book, None));
//! ```

mod builder;
mod constraint;
mod group;
mod operator;

pub use builder::Builder;
pub use constraint::{ColumnConstraint, Constraint, ValueConstraint};
pub use group::Group;
pub use operator::{loose_cmp, loose_eq, LogicalOperator, Operator};
