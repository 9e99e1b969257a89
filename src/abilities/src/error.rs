//! Error types for the ability engine

use thiserror::Error;

/// Ability engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A principal or role reference that cannot be resolved
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Grant target that would leave a dangling reference
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Unknown comparison or logical operator in a constraint
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// Storage backend failure, surfaced as-is
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Constraint or cache payload (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a [`Store`](crate::store::Store) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index on `table` rejected the row
    #[error("Unique violation on {table}: {detail}")]
    UniqueViolation { table: String, detail: String },

    /// Row lookup by primary key failed
    #[error("Row {id} not found in {table}")]
    NotFound { table: String, id: i64 },

    /// Anything a foreign backend reports (connectivity, timeouts, ...)
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for ability engine operations
pub type Result<T> = std::result::Result<T, AuthzError>;
