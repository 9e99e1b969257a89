//! Resource ownership resolution
//!
//! Resolution order: a rule registered for the record's type, then the
//! wildcard (`"*"`) rule, then the `{principal_type}_id == principal.key`
//! heuristic. Unknown types fall through to the heuristic.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constraints::loose_eq;
use crate::types::{Authority, Record, Target, WILDCARD};

/// Two-argument ownership predicate
pub type OwnershipPredicate = Arc<dyn Fn(&Record, &Authority) -> bool + Send + Sync>;

/// How ownership of a resource type is decided
#[derive(Clone)]
pub enum OwnershipRule {
    /// `record.{attribute} == principal.key`
    Attribute(String),
    /// Arbitrary predicate over (record, principal)
    Predicate(OwnershipPredicate),
}

impl OwnershipRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Record, &Authority) -> bool + Send + Sync + 'static,
    {
        OwnershipRule::Predicate(Arc::new(f))
    }

    fn owns(&self, record: &Record, authority: &Authority) -> bool {
        match self {
            OwnershipRule::Attribute(attribute) => {
                loose_eq(&record.attribute(attribute), &Value::from(authority.key))
            }
            OwnershipRule::Predicate(predicate) => predicate(record, authority),
        }
    }
}

impl fmt::Debug for OwnershipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipRule::Attribute(attribute) => f.debug_tuple("Attribute").field(attribute).finish(),
            OwnershipRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for OwnershipRule {
    fn from(attribute: &str) -> Self {
        OwnershipRule::Attribute(attribute.to_string())
    }
}

impl From<String> for OwnershipRule {
    fn from(attribute: String) -> Self {
        OwnershipRule::Attribute(attribute)
    }
}

/// Ownership rule registry owned by one engine
#[derive(Debug, Default)]
pub struct Ownership {
    rules: RwLock<HashMap<String, OwnershipRule>>,
}

impl Ownership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for a resource type, or for every type with `"*"`
    pub fn register(&self, entity_type: impl Into<String>, rule: impl Into<OwnershipRule>) {
        self.rules.write().insert(entity_type.into(), rule.into());
    }

    /// Drop every registered rule
    pub fn clear(&self) {
        self.rules.write().clear();
    }

    /// Whether `authority` owns the concrete record behind `target`
    ///
    /// Types, wildcards and unsaved records are never owned.
    pub fn is_owned_by(&self, authority: &Authority, target: Option<&Target>) -> bool {
        match target.and_then(Target::existing_record) {
            Some(record) => self.owns(authority, record),
            None => false,
        }
    }

    fn owns(&self, authority: &Authority, record: &Record) -> bool {
        let rules = self.rules.read();

        if let Some(rule) = rules.get(&record.entity_type).or_else(|| rules.get(WILDCARD)) {
            return rule.owns(record, authority);
        }

        let attribute = format!("{}_id", authority.entity_type.to_lowercase());
        loose_eq(&record.attribute(&attribute), &Value::from(authority.key))
    }
}
