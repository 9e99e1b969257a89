//! Row filter derived from the current tenant

use crate::types::ScopeValue;

/// Handed to [`Store`](crate::store::Store) queries, which translate it into
/// `scope IS NULL OR scope = ?` (or nothing at all for [`ScopeFilter::Any`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScopeFilter {
    /// No tenant set: every row is visible
    #[default]
    Any,
    /// Global rows plus rows of this tenant
    Tenant(ScopeValue),
}

impl ScopeFilter {
    /// Whether a row stamped with `row_scope` passes the filter
    pub fn admits(&self, row_scope: Option<ScopeValue>) -> bool {
        match (self, row_scope) {
            (ScopeFilter::Any, _) => true,
            (ScopeFilter::Tenant(_), None) => true,
            (ScopeFilter::Tenant(current), Some(row)) => *current == row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_admits_everything() {
        assert!(ScopeFilter::Any.admits(None));
        assert!(ScopeFilter::Any.admits(Some(3)));
    }

    #[test]
    fn test_tenant_is_additive() {
        let filter = ScopeFilter::Tenant(1);
        assert!(filter.admits(None));
        assert!(filter.admits(Some(1)));
        assert!(!filter.admits(Some(2)));
    }
}
