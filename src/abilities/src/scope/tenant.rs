//! Current-tenant holder

use parking_lot::RwLock;

use super::types::ScopeFilter;
use crate::config::ScopeConfig;
use crate::types::ScopeValue;

/// Current tenant plus the scoping rules derived from it
///
/// One `Scope` is shared by the engine, its clipboard and its conductors.
/// The temporary override ([`Scope::once_to`], [`Scope::remove_once`]) swaps
/// the shared value for the duration of the callback and puts it back even
/// when the callback panics. It is meant for
/// single-threaded use per engine and is not isolated between threads.
#[derive(Debug, Default)]
pub struct Scope {
    current: RwLock<Option<ScopeValue>>,
    config: ScopeConfig,
}

impl Scope {
    pub fn new(config: ScopeConfig) -> Self {
        Self {
            current: RwLock::new(None),
            config,
        }
    }

    /// Scope all subsequent operations to `scope`
    pub fn to(&self, scope: ScopeValue) {
        *self.current.write() = Some(scope);
    }

    pub fn get(&self) -> Option<ScopeValue> {
        *self.current.read()
    }

    /// Stop scoping
    pub fn remove(&self) {
        *self.current.write() = None;
    }

    /// Run `callback` scoped to `scope`, then restore the previous tenant
    pub fn once_to<T>(&self, scope: ScopeValue, callback: impl FnOnce() -> T) -> T {
        self.swap_for(Some(scope), callback)
    }

    /// Run `callback` unscoped, then restore the previous tenant
    pub fn remove_once<T>(&self, callback: impl FnOnce() -> T) -> T {
        self.swap_for(None, callback)
    }

    fn swap_for<T>(&self, scope: Option<ScopeValue>, callback: impl FnOnce() -> T) -> T {
        let _restore = Restore {
            current: &self.current,
            previous: std::mem::replace(&mut *self.current.write(), scope),
        };
        callback()
    }

    pub fn only_relations(&self) -> bool {
        self.config.only_relations
    }

    pub fn scopes_role_abilities(&self) -> bool {
        self.config.scope_role_abilities
    }

    /// Filter for the ability and role tables
    pub fn model_filter(&self) -> ScopeFilter {
        if self.config.only_relations {
            return ScopeFilter::Any;
        }
        self.relation_filter()
    }

    /// Filter for the permission and role-assignment pivot tables
    pub fn relation_filter(&self) -> ScopeFilter {
        match self.get() {
            Some(scope) => ScopeFilter::Tenant(scope),
            None => ScopeFilter::Any,
        }
    }

    /// Tenant stamped on newly created ability and role rows
    pub fn model_scope(&self) -> Option<ScopeValue> {
        if self.config.only_relations {
            return None;
        }
        self.get()
    }

    /// Tenant stamped on a new pivot row held by a role or another principal
    pub fn attach_scope(&self, holder_is_role: bool) -> Option<ScopeValue> {
        if holder_is_role && !self.config.scope_role_abilities {
            return None;
        }
        self.get()
    }

    /// Suffix `key` with the current tenant, if any
    pub fn append_to_cache_key(&self, key: &str) -> String {
        match self.get() {
            Some(scope) => format!("{}-{}", key, scope),
            None => key.to_string(),
        }
    }
}

/// Puts the previous tenant back when an override ends, including by unwind
struct Restore<'a> {
    current: &'a RwLock<Option<ScopeValue>>,
    previous: Option<ScopeValue>,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        *self.current.write() = self.previous.take();
    }
}
