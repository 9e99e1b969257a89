//! Cached clipboard
//!
//! Each principal has three entries: allowed abilities, forbidden abilities
//! and assigned role names. Keys are
//! `{tag}-abilities-{type}-{key}-{a|f}` and `{tag}-roles-{type}-{key}-a`,
//! suffixed with the current tenant when one is set.
//!
//! Misses compute and store without locking. Two concurrent misses for the
//! same principal both compute and both write the same value.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AbilityResolver, Clipboard};
use crate::cache::{CacheStats, CacheStore};
use crate::error::Result;
use crate::scope::ScopeFilter;
use crate::store::RoleQuery;
use crate::types::{Ability, Authority};

pub struct CachedClipboard {
    resolver: AbilityResolver,
    cache: Arc<dyn CacheStore>,
    tag: String,
    stats: DashMap<String, usize>,
}

impl CachedClipboard {
    pub fn new(resolver: AbilityResolver, cache: Arc<dyn CacheStore>, tag: impl Into<String>) -> Self {
        Self {
            resolver,
            cache,
            tag: tag.into(),
            stats: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Clear the three entries of `authority` under the current tenant
    pub fn refresh_for(&self, authority: &Authority) {
        self.cache.forget(&self.abilities_key(authority, true));
        self.cache.forget(&self.abilities_key(authority, false));
        self.cache.forget(&self.roles_key(authority));

        self.increment_stat("refreshes");
        debug!(authority = %authority.entity_ref(), "Refreshed cached abilities");
    }

    /// Clear every entry, by tag when the backend supports it
    pub fn refresh_all(&self) -> Result<()> {
        if self.cache.flush_tag(&self.tag) {
            self.increment_stat("refreshes");
            info!(tag = %self.tag, "Flushed ability cache");
            return Ok(());
        }

        self.refresh_all_iteratively()
    }

    /// Per-principal refresh for backends without tags
    ///
    /// Walks every principal the store knows about plus every role, so the
    /// cost grows linearly with the number of principals. Only keys for the
    /// current tenant are cleared.
    pub fn refresh_all_iteratively(&self) -> Result<()> {
        let store = self.resolver.store();
        let authorities = store.authorities()?;
        let roles = store.find_roles(&RoleQuery::all(ScopeFilter::Any))?;

        warn!(
            principals = authorities.len(),
            roles = roles.len(),
            "Cache store has no tag support, refreshing every principal"
        );

        for entity in &authorities {
            self.refresh_for(&Authority::new(entity.entity_type.clone(), entity.key));
        }

        for role in &roles {
            self.refresh_for(&role.as_authority());
        }

        Ok(())
    }

    fn abilities_key(&self, authority: &Authority, allowed: bool) -> String {
        let key = format!(
            "{}-abilities-{}-{}-{}",
            self.tag,
            authority.entity_type,
            authority.key,
            if allowed { "a" } else { "f" }
        );
        self.resolver.scope().append_to_cache_key(&key)
    }

    fn roles_key(&self, authority: &Authority) -> String {
        let key = format!("{}-roles-{}-{}-a", self.tag, authority.entity_type, authority.key);
        self.resolver.scope().append_to_cache_key(&key)
    }

    /// Cached value under `key`, computing and storing it on a miss
    fn sear<T, F>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(payload) = self.cache.get(key) {
            match serde_json::from_value::<T>(payload) {
                Ok(value) => {
                    self.increment_stat("hits");
                    return Ok(value);
                }
                Err(e) => {
                    self.increment_stat("corrupt");
                    warn!(key, error = %e, "Malformed cache payload, recomputing");
                }
            }
        }

        self.increment_stat("misses");
        let value = compute()?;
        self.cache
            .forever_tagged(&self.tag, key, serde_json::to_value(&value)?);
        Ok(value)
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl Clipboard for CachedClipboard {
    fn resolver(&self) -> &AbilityResolver {
        &self.resolver
    }

    fn get_abilities(&self, authority: &Authority, allowed: bool) -> Result<Vec<Ability>> {
        let key = self.abilities_key(authority, allowed);
        self.sear(&key, || self.resolver.fresh_abilities(authority, allowed))
    }

    fn get_roles(&self, authority: &Authority) -> Result<Vec<String>> {
        let key = self.roles_key(authority);
        self.sear(&key, || self.resolver.fresh_roles(authority))
    }

    fn refresh(&self, authority: Option<&Authority>) -> Result<()> {
        match authority {
            Some(authority) => {
                self.refresh_for(authority);
                Ok(())
            }
            None => self.refresh_all(),
        }
    }

    fn stats(&self) -> Option<CacheStats> {
        Some(CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            corrupt: self.get_stat("corrupt"),
            refreshes: self.get_stat("refreshes"),
            entries: self.cache.len(),
        })
    }
}
