//! Engine construction

use std::sync::Arc;
use tracing::info;

use super::AuthzEngine;
use crate::cache::{ArrayStore, CacheStore};
use crate::clipboard::{AbilityResolver, CachedClipboard, Clipboard, StoreClipboard};
use crate::config::EngineConfig;
use crate::ownership::Ownership;
use crate::scope::Scope;
use crate::store::Store;

/// Builder for [`AuthzEngine`]
pub struct AuthzEngineBuilder {
    store: Arc<dyn Store>,
    config: EngineConfig,
    cache: Option<Arc<dyn CacheStore>>,
}

impl AuthzEngineBuilder {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            cache: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache backend (defaults to a process-local [`ArrayStore`])
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self.config.cache.enabled = true;
        self
    }

    /// Resolve every check against the store
    pub fn dont_cache(mut self) -> Self {
        self.config.cache.enabled = false;
        self
    }

    pub fn build(self) -> AuthzEngine {
        let scope = Arc::new(Scope::new(self.config.scope.clone()));
        let ownership = Arc::new(Ownership::new());
        let resolver = AbilityResolver::new(self.store.clone(), scope.clone(), ownership.clone());

        let clipboard: Arc<dyn Clipboard> = if self.config.cache.enabled {
            let cache = self
                .cache
                .unwrap_or_else(|| Arc::new(ArrayStore::new()) as Arc<dyn CacheStore>);
            Arc::new(CachedClipboard::new(resolver, cache, self.config.cache.tag.clone()))
        } else {
            Arc::new(StoreClipboard::new(resolver))
        };

        info!(
            cache = self.config.cache.enabled,
            only_relations = self.config.scope.only_relations,
            slot = ?self.config.guard.slot,
            "AuthzEngine initialized"
        );

        AuthzEngine {
            config: self.config,
            store: self.store,
            scope,
            ownership,
            clipboard,
        }
    }
}
