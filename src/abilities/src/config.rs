//! Engine configuration
//!
//! Everything the engine needs is passed in through [`EngineConfig`] at
//! construction; there is no process-wide registry. The struct deserializes
//! with defaults for every missing field, so embedding processes can load it
//! from their own config files.

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage table names
    pub tables: Tables,

    /// Tenant scoping behaviour
    pub scope: ScopeConfig,

    /// Ability cache settings
    pub cache: CacheConfig,

    /// Gate hook placement
    pub guard: GuardConfig,
}

/// Table names, independently remappable and sharing an optional prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub prefix: String,
    pub abilities: String,
    pub roles: String,
    pub assigned_roles: String,
    pub permissions: String,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            abilities: "abilities".to_string(),
            roles: "roles".to_string(),
            assigned_roles: "assigned_roles".to_string(),
            permissions: "permissions".to_string(),
        }
    }
}

impl Tables {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn abilities(&self) -> String {
        self.qualify(&self.abilities)
    }

    pub fn roles(&self) -> String {
        self.qualify(&self.roles)
    }

    pub fn assigned_roles(&self) -> String {
        self.qualify(&self.assigned_roles)
    }

    pub fn permissions(&self) -> String {
        self.qualify(&self.permissions)
    }

    fn qualify(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }
}

/// Tenant scoping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Scope only the pivot tables; ability and role rows stay global
    pub only_relations: bool,

    /// Stamp the tenant on grants made to roles
    pub scope_role_abilities: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            only_relations: false,
            scope_role_abilities: true,
        }
    }
}

/// Ability cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Resolve through the cache (otherwise every check hits the store)
    pub enabled: bool,

    /// Key namespace, also the tag flushed by a full refresh
    pub tag: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tag: "cretoai-abilities".to_string(),
        }
    }
}

/// Which gate callback the engine answers from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardSlot {
    /// Decide before the gate's own ability definitions run
    #[default]
    Before,
    /// Decide only when nothing else produced a result
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub slot: GuardSlot,
}
