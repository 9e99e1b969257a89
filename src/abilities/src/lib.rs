//! # CretoAI Abilities
//!
//! Ability-based authorization resolution with roles, forbids, ownership,
//! per-record constraints and tenant scoping.
//!
//! ## Features
//!
//! - **Forbid-first resolution**: an explicit forbid always beats an allow
//! - **Wildcards**: one grant can cover a record, a type, any action or everything
//! - **Role levels**: higher-level roles inherit what lower-level roles are allowed
//! - **Ownership**: grants limited to records the principal owns
//! - **Constraints**: serializable AND/OR trees over record and principal columns
//! - **Tenancy**: every read and write filtered by the current scope
//! - **Caching**: per-principal ability and role sets with explicit refresh
//!
//! ## Example
//!
//! ```rust
//! use cretoai_abilities::{AuthzEngine, Authority, InMemoryStore, Record, Target};
//! use std::sync::Arc;
//!
//! # fn main() -> cretoai_abilities::Result<()> {
//! let engine = AuthzEngine::builder(Arc::new(InMemoryStore::new())).build();
//!
//! let user = Authority::new("user", 1);
//! let u1 = Target::from(Record::new("user", 1));
//! let u2 = Target::from(Record::new("user", 2));
//!
//! engine.allow(&user).to("edit", Target::of_type("user"))?;
//! engine.forbid(&user).to("edit", u1.clone())?;
//! engine.refresh_for(&user)?;
//!
//! assert!(!engine.can(&user, "edit", Some(&u1))?);
//! assert!(engine.can(&user, "edit", Some(&u2))?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clipboard;
pub mod conductors;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod guard;
pub mod identifiers;
pub mod ownership;
pub mod scope;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use cache::{ArrayStore, CacheStats, CacheStore};
pub use clipboard::{Clipboard, RoleCheck, Verdict};
pub use conductors::{Abilities, Roles};
pub use config::{CacheConfig, EngineConfig, GuardConfig, GuardSlot, ScopeConfig, Tables};
pub use constraints::{Builder, Constraint, Group};
pub use engine::{AuthzEngine, AuthzEngineBuilder};
pub use error::{AuthzError, Result, StoreError};
pub use guard::{Gate, Guard, HookGate};
pub use ownership::OwnershipRule;
pub use scope::{Scope, ScopeFilter};
pub use store::{InMemoryStore, Store};
pub use types::{
    Ability, AbilityId, Authority, EntityKey, EntityRef, Grantee, Record, Role, RoleId, RoleRef,
    ScopeValue, Target,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
