//! Ability engine facade
//!
//! Wires the store, tenant scope, ownership rules and clipboard together and
//! exposes checks, grant conductors and cache control.
//!
//! # Architecture
//!
//! ```text
//! can() → Clipboard → [Cache] → AbilityResolver → Store
//!                                    ↓
//!                      identifiers / ownership / constraints
//!
//! allow() / assign() / sync() → Conductors → Store
//! ```
//!
//! Mutations don't invalidate the cache. Call [`AuthzEngine::refresh_for`]
//! or [`AuthzEngine::refresh`] when a change must be visible right away.

mod builder;

pub use builder::AuthzEngineBuilder;

use std::sync::Arc;
use tracing::info;

use crate::cache::CacheStats;
use crate::clipboard::{Clipboard, Verdict};
use crate::conductors::{
    AssignConductor, Cleanup, Context, GrantConductor, GrantMode, RetractConductor, RoleChecker,
    Roles, SyncConductor,
};
use crate::config::EngineConfig;
use crate::error::{AuthzError, Result};
use crate::guard::{Gate, Guard};
use crate::ownership::{Ownership, OwnershipRule};
use crate::scope::{Scope, ScopeFilter};
use crate::store::{AssignmentQuery, Holder, PermissionQuery, Store};
use crate::types::{Ability, Authority, Grantee, Role, RoleRef, Target};

/// Authorization engine
///
/// ```
/// use cretoai_abilities::{AuthzEngine, Authority, InMemoryStore, Record, Target};
/// use std::sync::Arc;
///
/// let engine = AuthzEngine::builder(Arc::new(InMemoryStore::new())).build();
/// let user = Authority::new("user", 1);
/// let post = Target::from(Record::new("post", 7));
///
/// engine.allow(&user).to("edit", Target::of_type("post")).unwrap();
/// assert!(engine.can(&user, "edit", Some(&post)).unwrap());
/// ```
pub struct AuthzEngine {
    config: EngineConfig,
    store: Arc<dyn Store>,
    scope: Arc<Scope>,
    ownership: Arc<Ownership>,
    clipboard: Arc<dyn Clipboard>,
}

impl AuthzEngine {
    pub fn builder(store: Arc<dyn Store>) -> AuthzEngineBuilder {
        AuthzEngineBuilder::new(store)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn clipboard(&self) -> &Arc<dyn Clipboard> {
        &self.clipboard
    }

    /// Current tenant
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    pub fn can(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> Result<bool> {
        self.clipboard.check(authority, ability, target)
    }

    pub fn cannot(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> Result<bool> {
        Ok(!self.can(authority, ability, target)?)
    }

    /// Allowing ability id, explicit forbid, or no opinion
    pub fn check_get_id(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> Result<Verdict> {
        self.clipboard.check_get_id(authority, ability, target)
    }

    pub fn is(&self, authority: &Authority) -> RoleChecker {
        RoleChecker::new(self.clipboard.clone(), authority.clone())
    }

    pub fn abilities_for(&self, authority: &Authority) -> Result<Vec<Ability>> {
        self.clipboard.get_abilities(authority, true)
    }

    pub fn forbidden_abilities_for(&self, authority: &Authority) -> Result<Vec<Ability>> {
        self.clipboard.get_forbidden_abilities(authority)
    }

    pub fn roles_for(&self, authority: &Authority) -> Result<Vec<String>> {
        self.clipboard.get_roles(authority)
    }

    // ------------------------------------------------------------------
    // Grants
    // ------------------------------------------------------------------

    pub fn allow(&self, grantee: impl Into<Grantee>) -> GrantConductor {
        GrantConductor::new(self.context(), grantee.into(), GrantMode::Allow)
    }

    pub fn forbid(&self, grantee: impl Into<Grantee>) -> GrantConductor {
        GrantConductor::new(self.context(), grantee.into(), GrantMode::Forbid)
    }

    pub fn disallow(&self, grantee: impl Into<Grantee>) -> GrantConductor {
        GrantConductor::new(self.context(), grantee.into(), GrantMode::Disallow)
    }

    pub fn unforbid(&self, grantee: impl Into<Grantee>) -> GrantConductor {
        GrantConductor::new(self.context(), grantee.into(), GrantMode::Unforbid)
    }

    /// Grants that apply to every principal
    pub fn allow_everyone(&self) -> GrantConductor {
        self.allow(Grantee::Everyone)
    }

    pub fn forbid_everyone(&self) -> GrantConductor {
        self.forbid(Grantee::Everyone)
    }

    pub fn disallow_everyone(&self) -> GrantConductor {
        self.disallow(Grantee::Everyone)
    }

    pub fn unforbid_everyone(&self) -> GrantConductor {
        self.unforbid(Grantee::Everyone)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    pub fn assign(&self, roles: impl Into<Roles>) -> AssignConductor {
        AssignConductor::new(self.context(), roles.into())
    }

    pub fn retract(&self, roles: impl Into<Roles>) -> RetractConductor {
        RetractConductor::new(self.context(), roles.into())
    }

    pub fn sync(&self, authority: &Authority) -> SyncConductor {
        SyncConductor::new(self.context(), authority.clone())
    }

    /// Find or create the role `name` with the given inheritance level
    pub fn define_role(&self, name: &str, level: Option<i64>) -> Result<Role> {
        let ctx = self.context();

        match ctx.find_role(name)? {
            Some(role) if role.level == level => Ok(role),
            Some(role) => Ok(self.store.set_role_level(role.id, level)?),
            None => ctx.create_role(name, level),
        }
    }

    /// Delete a role with its grants and assignments
    pub fn delete_role(&self, role: impl Into<RoleRef>) -> Result<bool> {
        let resolved = self.context().resolve_roles(&Roles(vec![role.into()]), false);

        let role = match resolved {
            Ok(roles) => match roles.into_iter().next() {
                Some(role) => role,
                None => return Ok(false),
            },
            Err(AuthzError::InvalidIdentifier(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        let deleted = self.store.delete_roles(&[role.id])? > 0;
        info!(role = %role.name, id = role.id, "Deleted role");
        Ok(deleted)
    }

    /// Detach every grant and role assignment of a hard-deleted principal
    pub fn delete_authority(&self, authority: &Authority) -> Result<()> {
        let entity = authority.entity_ref();

        let permissions = self.store.delete_permissions(&PermissionQuery::held_by(
            Holder::Entity(entity.clone()),
            ScopeFilter::Any,
        ))?;
        let assignments = self
            .store
            .delete_assignments(&AssignmentQuery::for_entity(entity, ScopeFilter::Any))?;

        self.refresh_for(authority)?;

        info!(
            authority = %authority.entity_ref(),
            permissions,
            assignments,
            "Deleted authority grants"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ownership, cache and maintenance
    // ------------------------------------------------------------------

    /// Register how ownership of `entity_type` (or `"*"`) is decided
    pub fn owned_via(&self, entity_type: impl Into<String>, rule: impl Into<OwnershipRule>) {
        self.ownership.register(entity_type, rule);
    }

    /// Clear cached state of one principal, or of everyone with `None`
    pub fn refresh(&self, authority: Option<&Authority>) -> Result<()> {
        self.clipboard.refresh(authority)
    }

    pub fn refresh_for(&self, authority: &Authority) -> Result<()> {
        self.clipboard.refresh(Some(authority))
    }

    /// Statistics of the cached clipboard; `None` when caching is off
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.clipboard.stats()
    }

    pub fn cleanup(&self) -> Cleanup {
        Cleanup::new(self.context())
    }

    // ------------------------------------------------------------------
    // Gate
    // ------------------------------------------------------------------

    pub fn guard(&self) -> Guard {
        Guard::new(self.clipboard.clone(), self.config.guard.slot)
    }

    /// Install the engine's hook on `gate`
    pub fn register_at<G: Gate + ?Sized>(&self, gate: &mut G) {
        self.guard().register_at(gate);
    }

    fn context(&self) -> Context {
        Context::new(self.store.clone(), self.scope.clone())
    }
}
