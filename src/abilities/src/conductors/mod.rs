//! Mutation conductors
//!
//! Each conductor captures who is affected and exposes terminal methods
//! (`to`, `from`, `apply`, ...) that perform the writes. Nothing happens
//! until a terminal method is called.

use std::sync::Arc;
use tracing::debug;

use crate::constraints::Constraint;
use crate::error::{AuthzError, Result};
use crate::scope::Scope;
use crate::store::{
    AbilityIdentity, AbilityQuery, Holder, NewAbility, NewRole, PermissionQuery, RoleQuery, Store,
};
use crate::types::{AbilityId, Grantee, Permission, Role, RoleRef, Target, WILDCARD};

mod checks;
mod cleanup;
mod grants;
mod roles;
mod sync;

pub use checks::RoleChecker;
pub use cleanup::Cleanup;
pub use grants::{GrantConductor, GrantMode, PendingOwnership};
pub use roles::{AssignConductor, RetractConductor};
pub use sync::SyncConductor;

/// Ability names accepted by the conductors
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Abilities(pub Vec<String>);

impl Abilities {
    /// Every action (`"*"`)
    pub fn all() -> Self {
        Abilities(vec![WILDCARD.to_string()])
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Abilities {
    fn from(name: &str) -> Self {
        Abilities(vec![name.to_string()])
    }
}

impl From<String> for Abilities {
    fn from(name: String) -> Self {
        Abilities(vec![name])
    }
}

impl From<Vec<&str>> for Abilities {
    fn from(names: Vec<&str>) -> Self {
        Abilities(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Abilities {
    fn from(names: Vec<String>) -> Self {
        Abilities(names)
    }
}

impl From<&[&str]> for Abilities {
    fn from(names: &[&str]) -> Self {
        Abilities(names.iter().map(|name| name.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Abilities {
    fn from(names: [&str; N]) -> Self {
        Abilities(names.iter().map(|name| name.to_string()).collect())
    }
}

/// Role references accepted by the conductors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Roles(pub Vec<RoleRef>);

impl From<&str> for Roles {
    fn from(name: &str) -> Self {
        Roles(vec![RoleRef::from(name)])
    }
}

impl From<RoleRef> for Roles {
    fn from(role: RoleRef) -> Self {
        Roles(vec![role])
    }
}

impl From<&Role> for Roles {
    fn from(role: &Role) -> Self {
        Roles(vec![RoleRef::from(role)])
    }
}

impl From<i64> for Roles {
    fn from(id: i64) -> Self {
        Roles(vec![RoleRef::Id(id)])
    }
}

impl From<Vec<&str>> for Roles {
    fn from(names: Vec<&str>) -> Self {
        Roles(names.into_iter().map(RoleRef::from).collect())
    }
}

impl From<Vec<RoleRef>> for Roles {
    fn from(roles: Vec<RoleRef>) -> Self {
        Roles(roles)
    }
}

impl<const N: usize> From<[&str; N]> for Roles {
    fn from(names: [&str; N]) -> Self {
        Roles(names.into_iter().map(RoleRef::from).collect())
    }
}

/// Store and scope shared by every conductor
#[derive(Clone)]
pub(crate) struct Context {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) scope: Arc<Scope>,
}

impl Context {
    pub(crate) fn new(store: Arc<dyn Store>, scope: Arc<Scope>) -> Self {
        Self { store, scope }
    }

    /// Ability identity for `name` on `target`
    ///
    /// Names and types are stored lowercase. An unsaved record has no key to
    /// bind to and is rejected.
    pub(crate) fn identity(
        name: &str,
        target: Option<&Target>,
        only_owned: bool,
    ) -> Result<AbilityIdentity> {
        let (entity_type, entity_id) = match target {
            None => (None, None),
            Some(Target::Everything) => (Some(WILDCARD.to_string()), None),
            Some(Target::Type { entity_type }) => (Some(entity_type.clone()), None),
            Some(Target::Record(record)) => match record.key {
                Some(key) => (Some(record.entity_type.clone()), Some(key)),
                None => {
                    return Err(AuthzError::InvalidTarget(format!(
                        "{} has not been persisted",
                        record.entity_type
                    )))
                }
            },
        };

        Ok(AbilityIdentity {
            name: name.to_lowercase(),
            entity_type: entity_type.map(|entity_type| entity_type.to_lowercase()),
            entity_id,
            only_owned,
        })
    }

    /// Ids of existing abilities, without creating missing ones
    pub(crate) fn find_ability_ids(
        &self,
        abilities: &Abilities,
        target: Option<&Target>,
        only_owned: bool,
    ) -> Result<Vec<AbilityId>> {
        let mut ids = Vec::new();

        for name in abilities.names() {
            let identity = Self::identity(name, target, only_owned)?;
            let query = AbilityQuery::by_identity(identity, self.scope.model_filter());
            ids.extend(self.store.find_abilities(&query)?.into_iter().map(|a| a.id));
        }

        Ok(ids)
    }

    /// Ids of the named abilities, creating missing ones in the current tenant
    ///
    /// The constraint tree is part of the lookup, so a constrained grant never
    /// reuses or alters an unconstrained row and vice versa.
    pub(crate) fn find_or_create_abilities(
        &self,
        abilities: &Abilities,
        target: Option<&Target>,
        only_owned: bool,
        constraints: Option<&Constraint>,
    ) -> Result<Vec<AbilityId>> {
        let mut ids = Vec::with_capacity(abilities.names().len());

        for name in abilities.names() {
            let identity = Self::identity(name, target, only_owned)?;
            let query = AbilityQuery::by_identity(identity.clone(), self.scope.model_filter())
                .with_constraints(constraints.cloned());

            let ability = match self.store.find_abilities(&query)?.into_iter().next() {
                Some(existing) => existing,
                None => self.store.insert_ability(NewAbility {
                    identity,
                    constraints: constraints.cloned(),
                    scope: self.scope.model_scope(),
                })?,
            };

            ids.push(ability.id);
        }

        Ok(ids)
    }

    /// Look up roles; names that don't exist are created when `create` is set
    ///
    /// A role referenced by id must exist.
    pub(crate) fn resolve_roles(&self, roles: &Roles, create: bool) -> Result<Vec<Role>> {
        let mut resolved = Vec::with_capacity(roles.0.len());

        for role in &roles.0 {
            match role {
                RoleRef::Role(role) => resolved.push(role.clone()),
                RoleRef::Id(id) => {
                    let query = RoleQuery::by_ids(vec![*id], self.scope.model_filter());
                    match self.store.find_roles(&query)?.into_iter().next() {
                        Some(role) => resolved.push(role),
                        None => {
                            return Err(AuthzError::InvalidIdentifier(format!(
                                "no role with id {}",
                                id
                            )))
                        }
                    }
                }
                RoleRef::Name(name) => match self.find_role(name)? {
                    Some(role) => resolved.push(role),
                    None if create => resolved.push(self.create_role(name, None)?),
                    None => {}
                },
            }
        }

        Ok(resolved)
    }

    pub(crate) fn find_role(&self, name: &str) -> Result<Option<Role>> {
        let query = RoleQuery::by_names(vec![name.to_string()], self.scope.model_filter());
        Ok(self.store.find_roles(&query)?.into_iter().next())
    }

    pub(crate) fn create_role(&self, name: &str, level: Option<i64>) -> Result<Role> {
        let role = self.store.insert_role(NewRole {
            name: name.to_string(),
            level,
            scope: self.scope.model_scope(),
        })?;
        debug!(role = %role.name, id = role.id, "Created role");
        Ok(role)
    }

    /// Permission holder for `grantee`, creating a named role on demand
    pub(crate) fn holder(&self, grantee: &Grantee, create: bool) -> Result<Option<Holder>> {
        match grantee {
            Grantee::Authority(authority) => Ok(Some(Holder::Entity(authority.entity_ref()))),
            Grantee::Everyone => Ok(Some(Holder::Everyone)),
            Grantee::Role(role) => Ok(self
                .resolve_roles(&Roles(vec![role.clone()]), create)?
                .into_iter()
                .next()
                .map(|role| Holder::Entity(role.entity_ref()))),
        }
    }

    /// Attach `ability_ids` to `holder`, skipping rows that already exist
    pub(crate) fn attach(&self, holder: &Holder, ability_ids: &[AbilityId], forbidden: bool) -> Result<usize> {
        let existing: Vec<AbilityId> = self
            .store
            .find_permissions(
                &PermissionQuery::held_by(holder.clone(), self.scope.relation_filter())
                    .forbidden(forbidden)
                    .abilities(ability_ids.to_vec()),
            )?
            .into_iter()
            .map(|permission| permission.ability_id)
            .collect();

        let mut attached = 0;
        for id in ability_ids {
            if existing.contains(id) {
                continue;
            }

            self.store.insert_permission(Permission {
                ability_id: *id,
                entity: holder.entity(),
                forbidden,
                scope: self.scope.attach_scope(holder.is_role()),
            })?;
            attached += 1;
        }

        Ok(attached)
    }

    /// Remove the `forbidden` grants of `ability_ids` from `holder`
    pub(crate) fn detach(&self, holder: &Holder, ability_ids: &[AbilityId], forbidden: bool) -> Result<usize> {
        if ability_ids.is_empty() {
            return Ok(0);
        }

        Ok(self.store.delete_permissions(
            &PermissionQuery::held_by(holder.clone(), self.scope.relation_filter())
                .forbidden(forbidden)
                .abilities(ability_ids.to_vec()),
        )?)
    }
}
