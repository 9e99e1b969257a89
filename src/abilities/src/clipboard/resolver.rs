//! Fresh resolution against the store

use std::sync::Arc;
use tracing::debug;

use super::Clipboard;
use crate::error::Result;
use crate::identifiers;
use crate::ownership::Ownership;
use crate::scope::Scope;
use crate::store::{AbilityQuery, AssignmentQuery, Holder, PermissionQuery, RoleQuery, Store};
use crate::types::{Ability, AbilityId, Authority, Role, RoleId, Target};

/// Collects a principal's abilities from the store and matches candidates
///
/// Allowed abilities come from three sources: grants held by the principal,
/// grants held by everyone, and grants held by a role the principal reaches.
/// A role is reached when it is assigned directly or when its level is below
/// the highest level among assigned roles. Forbidden sets are collected from
/// the same holders.
pub struct AbilityResolver {
    store: Arc<dyn Store>,
    scope: Arc<Scope>,
    ownership: Arc<Ownership>,
}

impl AbilityResolver {
    pub fn new(store: Arc<dyn Store>, scope: Arc<Scope>, ownership: Arc<Ownership>) -> Self {
        Self {
            store,
            scope,
            ownership,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    pub fn ownership(&self) -> &Arc<Ownership> {
        &self.ownership
    }

    /// Allowed or forbidden abilities of `authority`, straight from the store
    pub fn fresh_abilities(&self, authority: &Authority, allowed: bool) -> Result<Vec<Ability>> {
        let relations = self.scope.relation_filter();
        let forbidden = !allowed;

        let mut holders = vec![Holder::Entity(authority.entity_ref()), Holder::Everyone];
        holders.extend(
            self.reachable_roles(authority)?
                .iter()
                .map(|role| Holder::Entity(role.entity_ref())),
        );

        let mut ids: Vec<AbilityId> = Vec::new();
        for holder in holders {
            let query = PermissionQuery::held_by(holder, relations).forbidden(forbidden);
            ids.extend(
                self.store
                    .find_permissions(&query)?
                    .into_iter()
                    .map(|permission| permission.ability_id),
            );
        }

        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let abilities = self
            .store
            .find_abilities(&AbilityQuery::by_ids(ids, self.scope.model_filter()))?;

        debug!(
            authority = %authority.entity_ref(),
            allowed,
            count = abilities.len(),
            "Resolved abilities from store"
        );

        Ok(abilities)
    }

    /// Roles assigned to `authority` within the current tenant
    pub fn assigned_roles(&self, authority: &Authority) -> Result<Vec<Role>> {
        let assignments = self.store.find_assignments(&AssignmentQuery::for_entity(
            authority.entity_ref(),
            self.scope.relation_filter(),
        ))?;

        let mut role_ids: Vec<RoleId> = assignments.iter().map(|a| a.role_id).collect();
        role_ids.sort_unstable();
        role_ids.dedup();

        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .find_roles(&RoleQuery::by_ids(role_ids, self.scope.model_filter()))?)
    }

    pub fn fresh_roles(&self, authority: &Authority) -> Result<Vec<String>> {
        Ok(self
            .assigned_roles(authority)?
            .into_iter()
            .map(|role| role.name)
            .collect())
    }

    fn reachable_roles(&self, authority: &Authority) -> Result<Vec<Role>> {
        let mut roles = self.assigned_roles(authority)?;

        if let Some(max_level) = roles.iter().filter_map(|role| role.level).max() {
            let inherited = self
                .store
                .find_roles(&RoleQuery::below_level(max_level, self.scope.model_filter()))?;
            roles.extend(inherited);
        }

        roles.sort_unstable_by_key(|role| role.id);
        roles.dedup_by_key(|role| role.id);
        Ok(roles)
    }

    /// First ability in `abilities` matching one of `candidates`
    ///
    /// Owned variants are tried only when no plain candidate matches and the
    /// principal owns the target record.
    pub fn find_matching(
        &self,
        abilities: &[Ability],
        candidates: &[String],
        authority: &Authority,
        target: Option<&Target>,
    ) -> Option<AbilityId> {
        if let Some(id) = Self::matched_id(abilities, candidates, authority, target) {
            return Some(id);
        }

        if self.ownership.is_owned_by(authority, target) {
            let owned = identifiers::owned_variants(candidates);
            return Self::matched_id(abilities, &owned, authority, target);
        }

        None
    }

    fn matched_id(
        abilities: &[Ability],
        candidates: &[String],
        authority: &Authority,
        target: Option<&Target>,
    ) -> Option<AbilityId> {
        abilities
            .iter()
            .find(|ability| {
                candidates.contains(&ability.identifier())
                    && Self::constraints_pass(ability, authority, target)
            })
            .map(|ability| ability.id)
    }

    fn constraints_pass(ability: &Ability, authority: &Authority, target: Option<&Target>) -> bool {
        let Some(constraints) = &ability.constraints else {
            return true;
        };

        match target.and_then(Target::existing_record) {
            Some(record) => constraints.check(record, Some(authority)),
            None => false,
        }
    }
}

/// Clipboard without a cache: every check queries the store
pub struct StoreClipboard {
    resolver: AbilityResolver,
}

impl StoreClipboard {
    pub fn new(resolver: AbilityResolver) -> Self {
        Self { resolver }
    }
}

impl Clipboard for StoreClipboard {
    fn resolver(&self) -> &AbilityResolver {
        &self.resolver
    }

    fn get_abilities(&self, authority: &Authority, allowed: bool) -> Result<Vec<Ability>> {
        self.resolver.fresh_abilities(authority, allowed)
    }

    fn get_roles(&self, authority: &Authority) -> Result<Vec<String>> {
        self.resolver.fresh_roles(authority)
    }
}
