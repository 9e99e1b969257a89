//! In-memory store
//!
//! Keeps the four tables in vectors behind one lock. Unique indexes mirror
//! the relational schema: abilities on
//! `(name, entity_type, entity_id, only_owned, constraints, scope)` and
//! roles on `(name, scope)`.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::debug;

use super::{
    AbilityQuery, AssignmentQuery, NewAbility, NewRole, PermissionQuery, RoleQuery, Store,
    StoreResult,
};
use crate::config::Tables;
use crate::error::StoreError;
use crate::types::{Ability, AbilityId, AssignedRole, EntityRef, Permission, Role, RoleId};

#[derive(Debug, Default)]
struct State {
    abilities: Vec<Ability>,
    roles: Vec<Role>,
    assigned_roles: Vec<AssignedRole>,
    permissions: Vec<Permission>,
    next_ability_id: AbilityId,
    next_role_id: RoleId,
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    names: Tables,
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create an empty store with the default table names
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store reporting errors against `names`
    pub fn with_tables(names: Tables) -> Self {
        Self {
            names,
            state: RwLock::new(State::default()),
        }
    }

    pub fn ability_count(&self) -> usize {
        self.state.read().abilities.len()
    }

    pub fn role_count(&self) -> usize {
        self.state.read().roles.len()
    }

    pub fn permission_count(&self) -> usize {
        self.state.read().permissions.len()
    }
}

impl Store for InMemoryStore {
    fn find_abilities(&self, query: &AbilityQuery) -> StoreResult<Vec<Ability>> {
        let state = self.state.read();
        Ok(state
            .abilities
            .iter()
            .filter(|ability| query.matches(ability))
            .cloned()
            .collect())
    }

    fn insert_ability(&self, ability: NewAbility) -> StoreResult<Ability> {
        let mut state = self.state.write();

        let duplicate = state
            .abilities
            .iter()
            .any(|existing| {
                ability.identity.matches(existing)
                    && existing.constraints == ability.constraints
                    && existing.scope == ability.scope
            });

        if duplicate {
            return Err(StoreError::UniqueViolation {
                table: self.names.abilities(),
                detail: format!("ability {:?} already exists", ability.identity.name),
            });
        }

        state.next_ability_id += 1;
        let now = Utc::now();
        let row = Ability {
            id: state.next_ability_id,
            name: ability.identity.name,
            entity_type: ability.identity.entity_type,
            entity_id: ability.identity.entity_id,
            only_owned: ability.identity.only_owned,
            constraints: ability.constraints,
            scope: ability.scope,
            created_at: now,
            updated_at: now,
        };

        debug!(id = row.id, identifier = %row.identifier(), "Inserted ability");
        state.abilities.push(row.clone());
        Ok(row)
    }

    fn delete_abilities(&self, ids: &[AbilityId]) -> StoreResult<usize> {
        let mut state = self.state.write();
        let before = state.abilities.len();

        state.abilities.retain(|ability| !ids.contains(&ability.id));
        state
            .permissions
            .retain(|permission| !ids.contains(&permission.ability_id));

        Ok(before - state.abilities.len())
    }

    fn find_roles(&self, query: &RoleQuery) -> StoreResult<Vec<Role>> {
        let state = self.state.read();
        Ok(state
            .roles
            .iter()
            .filter(|role| query.matches(role))
            .cloned()
            .collect())
    }

    fn insert_role(&self, role: NewRole) -> StoreResult<Role> {
        let mut state = self.state.write();

        let duplicate = state
            .roles
            .iter()
            .any(|existing| existing.name == role.name && existing.scope == role.scope);

        if duplicate {
            return Err(StoreError::UniqueViolation {
                table: self.names.roles(),
                detail: format!("role {:?} already exists", role.name),
            });
        }

        state.next_role_id += 1;
        let now = Utc::now();
        let row = Role {
            id: state.next_role_id,
            name: role.name,
            level: role.level,
            scope: role.scope,
            created_at: now,
            updated_at: now,
        };

        debug!(id = row.id, name = %row.name, "Inserted role");
        state.roles.push(row.clone());
        Ok(row)
    }

    fn set_role_level(&self, id: RoleId, level: Option<i64>) -> StoreResult<Role> {
        let mut state = self.state.write();

        let role = state
            .roles
            .iter_mut()
            .find(|role| role.id == id)
            .ok_or_else(|| StoreError::NotFound {
                table: self.names.roles(),
                id,
            })?;

        role.level = level;
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    fn delete_roles(&self, ids: &[RoleId]) -> StoreResult<usize> {
        let mut state = self.state.write();
        let before = state.roles.len();

        state.roles.retain(|role| !ids.contains(&role.id));
        state
            .assigned_roles
            .retain(|assignment| !ids.contains(&assignment.role_id));
        state.permissions.retain(|permission| match &permission.entity {
            Some(entity) if entity.is_role() => !ids.contains(&entity.key),
            _ => true,
        });

        Ok(before - state.roles.len())
    }

    fn find_assignments(&self, query: &AssignmentQuery) -> StoreResult<Vec<AssignedRole>> {
        let state = self.state.read();
        Ok(state
            .assigned_roles
            .iter()
            .filter(|assignment| query.matches(assignment))
            .cloned()
            .collect())
    }

    fn insert_assignment(&self, assignment: AssignedRole) -> StoreResult<()> {
        let mut state = self.state.write();

        if !state.roles.iter().any(|role| role.id == assignment.role_id) {
            return Err(StoreError::NotFound {
                table: self.names.roles(),
                id: assignment.role_id,
            });
        }

        state.assigned_roles.push(assignment);
        Ok(())
    }

    fn delete_assignments(&self, query: &AssignmentQuery) -> StoreResult<usize> {
        let mut state = self.state.write();
        let before = state.assigned_roles.len();
        state
            .assigned_roles
            .retain(|assignment| !query.matches(assignment));
        Ok(before - state.assigned_roles.len())
    }

    fn find_permissions(&self, query: &PermissionQuery) -> StoreResult<Vec<Permission>> {
        let state = self.state.read();
        Ok(state
            .permissions
            .iter()
            .filter(|permission| query.matches(permission))
            .cloned()
            .collect())
    }

    fn insert_permission(&self, permission: Permission) -> StoreResult<()> {
        let mut state = self.state.write();

        if !state
            .abilities
            .iter()
            .any(|ability| ability.id == permission.ability_id)
        {
            return Err(StoreError::NotFound {
                table: self.names.abilities(),
                id: permission.ability_id,
            });
        }

        state.permissions.push(permission);
        Ok(())
    }

    fn delete_permissions(&self, query: &PermissionQuery) -> StoreResult<usize> {
        let mut state = self.state.write();
        let before = state.permissions.len();
        state
            .permissions
            .retain(|permission| !query.matches(permission));
        Ok(before - state.permissions.len())
    }

    fn authorities(&self) -> StoreResult<Vec<EntityRef>> {
        let state = self.state.read();
        let mut seen = HashSet::new();

        let holders = state
            .permissions
            .iter()
            .filter_map(|permission| permission.entity.as_ref())
            .chain(state.assigned_roles.iter().map(|assignment| &assignment.entity));

        Ok(holders
            .filter(|entity| !entity.is_role())
            .filter(|entity| seen.insert((*entity).clone()))
            .cloned()
            .collect())
    }
}
