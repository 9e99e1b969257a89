//! Grant storage
//!
//! The engine talks to storage only through the [`Store`] trait. Every query
//! carries a [`ScopeFilter`] produced by the current [`Scope`](crate::scope::Scope);
//! implementations translate it into their own `scope IS NULL OR scope = ?`
//! clause. Query structs expose `matches` so in-process stores can filter
//! rows without re-implementing the semantics.

use crate::constraints::Constraint;
use crate::error::StoreError;
use crate::scope::ScopeFilter;
use crate::types::{
    Ability, AbilityId, AssignedRole, EntityKey, EntityRef, Permission, Role, RoleId, ScopeValue,
};

mod memory;

pub use memory::InMemoryStore;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend for abilities, roles and the two pivot tables
///
/// Deleting an ability or role cascades to the pivot rows that reference it.
pub trait Store: Send + Sync {
    fn find_abilities(&self, query: &AbilityQuery) -> StoreResult<Vec<Ability>>;

    fn insert_ability(&self, ability: NewAbility) -> StoreResult<Ability>;

    fn delete_abilities(&self, ids: &[AbilityId]) -> StoreResult<usize>;

    fn find_roles(&self, query: &RoleQuery) -> StoreResult<Vec<Role>>;

    fn insert_role(&self, role: NewRole) -> StoreResult<Role>;

    fn set_role_level(&self, id: RoleId, level: Option<i64>) -> StoreResult<Role>;

    fn delete_roles(&self, ids: &[RoleId]) -> StoreResult<usize>;

    fn find_assignments(&self, query: &AssignmentQuery) -> StoreResult<Vec<AssignedRole>>;

    fn insert_assignment(&self, assignment: AssignedRole) -> StoreResult<()>;

    fn delete_assignments(&self, query: &AssignmentQuery) -> StoreResult<usize>;

    fn find_permissions(&self, query: &PermissionQuery) -> StoreResult<Vec<Permission>>;

    fn insert_permission(&self, permission: Permission) -> StoreResult<()>;

    fn delete_permissions(&self, query: &PermissionQuery) -> StoreResult<usize>;

    /// Every non-role principal referenced by a grant or role assignment
    fn authorities(&self) -> StoreResult<Vec<EntityRef>>;
}

/// Identity of an ability definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbilityIdentity {
    pub name: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<EntityKey>,
    pub only_owned: bool,
}

impl AbilityIdentity {
    pub fn matches(&self, ability: &Ability) -> bool {
        self.name == ability.name
            && self.entity_type == ability.entity_type
            && self.entity_id == ability.entity_id
            && self.only_owned == ability.only_owned
    }
}

/// Ability row to insert
#[derive(Debug, Clone)]
pub struct NewAbility {
    pub identity: AbilityIdentity,
    pub constraints: Option<Constraint>,
    pub scope: Option<ScopeValue>,
}

#[derive(Debug, Clone, Default)]
pub struct AbilityQuery {
    pub ids: Option<Vec<AbilityId>>,
    pub identity: Option<AbilityIdentity>,
    /// Exact constraint tree; `Some(None)` selects unconstrained rows only
    pub constraints: Option<Option<Constraint>>,
    pub scope: ScopeFilter,
}

impl AbilityQuery {
    pub fn by_ids(ids: Vec<AbilityId>, scope: ScopeFilter) -> Self {
        Self {
            ids: Some(ids),
            identity: None,
            constraints: None,
            scope,
        }
    }

    pub fn by_identity(identity: AbilityIdentity, scope: ScopeFilter) -> Self {
        Self {
            ids: None,
            identity: Some(identity),
            constraints: None,
            scope,
        }
    }

    /// Restrict the query to rows carrying exactly `constraints`
    pub fn with_constraints(mut self, constraints: Option<Constraint>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn matches(&self, ability: &Ability) -> bool {
        self.scope.admits(ability.scope)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&ability.id))
            && self.identity.as_ref().map_or(true, |identity| identity.matches(ability))
            && self
                .constraints
                .as_ref()
                .map_or(true, |constraints| *constraints == ability.constraints)
    }
}

/// Role row to insert
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub level: Option<i64>,
    pub scope: Option<ScopeValue>,
}

#[derive(Debug, Clone, Default)]
pub struct RoleQuery {
    pub ids: Option<Vec<RoleId>>,
    pub names: Option<Vec<String>>,
    /// Roles with a non-null level strictly below this one
    pub level_below: Option<i64>,
    pub scope: ScopeFilter,
}

impl RoleQuery {
    pub fn all(scope: ScopeFilter) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    pub fn by_ids(ids: Vec<RoleId>, scope: ScopeFilter) -> Self {
        Self {
            ids: Some(ids),
            scope,
            ..Default::default()
        }
    }

    pub fn by_names(names: Vec<String>, scope: ScopeFilter) -> Self {
        Self {
            names: Some(names),
            scope,
            ..Default::default()
        }
    }

    pub fn below_level(level: i64, scope: ScopeFilter) -> Self {
        Self {
            level_below: Some(level),
            scope,
            ..Default::default()
        }
    }

    pub fn matches(&self, role: &Role) -> bool {
        self.scope.admits(role.scope)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&role.id))
            && self.names.as_ref().map_or(true, |names| names.contains(&role.name))
            && self
                .level_below
                .map_or(true, |max| matches!(role.level, Some(level) if level < max))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentQuery {
    pub role_ids: Option<Vec<RoleId>>,
    pub entity: Option<EntityRef>,
    pub scope: ScopeFilter,
}

impl AssignmentQuery {
    pub fn for_entity(entity: EntityRef, scope: ScopeFilter) -> Self {
        Self {
            role_ids: None,
            entity: Some(entity),
            scope,
        }
    }

    pub fn with_roles(mut self, role_ids: Vec<RoleId>) -> Self {
        self.role_ids = Some(role_ids);
        self
    }

    pub fn matches(&self, assignment: &AssignedRole) -> bool {
        self.scope.admits(assignment.scope)
            && self.role_ids.as_ref().map_or(true, |ids| ids.contains(&assignment.role_id))
            && self.entity.as_ref().map_or(true, |entity| *entity == assignment.entity)
    }
}

/// Who holds a permission row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Holder {
    Entity(EntityRef),
    /// Rows without a principal, which apply to every principal
    Everyone,
}

impl Holder {
    fn matches(&self, entity: Option<&EntityRef>) -> bool {
        match (self, entity) {
            (Holder::Everyone, None) => true,
            (Holder::Entity(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }

    pub fn entity(&self) -> Option<EntityRef> {
        match self {
            Holder::Entity(entity) => Some(entity.clone()),
            Holder::Everyone => None,
        }
    }

    pub fn is_role(&self) -> bool {
        matches!(self, Holder::Entity(entity) if entity.is_role())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionQuery {
    pub holder: Option<Holder>,
    pub ability_ids: Option<Vec<AbilityId>>,
    pub forbidden: Option<bool>,
    pub scope: ScopeFilter,
}

impl PermissionQuery {
    pub fn held_by(holder: Holder, scope: ScopeFilter) -> Self {
        Self {
            holder: Some(holder),
            scope,
            ..Default::default()
        }
    }

    pub fn for_abilities(ability_ids: Vec<AbilityId>) -> Self {
        Self {
            ability_ids: Some(ability_ids),
            ..Default::default()
        }
    }

    pub fn forbidden(mut self, forbidden: bool) -> Self {
        self.forbidden = Some(forbidden);
        self
    }

    pub fn abilities(mut self, ability_ids: Vec<AbilityId>) -> Self {
        self.ability_ids = Some(ability_ids);
        self
    }

    pub fn matches(&self, permission: &Permission) -> bool {
        self.scope.admits(permission.scope)
            && self
                .holder
                .as_ref()
                .map_or(true, |holder| holder.matches(permission.entity.as_ref()))
            && self
                .ability_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&permission.ability_id))
            && self.forbidden.map_or(true, |forbidden| forbidden == permission.forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn role(id: RoleId, level: Option<i64>, scope: Option<ScopeValue>) -> Role {
        let now = Utc::now();
        Role {
            id,
            name: format!("role-{}", id),
            level,
            scope,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_level_filter() {
        let query = RoleQuery::below_level(2, ScopeFilter::Any);
        assert!(query.matches(&role(1, Some(1), None)));
        assert!(!query.matches(&role(2, Some(2), None)));
        assert!(!query.matches(&role(3, None, None)));
    }

    #[test]
    fn test_permission_holder_filter() {
        let user = EntityRef::new("user", 1);
        let direct = Permission {
            ability_id: 1,
            entity: Some(user.clone()),
            forbidden: false,
            scope: Some(2),
        };
        let everyone = Permission {
            ability_id: 1,
            entity: None,
            forbidden: false,
            scope: None,
        };

        let query = PermissionQuery::held_by(Holder::Entity(user), ScopeFilter::Tenant(2));
        assert!(query.matches(&direct));
        assert!(!query.matches(&everyone));

        let query = PermissionQuery::held_by(Holder::Everyone, ScopeFilter::Tenant(3));
        assert!(query.matches(&everyone));
        assert!(!query.clone().forbidden(true).matches(&everyone));
    }
}
