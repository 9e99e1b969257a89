//! Role assignment and retraction

use tracing::info;

use super::{Context, Roles};
use crate::error::Result;
use crate::store::AssignmentQuery;
use crate::types::{AssignedRole, Authority, RoleId};

/// Assigns roles to principals, creating named roles that don't exist yet
pub struct AssignConductor {
    ctx: Context,
    roles: Roles,
}

impl AssignConductor {
    pub(crate) fn new(ctx: Context, roles: Roles) -> Self {
        Self { ctx, roles }
    }

    pub fn to(&self, authority: &Authority) -> Result<usize> {
        self.to_all(std::slice::from_ref(authority))
    }

    pub fn to_all(&self, authorities: &[Authority]) -> Result<usize> {
        let role_ids: Vec<RoleId> = self
            .ctx
            .resolve_roles(&self.roles, true)?
            .iter()
            .map(|role| role.id)
            .collect();

        let mut assigned = 0;
        for authority in authorities {
            assigned += assign_missing(&self.ctx, authority, &role_ids)?;
        }

        info!(roles = ?role_ids, principals = authorities.len(), assigned, "Assigned roles");
        Ok(assigned)
    }
}

/// Removes role assignments; unknown role names are ignored
pub struct RetractConductor {
    ctx: Context,
    roles: Roles,
}

impl RetractConductor {
    pub(crate) fn new(ctx: Context, roles: Roles) -> Self {
        Self { ctx, roles }
    }

    pub fn from(&self, authority: &Authority) -> Result<usize> {
        self.from_all(std::slice::from_ref(authority))
    }

    pub fn from_all(&self, authorities: &[Authority]) -> Result<usize> {
        let role_ids: Vec<RoleId> = self
            .ctx
            .resolve_roles(&self.roles, false)?
            .iter()
            .map(|role| role.id)
            .collect();

        if role_ids.is_empty() {
            return Ok(0);
        }

        let mut retracted = 0;
        for authority in authorities {
            retracted += retract(&self.ctx, authority, &role_ids)?;
        }

        info!(roles = ?role_ids, principals = authorities.len(), retracted, "Retracted roles");
        Ok(retracted)
    }
}

/// Insert assignments of `role_ids` that `authority` doesn't hold yet
pub(crate) fn assign_missing(ctx: &Context, authority: &Authority, role_ids: &[RoleId]) -> Result<usize> {
    let held: Vec<RoleId> = ctx
        .store
        .find_assignments(&AssignmentQuery::for_entity(
            authority.entity_ref(),
            ctx.scope.relation_filter(),
        ))?
        .into_iter()
        .map(|assignment| assignment.role_id)
        .collect();

    let mut assigned = 0;
    for role_id in role_ids {
        if held.contains(role_id) {
            continue;
        }

        ctx.store.insert_assignment(AssignedRole {
            role_id: *role_id,
            entity: authority.entity_ref(),
            scope: ctx.scope.attach_scope(authority.is_role()),
        })?;
        assigned += 1;
    }

    Ok(assigned)
}

pub(crate) fn retract(ctx: &Context, authority: &Authority, role_ids: &[RoleId]) -> Result<usize> {
    if role_ids.is_empty() {
        return Ok(0);
    }

    Ok(ctx.store.delete_assignments(
        &AssignmentQuery::for_entity(authority.entity_ref(), ctx.scope.relation_filter())
            .with_roles(role_ids.to_vec()),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScopeConfig;
    use crate::error::AuthzError;
    use crate::scope::Scope;
    use crate::store::InMemoryStore;
    use crate::types::RoleRef;
    use std::sync::Arc;

    fn context() -> (Arc<InMemoryStore>, Arc<Scope>, Context) {
        let store = Arc::new(InMemoryStore::new());
        let scope = Arc::new(Scope::new(ScopeConfig::default()));
        let ctx = Context::new(store.clone(), scope.clone());
        (store, scope, ctx)
    }

    #[test]
    fn test_assign_creates_roles_once() {
        let (store, _, ctx) = context();
        let users = [Authority::new("user", 1), Authority::new("user", 2)];

        let assign = AssignConductor::new(ctx, Roles::from(["admin", "editor"]));
        assert_eq!(assign.to_all(&users).unwrap(), 4);
        assert_eq!(assign.to_all(&users).unwrap(), 0);
        assert_eq!(store.role_count(), 2);
    }

    #[test]
    fn test_assign_unknown_id_is_invalid() {
        let (_, _, ctx) = context();
        let result = AssignConductor::new(ctx, Roles::from(RoleRef::Id(99))).to(&Authority::new("user", 1));
        assert!(matches!(result, Err(AuthzError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_retract_within_tenant() {
        let (_, scope, ctx) = context();
        let user = Authority::new("user", 1);

        scope.to(1);
        AssignConductor::new(ctx.clone(), Roles::from("admin")).to(&user).unwrap();
        scope.to(2);
        AssignConductor::new(ctx.clone(), Roles::from("admin")).to(&user).unwrap();

        assert_eq!(RetractConductor::new(ctx.clone(), Roles::from("admin")).from(&user).unwrap(), 1);

        scope.to(1);
        assert_eq!(RetractConductor::new(ctx.clone(), Roles::from("admin")).from(&user).unwrap(), 1);
        assert_eq!(RetractConductor::new(ctx, Roles::from("ghost")).from(&user).unwrap(), 0);
    }
}
