//! Replace a principal's roles or grants with an exact list

use tracing::info;

use super::roles::{assign_missing, retract};
use super::{Abilities, Context, Roles};
use crate::error::Result;
use crate::store::{AssignmentQuery, Holder, PermissionQuery};
use crate::types::{AbilityId, Authority, RoleId, Target};

/// Detaches whatever is not listed and attaches whatever is missing,
/// within the current tenant
pub struct SyncConductor {
    ctx: Context,
    authority: Authority,
}

impl SyncConductor {
    pub(crate) fn new(ctx: Context, authority: Authority) -> Self {
        Self { ctx, authority }
    }

    pub fn roles(&self, roles: impl Into<Roles>) -> Result<()> {
        let wanted: Vec<RoleId> = self
            .ctx
            .resolve_roles(&roles.into(), true)?
            .iter()
            .map(|role| role.id)
            .collect();

        let stale: Vec<RoleId> = self
            .ctx
            .store
            .find_assignments(&AssignmentQuery::for_entity(
                self.authority.entity_ref(),
                self.ctx.scope.relation_filter(),
            ))?
            .into_iter()
            .map(|assignment| assignment.role_id)
            .filter(|id| !wanted.contains(id))
            .collect();

        let retracted = retract(&self.ctx, &self.authority, &stale)?;
        let assigned = assign_missing(&self.ctx, &self.authority, &wanted)?;

        info!(authority = %self.authority.entity_ref(), assigned, retracted, "Synced roles");
        Ok(())
    }

    /// Allowed abilities become exactly `abilities` on `target`
    pub fn abilities(&self, abilities: impl Into<Abilities>, target: impl Into<Option<Target>>) -> Result<()> {
        self.sync_abilities(&abilities.into(), target.into().as_ref(), false)
    }

    /// Forbidden abilities become exactly `abilities` on `target`
    pub fn forbidden_abilities(
        &self,
        abilities: impl Into<Abilities>,
        target: impl Into<Option<Target>>,
    ) -> Result<()> {
        self.sync_abilities(&abilities.into(), target.into().as_ref(), true)
    }

    fn sync_abilities(&self, abilities: &Abilities, target: Option<&Target>, forbidden: bool) -> Result<()> {
        let holder = Holder::Entity(self.authority.entity_ref());
        let wanted = self.ctx.find_or_create_abilities(abilities, target, false, None)?;

        let stale: Vec<AbilityId> = self
            .ctx
            .store
            .find_permissions(
                &PermissionQuery::held_by(holder.clone(), self.ctx.scope.relation_filter())
                    .forbidden(forbidden),
            )?
            .into_iter()
            .map(|permission| permission.ability_id)
            .filter(|id| !wanted.contains(id))
            .collect();

        let detached = self.ctx.detach(&holder, &stale, forbidden)?;
        let attached = self.ctx.attach(&holder, &wanted, forbidden)?;

        info!(
            authority = %self.authority.entity_ref(),
            forbidden,
            attached,
            detached,
            "Synced abilities"
        );
        Ok(())
    }
}
