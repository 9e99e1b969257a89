//! Maintenance sweeps over the abilities table

use std::collections::HashSet;
use tracing::info;

use super::Context;
use crate::error::Result;
use crate::scope::ScopeFilter;
use crate::store::{AbilityQuery, PermissionQuery};
use crate::types::{AbilityId, EntityKey, WILDCARD};

/// Deletes abilities that can no longer apply to anyone
///
/// Sweeps look at every tenant; they are meant for scheduled maintenance,
/// not request handling.
pub struct Cleanup {
    ctx: Context,
}

impl Cleanup {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Delete abilities no principal, role or everyone-grant refers to
    pub fn unassigned_abilities(&self) -> Result<usize> {
        let granted: HashSet<AbilityId> = self
            .ctx
            .store
            .find_permissions(&PermissionQuery::default())?
            .into_iter()
            .map(|permission| permission.ability_id)
            .collect();

        let unassigned: Vec<AbilityId> = self
            .all_abilities()?
            .into_iter()
            .filter(|(id, _, _)| !granted.contains(id))
            .map(|(id, _, _)| id)
            .collect();

        self.delete("unassigned", unassigned)
    }

    /// Delete abilities bound to a record that `exists` reports as gone
    pub fn orphaned_abilities<F>(&self, exists: F) -> Result<usize>
    where
        F: Fn(&str, EntityKey) -> bool,
    {
        let orphaned: Vec<AbilityId> = self
            .all_abilities()?
            .into_iter()
            .filter_map(|(id, entity_type, entity_id)| match (entity_type, entity_id) {
                (Some(entity_type), Some(entity_id))
                    if entity_type != WILDCARD && !exists(&entity_type, entity_id) =>
                {
                    Some(id)
                }
                _ => None,
            })
            .collect();

        self.delete("orphaned", orphaned)
    }

    fn all_abilities(&self) -> Result<Vec<(AbilityId, Option<String>, Option<EntityKey>)>> {
        Ok(self
            .ctx
            .store
            .find_abilities(&AbilityQuery {
                scope: ScopeFilter::Any,
                ..Default::default()
            })?
            .into_iter()
            .map(|ability| (ability.id, ability.entity_type, ability.entity_id))
            .collect())
    }

    fn delete(&self, kind: &str, ids: Vec<AbilityId>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = self.ctx.store.delete_abilities(&ids)?;
        info!(kind, deleted, "Cleaned up abilities");
        Ok(deleted)
    }
}
