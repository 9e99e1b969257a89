//! Ability resolution
//!
//! A [`Clipboard`] answers "can this principal do that?" by comparing the
//! compiled candidate identifiers for a request against the principal's
//! forbidden set first and its allowed set second. The two implementations
//! differ only in where those sets come from:
//!
//! - [`StoreClipboard`] queries the store on every call
//! - [`CachedClipboard`] memoizes each principal's sets in a [`CacheStore`](crate::cache::CacheStore)

use tracing::debug;

use crate::cache::CacheStats;
use crate::error::Result;
use crate::identifiers;
use crate::types::{Ability, AbilityId, Authority, Target};

mod cached;
mod resolver;

pub use cached::CachedClipboard;
pub use resolver::{AbilityResolver, StoreClipboard};

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Allowed by this ability
    Allowed(AbilityId),
    /// A forbidding grant matched
    Forbidden,
    /// Nothing matched; another mechanism may decide
    Undecided,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed(_))
    }

    pub fn ability_id(&self) -> Option<AbilityId> {
        match self {
            Verdict::Allowed(id) => Some(*id),
            _ => None,
        }
    }

    /// Gate answer: `Some(true)` allow, `Some(false)` deny, `None` defer
    pub fn as_gate_result(&self) -> Option<bool> {
        match self {
            Verdict::Allowed(_) => Some(true),
            Verdict::Forbidden => Some(false),
            Verdict::Undecided => None,
        }
    }
}

/// How a set of role names is tested against a principal's roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCheck {
    /// Holds at least one
    Or,
    /// Holds every one
    And,
    /// Holds none
    Not,
}

/// Source of a principal's abilities and roles
pub trait Clipboard: Send + Sync {
    /// Resolver shared by every implementation
    fn resolver(&self) -> &AbilityResolver;

    /// Allowed (`true`) or forbidden (`false`) abilities of `authority`
    fn get_abilities(&self, authority: &Authority, allowed: bool) -> Result<Vec<Ability>>;

    /// Names of the roles assigned to `authority`
    fn get_roles(&self, authority: &Authority) -> Result<Vec<String>>;

    fn get_forbidden_abilities(&self, authority: &Authority) -> Result<Vec<Ability>> {
        self.get_abilities(authority, false)
    }

    /// Forget the cached state of one principal, or of every principal
    fn refresh(&self, _authority: Option<&Authority>) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> Option<CacheStats> {
        None
    }

    fn check(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> Result<bool> {
        Ok(self.check_get_id(authority, ability, target)?.is_allowed())
    }

    /// Forbid-first resolution of `ability` on `target`
    fn check_get_id(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> Result<Verdict> {
        let candidates = identifiers::compile(ability, target);
        let resolver = self.resolver();

        let forbidden = self.get_abilities(authority, false)?;
        if let Some(id) = resolver.find_matching(&forbidden, &candidates, authority, target) {
            debug!(
                authority = %authority.entity_ref(),
                ability,
                forbidding_ability = id,
                "Forbidden"
            );
            return Ok(Verdict::Forbidden);
        }

        let allowed = self.get_abilities(authority, true)?;
        match resolver.find_matching(&allowed, &candidates, authority, target) {
            Some(id) => {
                debug!(
                    authority = %authority.entity_ref(),
                    ability,
                    ability_id = id,
                    "Allowed"
                );
                Ok(Verdict::Allowed(id))
            }
            None => Ok(Verdict::Undecided),
        }
    }

    fn check_role(&self, authority: &Authority, roles: &[String], boolean: RoleCheck) -> Result<bool> {
        let assigned = self.get_roles(authority)?;
        let held = |role: &String| assigned.contains(role);

        Ok(match boolean {
            RoleCheck::Or => roles.iter().any(held),
            RoleCheck::And => roles.iter().all(held),
            RoleCheck::Not => !roles.iter().any(held),
        })
    }
}
