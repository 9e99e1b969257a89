//! Allow, forbid, disallow and unforbid

use tracing::info;

use super::{Abilities, Context};
use crate::constraints::Constraint;
use crate::error::Result;
use crate::store::Holder;
use crate::types::{Grantee, Target};

/// What a [`GrantConductor`] does to the matching grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantMode {
    Allow,
    Forbid,
    Disallow,
    Unforbid,
}

impl GrantMode {
    fn forbidden(self) -> bool {
        matches!(self, GrantMode::Forbid | GrantMode::Unforbid)
    }

    fn attaches(self) -> bool {
        matches!(self, GrantMode::Allow | GrantMode::Forbid)
    }

    fn as_str(self) -> &'static str {
        match self {
            GrantMode::Allow => "allow",
            GrantMode::Forbid => "forbid",
            GrantMode::Disallow => "disallow",
            GrantMode::Unforbid => "unforbid",
        }
    }
}

/// Grants or revokes abilities for one grantee
///
/// ```
/// use cretoai_abilities::{AuthzEngine, Authority, InMemoryStore, Target};
/// use std::sync::Arc;
///
/// let engine = AuthzEngine::builder(Arc::new(InMemoryStore::new())).build();
/// let user = Authority::new("user", 1);
///
/// engine.allow(&user).to("edit", Target::of_type("post")).unwrap();
/// engine.forbid(&user).to("delete", Target::of_type("post")).unwrap();
/// ```
pub struct GrantConductor {
    ctx: Context,
    grantee: Grantee,
    mode: GrantMode,
    constraints: Option<Constraint>,
}

impl GrantConductor {
    pub(crate) fn new(ctx: Context, grantee: Grantee, mode: GrantMode) -> Self {
        Self {
            ctx,
            grantee,
            mode,
            constraints: None,
        }
    }

    /// Attach a constraint tree to the abilities this conductor creates
    ///
    /// Revoking conductors match abilities by identity and ignore it.
    pub fn with_constraints(mut self, constraints: Constraint) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// `abilities` on `target` (or as simple abilities when `None`)
    pub fn to(&self, abilities: impl Into<Abilities>, target: impl Into<Option<Target>>) -> Result<usize> {
        self.apply(&abilities.into(), target.into().as_ref(), false)
    }

    /// Every action on every resource
    pub fn everything(&self) -> Result<usize> {
        self.apply(&Abilities::all(), Some(&Target::Everything), false)
    }

    /// Every action on `target`
    pub fn to_manage(&self, target: impl Into<Target>) -> Result<usize> {
        self.apply(&Abilities::all(), Some(&target.into()), false)
    }

    /// Abilities limited to records the grantee owns
    pub fn to_own(&self, target: impl Into<Target>) -> PendingOwnership<'_> {
        PendingOwnership {
            conductor: self,
            target: target.into(),
        }
    }

    /// Every action on every record the grantee owns
    pub fn to_own_everything(&self) -> Result<usize> {
        self.to_own(Target::Everything).apply()
    }

    fn apply(&self, abilities: &Abilities, target: Option<&Target>, only_owned: bool) -> Result<usize> {
        let forbidden = self.mode.forbidden();

        let affected = if self.mode.attaches() {
            let Some(holder) = self.ctx.holder(&self.grantee, true)? else {
                return Ok(0);
            };
            let ids = self.ctx.find_or_create_abilities(
                abilities,
                target,
                only_owned,
                self.constraints.as_ref(),
            )?;
            self.ctx.attach(&holder, &ids, forbidden)?
        } else {
            let Some(holder) = self.ctx.holder(&self.grantee, false)? else {
                return Ok(0);
            };
            let ids = self.ctx.find_ability_ids(abilities, target, only_owned)?;
            self.ctx.detach(&holder, &ids, forbidden)?
        };

        info!(
            mode = self.mode.as_str(),
            grantee = %describe(&self.grantee),
            abilities = ?abilities.names(),
            only_owned,
            affected,
            "Updated grants"
        );

        Ok(affected)
    }
}

/// Ownership grant waiting for its abilities
pub struct PendingOwnership<'a> {
    conductor: &'a GrantConductor,
    target: Target,
}

impl PendingOwnership<'_> {
    /// Only `abilities` on owned records
    pub fn to(self, abilities: impl Into<Abilities>) -> Result<usize> {
        self.conductor
            .apply(&abilities.into(), Some(&self.target), true)
    }

    /// Every action on owned records
    pub fn apply(self) -> Result<usize> {
        self.conductor.apply(&Abilities::all(), Some(&self.target), true)
    }
}

fn describe(grantee: &Grantee) -> String {
    match grantee {
        Grantee::Authority(authority) => authority.entity_ref().to_string(),
        Grantee::Role(role) => format!("role {:?}", role),
        Grantee::Everyone => "everyone".to_string(),
    }
}
