//! Role membership checks

use std::sync::Arc;

use crate::clipboard::{Clipboard, RoleCheck};
use crate::error::Result;
use crate::types::Authority;

/// Answers role questions about one principal from its cached role names
pub struct RoleChecker {
    clipboard: Arc<dyn Clipboard>,
    authority: Authority,
}

impl RoleChecker {
    pub(crate) fn new(clipboard: Arc<dyn Clipboard>, authority: Authority) -> Self {
        Self {
            clipboard,
            authority,
        }
    }

    /// Holds at least one of `roles`
    pub fn a(&self, roles: &[&str]) -> Result<bool> {
        self.check(roles, RoleCheck::Or)
    }

    /// Alias of [`RoleChecker::a`]
    pub fn an(&self, roles: &[&str]) -> Result<bool> {
        self.a(roles)
    }

    /// Holds none of `roles`
    pub fn not_a(&self, roles: &[&str]) -> Result<bool> {
        self.check(roles, RoleCheck::Not)
    }

    pub fn not_an(&self, roles: &[&str]) -> Result<bool> {
        self.not_a(roles)
    }

    /// Holds every one of `roles`
    pub fn all(&self, roles: &[&str]) -> Result<bool> {
        self.check(roles, RoleCheck::And)
    }

    fn check(&self, roles: &[&str], boolean: RoleCheck) -> Result<bool> {
        let roles: Vec<String> = roles.iter().map(|role| role.to_string()).collect();
        self.clipboard.check_role(&self.authority, &roles, boolean)
    }
}
