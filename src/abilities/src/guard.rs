//! Gate integration
//!
//! A gate runs "before" hooks, then its own ability definitions, then
//! "after" hooks. Each hook answers `Some(true)` (allow and stop),
//! `Some(false)` (deny and stop) or `None` (defer). The [`Guard`] installs a
//! single hook, in the slot chosen by [`GuardConfig`](crate::config::GuardConfig),
//! that answers from the engine's clipboard.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::clipboard::Clipboard;
use crate::config::GuardSlot;
use crate::error::Result;
use crate::types::{Authority, Target};

/// Hook signature: principal, ability, optional target, extra arguments
pub type Hook = Arc<dyn Fn(&Authority, &str, Option<&Target>, &[Value]) -> Result<Option<bool>> + Send + Sync>;

/// Gate-side ability definition
pub type Definition = Arc<dyn Fn(&Authority, Option<&Target>) -> bool + Send + Sync>;

/// External authorization gate that accepts before/after hooks
pub trait Gate {
    fn before(&mut self, hook: Hook);

    fn after(&mut self, hook: Hook);
}

/// Answers gate checks from a clipboard
pub struct Guard {
    clipboard: Arc<dyn Clipboard>,
    slot: GuardSlot,
}

impl Guard {
    pub fn new(clipboard: Arc<dyn Clipboard>, slot: GuardSlot) -> Self {
        Self { clipboard, slot }
    }

    pub fn slot(&self) -> GuardSlot {
        self.slot
    }

    /// Move the hook to another slot; takes effect on the next registration
    pub fn set_slot(&mut self, slot: GuardSlot) {
        self.slot = slot;
    }

    /// Clipboard verdict as a gate answer
    pub fn check(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
        extra: &[Value],
    ) -> Result<Option<bool>> {
        answer(self.clipboard.as_ref(), authority, ability, target, extra)
    }

    /// Install the hook in the configured slot of `gate`
    pub fn register_at<G: Gate + ?Sized>(&self, gate: &mut G) {
        let clipboard = Arc::clone(&self.clipboard);
        let hook: Hook = Arc::new(
            move |authority: &Authority, ability: &str, target: Option<&Target>, extra: &[Value]| {
                answer(clipboard.as_ref(), authority, ability, target, extra)
            },
        );

        match self.slot {
            GuardSlot::Before => gate.before(hook),
            GuardSlot::After => gate.after(hook),
        }
    }
}

/// Checks carrying more than one extra argument are not ours to decide
fn answer(
    clipboard: &dyn Clipboard,
    authority: &Authority,
    ability: &str,
    target: Option<&Target>,
    extra: &[Value],
) -> Result<Option<bool>> {
    if extra.len() > 1 {
        debug!(ability, arguments = extra.len(), "Deferring check with extra arguments");
        return Ok(None);
    }

    Ok(clipboard
        .check_get_id(authority, ability, target)?
        .as_gate_result())
}

/// Minimal in-process gate
#[derive(Default)]
pub struct HookGate {
    before: Vec<Hook>,
    after: Vec<Hook>,
    definitions: HashMap<String, Definition>,
}

impl HookGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `ability` on the gate itself
    pub fn define<F>(&mut self, ability: impl Into<String>, definition: F)
    where
        F: Fn(&Authority, Option<&Target>) -> bool + Send + Sync + 'static,
    {
        self.definitions.insert(ability.into(), Arc::new(definition));
    }

    /// Before hooks, then the definition, then after hooks; first answer wins
    pub fn inspect(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
        extra: &[Value],
    ) -> Result<Option<bool>> {
        for hook in &self.before {
            if let Some(answer) = hook(authority, ability, target, extra)? {
                return Ok(Some(answer));
            }
        }

        if let Some(definition) = self.definitions.get(ability) {
            return Ok(Some(definition(authority, target)));
        }

        for hook in &self.after {
            if let Some(answer) = hook(authority, ability, target, extra)? {
                return Ok(Some(answer));
            }
        }

        Ok(None)
    }

    /// Undecided checks are denied
    pub fn allows(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> Result<bool> {
        Ok(self.inspect(authority, ability, target, &[])?.unwrap_or(false))
    }

    pub fn denies(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> Result<bool> {
        Ok(!self.allows(authority, ability, target)?)
    }
}

impl Gate for HookGate {
    fn before(&mut self, hook: Hook) {
        self.before.push(hook);
    }

    fn after(&mut self, hook: Hook) {
        self.after.push(hook);
    }
}
