//! Scope restrictions: which region of the flow tree a breakpoint covers.
//!
//! Restrictions are immutable once attached to a breakpoint; changing one
//! means replacing it. That makes [`ScopeRestriction::matches`] safe to call
//! from any execution thread without locking.

use crate::debug::hooks::Actor;
use crate::types::{ActorPath, LifecycleStage};
use serde::{Deserialize, Serialize};

/// How the children of a [`ScopeRestriction::Combination`] are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CombinationOp {
    And,
    Or,
    Xor,
}

impl CombinationOp {
    /// Decide the combined result from the number of matching children.
    fn combine(self, matched: usize, total: usize) -> bool {
        match self {
            CombinationOp::And => matched == total,
            CombinationOp::Or => matched > 0,
            CombinationOp::Xor => matched == 1,
        }
    }
}

/// Region of the flow tree a breakpoint applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScopeRestriction {
    /// Matches every actor.
    #[default]
    Unrestricted,
    /// Matches `root` and everything below it.
    SubtreeRooted { root: ActorPath },
    /// Combines the results of the child restrictions.
    Combination {
        children: Vec<ScopeRestriction>,
        op: CombinationOp,
    },
}

impl ScopeRestriction {
    pub fn subtree(root: ActorPath) -> Self {
        ScopeRestriction::SubtreeRooted { root }
    }

    pub fn combination(op: CombinationOp, children: Vec<ScopeRestriction>) -> Self {
        ScopeRestriction::Combination { children, op }
    }

    /// Whether the actor at `path` falls inside this restriction at `stage`.
    pub fn matches(&self, path: &ActorPath, stage: LifecycleStage) -> bool {
        match self {
            ScopeRestriction::Unrestricted => true,
            ScopeRestriction::SubtreeRooted { root } => root.is_ancestor_or_self_of(path),
            ScopeRestriction::Combination { children, op } => {
                // Every child is evaluated; results are counted, not short-circuited.
                let matched = children
                    .iter()
                    .filter(|child| child.matches(path, stage))
                    .count();
                op.combine(matched, children.len())
            }
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, ScopeRestriction::Unrestricted)
    }
}

static UNRESTRICTED: ScopeRestriction = ScopeRestriction::Unrestricted;

/// Nearest restriction provided by `actor` or one of its ancestors.
pub fn restriction_for(actor: &dyn Actor) -> Option<&ScopeRestriction> {
    let mut current = Some(actor);
    while let Some(a) = current {
        if let Some(restriction) = a.scope_restriction() {
            return Some(restriction);
        }
        current = a.parent();
    }
    None
}

/// Like [`restriction_for`], falling back to [`ScopeRestriction::Unrestricted`].
pub fn effective_restriction(actor: &dyn Actor) -> &ScopeRestriction {
    restriction_for(actor).unwrap_or(&UNRESTRICTED)
}
