//! The seam between a running flow and the debugger.
//!
//! The flow runtime exposes its actors through the minimal [`Actor`]
//! interface and reports every lifecycle point through [`ExecutionHooks`].
//! The debugger answers each hook with a [`HookOutcome`].

use crate::debug::scope::ScopeRestriction;
use crate::types::{ActorPath, LifecycleStage, Token};
use std::collections::BTreeMap;

/// Identity and tree position of an actor, as seen by the debugger.
pub trait Actor: Send + Sync {
    /// Full path of this actor in the flow tree.
    fn full_path(&self) -> &ActorPath;

    /// Enclosing actor, `None` for the root.
    fn parent(&self) -> Option<&dyn Actor>;

    /// Restriction this actor imposes on its sub-tree, if it provides one.
    fn scope_restriction(&self) -> Option<&ScopeRestriction> {
        None
    }

    /// Value of a flow variable visible to this actor.
    fn variable(&self, _name: &str) -> Option<String> {
        None
    }

    /// All flow variables visible to this actor.
    fn variables(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Everything a breakpoint predicate may look at for one hook.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    pub actor: &'a dyn Actor,
    pub stage: LifecycleStage,
    /// Present only on hooks that carry a token.
    pub token: Option<&'a Token>,
}

impl<'a> HookContext<'a> {
    pub fn new(actor: &'a dyn Actor, stage: LifecycleStage, token: Option<&'a Token>) -> Self {
        Self {
            actor,
            stage,
            token,
        }
    }

    pub fn path(&self) -> &'a ActorPath {
        self.actor.full_path()
    }
}

/// What the execution thread should do after a hook returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No breakpoint fired.
    Continue,
    /// A breakpoint fired and the operator released the block.
    Resumed,
    /// The flow was stopped; the execution thread must abort.
    Cancelled(String),
}

impl HookOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HookOutcome::Cancelled(_))
    }
}

/// Receiver of the six lifecycle hooks of every actor invocation.
pub trait ExecutionHooks: Send + Sync {
    /// Called by the execution thread at each hook point.
    fn on_hook(
        &self,
        stage: LifecycleStage,
        actor: &dyn Actor,
        token: Option<&Token>,
    ) -> HookOutcome;

    fn pre_input(&self, actor: &dyn Actor, token: &Token) -> HookOutcome {
        self.on_hook(LifecycleStage::PreInput, actor, Some(token))
    }

    fn post_input(&self, actor: &dyn Actor) -> HookOutcome {
        self.on_hook(LifecycleStage::PostInput, actor, None)
    }

    fn pre_execute(&self, actor: &dyn Actor) -> HookOutcome {
        self.on_hook(LifecycleStage::PreExecute, actor, None)
    }

    fn post_execute(&self, actor: &dyn Actor) -> HookOutcome {
        self.on_hook(LifecycleStage::PostExecute, actor, None)
    }

    fn pre_output(&self, actor: &dyn Actor) -> HookOutcome {
        self.on_hook(LifecycleStage::PreOutput, actor, None)
    }

    fn post_output(&self, actor: &dyn Actor, token: &Token) -> HookOutcome {
        self.on_hook(LifecycleStage::PostOutput, actor, Some(token))
    }
}

/// Hooks that never block; used to run a flow without a debugger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ExecutionHooks for NoHooks {
    fn on_hook(&self, _: LifecycleStage, _: &dyn Actor, _: Option<&Token>) -> HookOutcome {
        HookOutcome::Continue
    }
}
