//! Actor logic for the flow runtime.
//!
//! Two-layer design:
//! - **`ActorLogic` trait** for user-defined actors.
//! - **`BuiltinActor` enum** for the built-in actors, dispatched by match.
//!
//! `AnyLogic` wraps either variant so the executor handles both uniformly.

use crate::error::Result;
use crate::flow::nodes::{
    CollectorActor, PassthroughActor, ScriptActor, SetVariableActor, SourceActor,
};
use crate::scripting::ScriptEngine;
use crate::types::{ActorPath, Token, Variables};

/// Context passed to an actor for one execution.
pub struct ActorContext<'a> {
    /// Full path of the executing actor.
    pub path: &'a ActorPath,
    /// Variables of the flow.
    pub variables: &'a Variables,
    /// Expression engine shared by the flow.
    pub engine: &'a ScriptEngine,
}

/// Trait for pluggable/user-defined actors.
pub trait ActorLogic: Send {
    /// Short type name, used in logs.
    fn kind(&self) -> &str;

    /// Source actors run once without input.
    fn is_source(&self) -> bool {
        false
    }

    /// Process one token (or `None` for a source) and return the outputs.
    fn execute(&mut self, input: Option<Token>, ctx: &ActorContext<'_>) -> Result<Vec<Token>>;
}

/// Enum dispatch for built-in actors.
pub enum BuiltinActor {
    Source(SourceActor),
    Passthrough(PassthroughActor),
    Script(ScriptActor),
    SetVariable(SetVariableActor),
    Collector(CollectorActor),
}

impl BuiltinActor {
    pub fn kind(&self) -> &str {
        match self {
            BuiltinActor::Source(a) => a.kind(),
            BuiltinActor::Passthrough(a) => a.kind(),
            BuiltinActor::Script(a) => a.kind(),
            BuiltinActor::SetVariable(a) => a.kind(),
            BuiltinActor::Collector(a) => a.kind(),
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, BuiltinActor::Source(_))
    }

    pub fn execute(&mut self, input: Option<Token>, ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        match self {
            BuiltinActor::Source(a) => a.execute(input, ctx),
            BuiltinActor::Passthrough(a) => a.execute(input, ctx),
            BuiltinActor::Script(a) => a.execute(input, ctx),
            BuiltinActor::SetVariable(a) => a.execute(input, ctx),
            BuiltinActor::Collector(a) => a.execute(input, ctx),
        }
    }
}

/// Wrapper that holds either a built-in actor or a plugin.
pub enum AnyLogic {
    Builtin(BuiltinActor),
    Plugin(Box<dyn ActorLogic>),
}

impl AnyLogic {
    pub fn kind(&self) -> &str {
        match self {
            AnyLogic::Builtin(a) => a.kind(),
            AnyLogic::Plugin(a) => a.kind(),
        }
    }

    pub fn is_source(&self) -> bool {
        match self {
            AnyLogic::Builtin(a) => a.is_source(),
            AnyLogic::Plugin(a) => a.is_source(),
        }
    }

    pub fn execute(&mut self, input: Option<Token>, ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        match self {
            AnyLogic::Builtin(a) => a.execute(input, ctx),
            AnyLogic::Plugin(a) => a.execute(input, ctx),
        }
    }

    pub fn plugin(logic: impl ActorLogic + 'static) -> Self {
        AnyLogic::Plugin(Box::new(logic))
    }
}

impl From<BuiltinActor> for AnyLogic {
    fn from(actor: BuiltinActor) -> Self {
        AnyLogic::Builtin(actor)
    }
}

impl From<SourceActor> for AnyLogic {
    fn from(actor: SourceActor) -> Self {
        AnyLogic::Builtin(BuiltinActor::Source(actor))
    }
}

impl From<PassthroughActor> for AnyLogic {
    fn from(actor: PassthroughActor) -> Self {
        AnyLogic::Builtin(BuiltinActor::Passthrough(actor))
    }
}

impl From<ScriptActor> for AnyLogic {
    fn from(actor: ScriptActor) -> Self {
        AnyLogic::Builtin(BuiltinActor::Script(actor))
    }
}

impl From<SetVariableActor> for AnyLogic {
    fn from(actor: SetVariableActor) -> Self {
        AnyLogic::Builtin(BuiltinActor::SetVariable(actor))
    }
}

impl From<CollectorActor> for AnyLogic {
    fn from(actor: CollectorActor) -> Self {
        AnyLogic::Builtin(BuiltinActor::Collector(actor))
    }
}
