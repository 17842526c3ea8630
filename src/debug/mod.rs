//! Breakpoint and scope-restriction engine.
//!
//! Layering, leaves first:
//! - [`scope`] - which region of the flow tree a breakpoint covers
//! - [`breakpoint`] - one watch-point and its trigger evaluation
//! - [`registry`] - the shared ordered list plus step mode
//! - [`controller`] - parks execution threads, serves resume/step/stop
//! - [`notify`] / [`bridge`] - how the control side hears about blocks

pub mod breakpoint;
pub mod bridge;
pub mod controller;
pub mod hooks;
pub mod notify;
pub mod registry;
pub mod scope;

pub use breakpoint::{
    ActorPathCondition, AnyActorCondition, Breakpoint, BreakpointCondition, BreakpointSettings,
    BreakpointSummary, FnCondition,
};
pub use bridge::{ChannelSink, DebugBridge, DebugCommand, DebugEvent};
pub use controller::{ExecutionController, ExecutionMode, ExecutionSnapshot};
pub use hooks::{Actor, ExecutionHooks, HookContext, HookOutcome, NoHooks};
pub use notify::{BlockedState, NoopSink, NotificationSink};
pub use registry::BreakpointRegistry;
pub use scope::{effective_restriction, restriction_for, CombinationOp, ScopeRestriction};
