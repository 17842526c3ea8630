//! Minimal flow runtime that drives the debugger hooks.
//!
//! - [`Flow`] holds a tree of groups and a DAG of actors and runs it on the
//!   calling thread.
//! - [`ActorLogic`] is the extension point for custom actors; the built-in
//!   ones live in [`nodes`].

pub mod actor;
pub mod executor;
pub mod id;
pub mod node;
pub mod nodes;

pub use actor::ActorInfo;
pub use executor::{Edge, Flow, FlowOutcome};
pub use id::{ActorId, EdgeId};
pub use node::{ActorContext, ActorLogic, AnyLogic, BuiltinActor};
