//! # flowdebug-rs: Breakpoints for Actor Flows
//!
//! Pause, inspect and single-step a running pipeline of actors at six
//! well-defined lifecycle hooks per actor invocation.
//!
//! ## Architecture
//!
//! - **Debug**: breakpoints, scope restrictions, the shared registry and the
//!   [`ExecutionController`] that parks execution threads
//! - **Flow**: a small DAG runtime that reports every hook to the controller
//! - **Scripting**: Rhai expressions for conditional breakpoints and watches
//! - **Communication**: crossbeam channels between the control side and the
//!   controller ([`DebugBridge`])
//!
//! ## Configuration
//!
//! Breakpoints and controller settings load from TOML or JSON, by default from
//! `dev.flowdebug.flowdebug-rs/debug.toml` in the platform config directory.
//!
//! ## Example
//!
//! ```no_run
//! use flowdebug_rs::{
//!     debug::{Breakpoint, BreakpointRegistry, ChannelSink, DebugBridge, ExecutionController},
//!     flow::{nodes::{CollectorActor, SourceActor}, Flow},
//!     types::{ActorPath, HookFlags, LifecycleStage},
//! };
//! use std::sync::Arc;
//!
//! let (bridge, cmd_rx, event_tx) = DebugBridge::new(64);
//! let controller = Arc::new(ExecutionController::new(
//!     Arc::new(BreakpointRegistry::new()),
//!     Arc::new(ChannelSink::new(event_tx.clone())),
//! ));
//! controller
//!     .registry()
//!     .add(Breakpoint::any_actor().with_hooks(HookFlags::only(LifecycleStage::PreExecute)));
//!
//! let server = {
//!     let controller = Arc::clone(&controller);
//!     std::thread::spawn(move || controller.serve(cmd_rx, event_tx))
//! };
//!
//! let mut flow = Flow::new("Flow");
//! let root = ActorPath::root("Flow");
//! let src = flow.add_actor(&root, "Src", SourceActor::counting(0..3)).unwrap();
//! let (sink, _tokens) = CollectorActor::new();
//! let sink = flow.add_actor(&root, "Sink", sink).unwrap();
//! flow.add_edge(src, sink).unwrap();
//!
//! let runner = {
//!     let controller = Arc::clone(&controller);
//!     std::thread::spawn(move || flow.run(controller.as_ref()))
//! };
//!
//! // The first actor blocks; each resume lets the flow continue.
//! while !runner.is_finished() {
//!     if bridge.recv_timeout(std::time::Duration::from_millis(50)).is_some() {
//!         bridge.resume();
//!     }
//! }
//! bridge.shutdown();
//! server.join().unwrap();
//! ```

pub mod config;
pub mod debug;
pub mod error;
pub mod flow;
pub mod scripting;
pub mod types;

// Re-export commonly used types
pub use config::{BreakpointConfig, ControllerSettings, DebugConfig};
pub use debug::{
    Breakpoint, BreakpointRegistry, DebugBridge, ExecutionController, ExecutionHooks,
    HookOutcome, ScopeRestriction,
};
pub use error::{FlowDebugError, Result};
pub use flow::{Flow, FlowOutcome};
pub use scripting::ScriptEngine;
pub use types::{ActorPath, HookFlags, LifecycleStage, Token};
