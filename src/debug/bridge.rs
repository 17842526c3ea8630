//! Thread boundary between the operator (control side) and the controller.
//!
//! The control side sends [`DebugCommand`]s; a thread running
//! [`ExecutionController::serve`] applies them and answers with
//! [`DebugEvent`]s. Breakpoint notifications from execution threads travel
//! over the same event channel through [`ChannelSink`].

use crate::debug::breakpoint::{Breakpoint, BreakpointSummary};
use crate::debug::controller::{ExecutionController, ExecutionSnapshot};
use crate::debug::notify::{BlockedState, NotificationSink};
use crate::error::Result;
use crate::types::ViewKind;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Commands sent from the control side to the controller.
#[derive(Debug, Clone)]
pub enum DebugCommand {
    /// Append a breakpoint to the registry.
    AddBreakpoint(Arc<Breakpoint>),
    /// Replace the breakpoint at `index`.
    ReplaceBreakpoint {
        index: usize,
        breakpoint: Arc<Breakpoint>,
    },
    RemoveBreakpoint(usize),
    ClearBreakpoints,
    /// Flip `disabled` on the breakpoint at the index.
    ToggleBreakpoint(usize),
    SetStepMode(bool),
    /// Switch breakpoint evaluation off (`true`) or back on.
    SetDisabled(bool),
    Pause,
    Resume,
    Step,
    Stop(String),
    ToggleActiveBreakpoint,
    /// Ask for a state snapshot and the breakpoint list.
    RequestState,
    /// Stop serving; blocked threads are cancelled.
    Shutdown,
}

/// Messages sent from the controller to the control side.
#[derive(Debug, Clone)]
pub enum DebugEvent {
    /// An execution thread blocked.
    BreakpointReached {
        state: BlockedState,
        views: BTreeSet<ViewKind>,
    },
    State(ExecutionSnapshot),
    BreakpointList(Vec<BreakpointSummary>),
    CommandFailed(String),
    Stopped(String),
    Shutdown,
}

/// Control-side handle.
pub struct DebugBridge {
    pub cmd_tx: Sender<DebugCommand>,
    pub event_rx: Receiver<DebugEvent>,
}

impl DebugBridge {
    /// Create a bridge: `(bridge_for_control, cmd_rx, event_tx)`.
    ///
    /// The serving thread owns `cmd_rx`; `event_tx` is shared by the serving
    /// thread and the [`ChannelSink`].
    pub fn new(capacity: usize) -> (Self, Receiver<DebugCommand>, Sender<DebugEvent>) {
        let (cmd_tx, cmd_rx) = bounded(capacity);
        let (event_tx, event_rx) = bounded(capacity);
        (Self { cmd_tx, event_rx }, cmd_rx, event_tx)
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<DebugEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn try_recv(&self) -> Option<DebugEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DebugEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn send_command(&self, cmd: DebugCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn add_breakpoint(&self, breakpoint: impl Into<Arc<Breakpoint>>) {
        let _ = self
            .cmd_tx
            .send(DebugCommand::AddBreakpoint(breakpoint.into()));
    }

    pub fn resume(&self) {
        let _ = self.cmd_tx.send(DebugCommand::Resume);
    }

    pub fn step(&self) {
        let _ = self.cmd_tx.send(DebugCommand::Step);
    }

    pub fn pause(&self) {
        let _ = self.cmd_tx.send(DebugCommand::Pause);
    }

    pub fn set_disabled(&self, disabled: bool) {
        let _ = self.cmd_tx.send(DebugCommand::SetDisabled(disabled));
    }

    pub fn stop(&self, reason: impl Into<String>) {
        let _ = self.cmd_tx.send(DebugCommand::Stop(reason.into()));
    }

    pub fn request_state(&self) {
        let _ = self.cmd_tx.send(DebugCommand::RequestState);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(DebugCommand::Shutdown);
    }
}

/// Forwards block notifications into the event channel without blocking.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<DebugEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<DebugEvent>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, state: &BlockedState, views: &BTreeSet<ViewKind>) {
        let event = DebugEvent::BreakpointReached {
            state: state.clone(),
            views: views.clone(),
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "Event queue full; dropped notification for {}",
                    state.actor_path
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("No control side attached; notification dropped");
            }
        }
    }
}

impl ExecutionController {
    /// Apply one command, returning the events it produces.
    pub fn apply(&self, cmd: DebugCommand) -> Result<Vec<DebugEvent>> {
        let registry = self.registry();
        let events = match cmd {
            DebugCommand::AddBreakpoint(bp) => {
                registry.add(bp);
                vec![DebugEvent::BreakpointList(registry.summaries())]
            }
            DebugCommand::ReplaceBreakpoint { index, breakpoint } => {
                registry.replace_at(index, breakpoint)?;
                vec![DebugEvent::BreakpointList(registry.summaries())]
            }
            DebugCommand::RemoveBreakpoint(index) => {
                registry.remove_at(index)?;
                vec![DebugEvent::BreakpointList(registry.summaries())]
            }
            DebugCommand::ClearBreakpoints => {
                registry.clear();
                vec![DebugEvent::BreakpointList(registry.summaries())]
            }
            DebugCommand::ToggleBreakpoint(index) => {
                registry.toggle_disabled(index)?;
                vec![DebugEvent::BreakpointList(registry.summaries())]
            }
            DebugCommand::SetStepMode(enabled) => {
                self.toggle_step_mode(enabled);
                vec![DebugEvent::State(self.current_state())]
            }
            DebugCommand::SetDisabled(disabled) => {
                self.set_disabled(disabled);
                vec![DebugEvent::State(self.current_state())]
            }
            DebugCommand::Pause => {
                self.pause();
                Vec::new()
            }
            DebugCommand::Resume => {
                self.resume();
                vec![DebugEvent::State(self.current_state())]
            }
            DebugCommand::Step => {
                self.step();
                vec![DebugEvent::State(self.current_state())]
            }
            DebugCommand::Stop(reason) => {
                self.stop(reason.clone());
                vec![DebugEvent::Stopped(reason)]
            }
            DebugCommand::ToggleActiveBreakpoint => {
                self.toggle_active_breakpoint();
                vec![DebugEvent::BreakpointList(registry.summaries())]
            }
            DebugCommand::RequestState => vec![
                DebugEvent::State(self.current_state()),
                DebugEvent::BreakpointList(registry.summaries()),
            ],
            DebugCommand::Shutdown => {
                if !self.is_stopped() {
                    self.stop("shutdown");
                }
                vec![DebugEvent::Shutdown]
            }
        };
        Ok(events)
    }

    /// Control loop: apply commands until `Shutdown` or the sender goes away.
    pub fn serve(&self, cmd_rx: Receiver<DebugCommand>, event_tx: Sender<DebugEvent>) {
        tracing::info!("Debug control loop started");
        for cmd in cmd_rx.iter() {
            let shutdown = matches!(cmd, DebugCommand::Shutdown);
            tracing::debug!("Applying command {:?}", cmd);
            let events = match self.apply(cmd) {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!("Command failed: {}", e);
                    vec![DebugEvent::CommandFailed(e.to_string())]
                }
            };
            for event in events {
                if event_tx.send(event).is_err() {
                    tracing::debug!("Event receiver dropped; leaving control loop");
                    return;
                }
            }
            if shutdown {
                break;
            }
        }
        tracing::info!("Debug control loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::hooks::{Actor, ExecutionHooks, HookOutcome};
    use crate::debug::registry::BreakpointRegistry;
    use crate::types::{ActorPath, HookFlags, LifecycleStage};
    use std::thread;

    struct TestActor(ActorPath);

    impl Actor for TestActor {
        fn full_path(&self) -> &ActorPath {
            &self.0
        }

        fn parent(&self) -> Option<&dyn Actor> {
            None
        }
    }

    fn serving(capacity: usize) -> (DebugBridge, Arc<ExecutionController>, thread::JoinHandle<()>) {
        let (bridge, cmd_rx, event_tx) = DebugBridge::new(capacity);
        let controller = Arc::new(ExecutionController::new(
            Arc::new(BreakpointRegistry::new()),
            Arc::new(ChannelSink::new(event_tx.clone())),
        ));
        let server = {
            let controller = Arc::clone(&controller);
            thread::spawn(move || controller.serve(cmd_rx, event_tx))
        };
        (bridge, controller, server)
    }

    #[test]
    fn test_add_breakpoint_reports_list() {
        let (bridge, controller, server) = serving(16);
        bridge.add_breakpoint(Breakpoint::any_actor());
        match bridge.recv_timeout(Duration::from_secs(5)) {
            Some(DebugEvent::BreakpointList(list)) => assert_eq!(list.len(), 1),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(controller.registry().len(), 1);

        bridge.shutdown();
        server.join().unwrap();
    }

    #[test]
    fn test_invalid_index_reports_failure() {
        let (bridge, _controller, server) = serving(16);
        bridge.send_command(DebugCommand::RemoveBreakpoint(3));
        assert!(matches!(
            bridge.recv_timeout(Duration::from_secs(5)),
            Some(DebugEvent::CommandFailed(_))
        ));
        bridge.shutdown();
        server.join().unwrap();
    }

    #[test]
    fn test_block_and_resume_over_channels() {
        let (bridge, controller, server) = serving(16);
        controller
            .registry()
            .add(Breakpoint::any_actor().with_hooks(HookFlags::only(LifecycleStage::PreExecute)));

        let worker = {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                let actor = TestActor(ActorPath::parse("Flow.A").unwrap());
                controller.pre_execute(&actor)
            })
        };

        match bridge.recv_timeout(Duration::from_secs(5)) {
            Some(DebugEvent::BreakpointReached { state, .. }) => {
                assert_eq!(state.actor_path.to_string(), "Flow.A");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        bridge.resume();
        assert_eq!(worker.join().unwrap(), HookOutcome::Resumed);

        bridge.shutdown();
        server.join().unwrap();
    }

    #[test]
    fn test_disable_switch_over_channels() {
        let (bridge, controller, server) = serving(16);
        controller
            .registry()
            .add(Breakpoint::any_actor().with_hooks(HookFlags::all()));

        bridge.set_disabled(true);
        match bridge.recv_timeout(Duration::from_secs(5)) {
            Some(DebugEvent::State(snapshot)) => assert!(snapshot.disabled),
            other => panic!("unexpected event: {:?}", other),
        }
        let actor = TestActor(ActorPath::parse("Flow.A").unwrap());
        assert_eq!(controller.pre_execute(&actor), HookOutcome::Continue);
        assert!(bridge.try_recv().is_none());

        bridge.set_disabled(false);
        match bridge.recv_timeout(Duration::from_secs(5)) {
            Some(DebugEvent::State(snapshot)) => assert!(!snapshot.disabled),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!controller.is_disabled());

        bridge.shutdown();
        server.join().unwrap();
    }

    #[test]
    fn test_full_queue_never_blocks_sink() {
        let (tx, rx) = bounded(1);
        let sink = ChannelSink::new(tx);
        let state = BlockedState {
            breakpoint: Arc::new(Breakpoint::any_actor()),
            actor_path: ActorPath::parse("Flow.A").unwrap(),
            stage: LifecycleStage::PreExecute,
            token: None,
            thread: "test".into(),
            blocked_at: chrono::Utc::now(),
            variables: Default::default(),
        };
        sink.notify(&state, &BTreeSet::new());
        sink.notify(&state, &BTreeSet::new());
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_shutdown_cancels_blocked_threads() {
        let controller = ExecutionController::standalone();
        let events = controller.apply(DebugCommand::Shutdown).unwrap();
        assert!(matches!(events.as_slice(), [DebugEvent::Shutdown]));
        assert!(controller.is_stopped());
    }
}
