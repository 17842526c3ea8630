//! The execution controller: parks execution threads on breakpoints and
//! releases them on operator commands.
//!
//! Every blocked execution thread owns its own parking slot, a single-slot
//! channel the control side sends a [`Release`] through. The registry lock is
//! never held while a thread waits; the controller's own state lock is held
//! only to add or drain slots, and while the sink is told about a new slot,
//! so no control action can release a thread before its notification.
//!
//! The mode is derived rather than stored:
//! - any thread parked → [`ExecutionMode::Blocked`]
//! - step mode armed → [`ExecutionMode::Stepping`]
//! - otherwise → [`ExecutionMode::Running`]

use crate::debug::breakpoint::{Breakpoint, FnCondition};
use crate::debug::hooks::{Actor, ExecutionHooks, HookContext, HookOutcome};
use crate::debug::notify::{BlockedState, NoopSink, NotificationSink};
use crate::debug::registry::BreakpointRegistry;
use crate::debug::scope::restriction_for;
use crate::types::{ActorPath, HookFlags, LifecycleStage, Token, ViewKind};
use chrono::Utc;
use crossbeam_channel::{bounded, Sender};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Coarse state of the controlled flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Running,
    Blocked,
    Stepping,
}

/// Answer to `current_state()`.
#[derive(Debug, Clone)]
pub struct ExecutionSnapshot {
    pub mode: ExecutionMode,
    /// Breakpoint of the oldest blocked thread.
    pub active_breakpoint: Option<Arc<Breakpoint>>,
    pub actor_path: Option<ActorPath>,
    pub hook: Option<LifecycleStage>,
    pub blocked_threads: usize,
    pub step_mode: bool,
    /// Debugger-wide switch; no breakpoint is evaluated while set.
    pub disabled: bool,
    pub stopped: Option<String>,
}

impl ExecutionSnapshot {
    pub fn hook_name(&self) -> Option<&'static str> {
        self.hook.map(|h| h.name())
    }
}

/// Signal delivered to a parked execution thread.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Release {
    Resume,
    Cancel(String),
}

struct ParkedSlot {
    id: u64,
    state: BlockedState,
    release: Sender<Release>,
}

#[derive(Default)]
struct ControlState {
    parked: Vec<ParkedSlot>,
    stopped: Option<String>,
}

/// Blocks execution threads when breakpoints fire.
pub struct ExecutionController {
    registry: Arc<BreakpointRegistry>,
    sink: Arc<dyn NotificationSink>,
    global_views: RwLock<BTreeSet<ViewKind>>,
    state: Mutex<ControlState>,
    blocked: Condvar,
    next_slot: AtomicU64,
    pause_requested: AtomicBool,
    pause_breakpoint: Arc<Breakpoint>,
    disabled: AtomicBool,
}

impl ExecutionController {
    pub fn new(registry: Arc<BreakpointRegistry>, sink: Arc<dyn NotificationSink>) -> Self {
        let pause_breakpoint = Breakpoint::new(FnCondition::new("pause", |_: &HookContext<'_>| {
            Ok(true)
        }))
        .with_hooks(HookFlags::all());

        Self {
            registry,
            sink,
            global_views: RwLock::new(BTreeSet::new()),
            state: Mutex::new(ControlState::default()),
            blocked: Condvar::new(),
            next_slot: AtomicU64::new(0),
            pause_requested: AtomicBool::new(false),
            pause_breakpoint: Arc::new(pause_breakpoint),
            disabled: AtomicBool::new(false),
        }
    }

    /// Controller with an empty registry and a logging-only sink.
    pub fn standalone() -> Self {
        Self::new(Arc::new(BreakpointRegistry::new()), Arc::new(NoopSink))
    }

    pub fn with_views(self, views: impl IntoIterator<Item = ViewKind>) -> Self {
        self.set_global_views(views.into_iter().collect());
        self
    }

    pub fn registry(&self) -> &Arc<BreakpointRegistry> {
        &self.registry
    }

    pub fn set_global_views(&self, views: BTreeSet<ViewKind>) {
        *self
            .global_views
            .write()
            .unwrap_or_else(PoisonError::into_inner) = views;
    }

    pub fn global_views(&self) -> BTreeSet<ViewKind> {
        self.global_views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Execution-thread side ──

    /// Evaluate breakpoints for one hook and park the calling thread if one fires.
    pub fn on_hook_reached(
        &self,
        stage: LifecycleStage,
        actor: &dyn Actor,
        token: Option<&Token>,
    ) -> HookOutcome {
        if let Some(reason) = self.lock().stopped.clone() {
            return HookOutcome::Cancelled(reason);
        }
        if self.is_disabled() {
            return HookOutcome::Continue;
        }

        let ctx = HookContext::new(actor, stage, token);
        let Some(breakpoint) = self.select_breakpoint(&ctx) else {
            return HookOutcome::Continue;
        };

        breakpoint.triggered();
        self.park(breakpoint, &ctx)
    }

    fn select_breakpoint(&self, ctx: &HookContext<'_>) -> Option<Arc<Breakpoint>> {
        if self.pause_requested.swap(false, Ordering::AcqRel) {
            return Some(Arc::clone(&self.pause_breakpoint));
        }

        if let Some(restriction) = restriction_for(ctx.actor) {
            if !restriction.matches(ctx.path(), ctx.stage) {
                return None;
            }
        }

        self.registry.first_triggered(ctx)
    }

    fn park(&self, breakpoint: Arc<Breakpoint>, ctx: &HookContext<'_>) -> HookOutcome {
        let current = std::thread::current();
        let thread = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));

        let state = BlockedState {
            breakpoint: Arc::clone(&breakpoint),
            actor_path: ctx.path().clone(),
            stage: ctx.stage,
            token: ctx.token.cloned(),
            thread,
            blocked_at: Utc::now(),
            variables: ctx.actor.variables(),
        };

        let mut views = self.global_views();
        views.extend(breakpoint.views());

        let (release_tx, release_rx) = bounded(1);
        let slot_id = self.next_slot.fetch_add(1, Ordering::Relaxed);
        {
            let mut control = self.lock();
            if let Some(reason) = control.stopped.clone() {
                return HookOutcome::Cancelled(reason);
            }
            tracing::info!(
                "Breakpoint '{}' reached at {} of {} on thread {}",
                breakpoint.describe(),
                state.hook_name(),
                state.actor_path,
                state.thread
            );
            // Still under the lock: resume/step/stop cannot drain the slot yet.
            self.sink.notify(&state, &views);
            control.parked.push(ParkedSlot {
                id: slot_id,
                state,
                release: release_tx,
            });
        }
        self.blocked.notify_all();

        match release_rx.recv() {
            Ok(Release::Resume) => {
                tracing::debug!("Slot {} resumed", slot_id);
                HookOutcome::Resumed
            }
            Ok(Release::Cancel(reason)) => {
                tracing::debug!("Slot {} cancelled: {}", slot_id, reason);
                HookOutcome::Cancelled(reason)
            }
            Err(_) => {
                tracing::warn!("Slot {} lost its release channel", slot_id);
                HookOutcome::Cancelled("controller released the slot without a signal".into())
            }
        }
    }

    // ── Control-thread side ──

    /// Release every parked thread; returns how many were released.
    fn release_all(&self, signal: Release) -> usize {
        let slots = std::mem::take(&mut self.lock().parked);
        for slot in &slots {
            // The receiver only goes away with its thread; nothing to do then.
            let _ = slot.release.send(signal.clone());
        }
        slots.len()
    }

    /// Leave step mode and let blocked threads continue.
    ///
    /// Returns `false` without changing anything when no thread is blocked.
    pub fn resume(&self) -> bool {
        if !self.is_blocked() {
            tracing::debug!("Resume ignored: not blocked");
            return false;
        }
        self.registry.disable_step_mode();
        let released = self.release_all(Release::Resume);
        self.after_release(released)
    }

    /// Arm step mode and let blocked threads continue.
    ///
    /// The next actor to reach its pre-execute hook blocks again. Step mode
    /// stays armed until [`resume`](Self::resume) or `toggle_step_mode(false)`.
    pub fn step(&self) -> bool {
        self.registry.enable_step_mode();
        let released = self.release_all(Release::Resume);
        self.after_release(released)
    }

    fn after_release(&self, released: usize) -> bool {
        if released == 0 {
            return false;
        }
        let removed = self.registry.remove_spent_one_offs();
        tracing::debug!(
            "Released {} thread(s), removed {} one-off breakpoint(s)",
            released,
            removed
        );
        true
    }

    /// Abort the flow: parked threads and every later hook get `Cancelled`.
    pub fn stop(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let slots = {
            let mut control = self.lock();
            control.stopped = Some(reason.clone());
            std::mem::take(&mut control.parked)
        };
        self.pause_requested.store(false, Ordering::Release);

        tracing::info!("Stopping flow ({} blocked): {}", slots.len(), reason);
        for slot in &slots {
            let _ = slot.release.send(Release::Cancel(reason.clone()));
        }
        self.blocked.notify_all();
    }

    /// Clear a previous `stop` so the controller can drive another run.
    pub fn reset(&self) {
        self.lock().stopped = None;
    }

    /// Block the next hook reached on any thread.
    pub fn pause(&self) {
        if self.is_stopped() {
            return;
        }
        tracing::debug!("Pause requested");
        self.pause_requested.store(true, Ordering::Release);
    }

    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::Acquire)
    }

    /// Switch the whole debugger off or back on.
    ///
    /// While disabled every hook continues without evaluating breakpoints;
    /// a pending pause waits until the debugger is enabled again. Threads
    /// that are already blocked stay blocked.
    pub fn set_disabled(&self, disabled: bool) {
        let was = self.disabled.swap(disabled, Ordering::AcqRel);
        if was != disabled {
            tracing::info!("Debugger {}", if disabled { "disabled" } else { "enabled" });
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Flip `disabled` on the breakpoint behind the current block.
    pub fn toggle_active_breakpoint(&self) -> Option<bool> {
        let breakpoint = self
            .lock()
            .parked
            .first()
            .map(|slot| Arc::clone(&slot.state.breakpoint))?;
        Some(breakpoint.toggle_disabled())
    }

    pub fn toggle_step_mode(&self, enabled: bool) {
        self.registry.toggle_step_mode(enabled);
    }

    pub fn is_step_mode_enabled(&self) -> bool {
        self.registry.is_step_mode_enabled()
    }

    // ── Queries ──

    pub fn is_blocked(&self) -> bool {
        !self.lock().parked.is_empty()
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped.is_some()
    }

    pub fn mode(&self) -> ExecutionMode {
        if self.is_blocked() {
            ExecutionMode::Blocked
        } else if self.is_step_mode_enabled() {
            ExecutionMode::Stepping
        } else {
            ExecutionMode::Running
        }
    }

    /// Blocked contexts, oldest first.
    pub fn blocked_states(&self) -> Vec<BlockedState> {
        self.lock()
            .parked
            .iter()
            .map(|slot| slot.state.clone())
            .collect()
    }

    pub fn current_state(&self) -> ExecutionSnapshot {
        let (active, blocked_threads, stopped) = {
            let control = self.lock();
            (
                control.parked.first().map(|slot| slot.state.clone()),
                control.parked.len(),
                control.stopped.clone(),
            )
        };
        let step_mode = self.is_step_mode_enabled();
        let mode = if active.is_some() {
            ExecutionMode::Blocked
        } else if step_mode {
            ExecutionMode::Stepping
        } else {
            ExecutionMode::Running
        };

        ExecutionSnapshot {
            mode,
            active_breakpoint: active.as_ref().map(|s| Arc::clone(&s.breakpoint)),
            actor_path: active.as_ref().map(|s| s.actor_path.clone()),
            hook: active.as_ref().map(|s| s.stage),
            blocked_threads,
            step_mode,
            disabled: self.is_disabled(),
            stopped,
        }
    }

    /// Wait until at least one thread is blocked or the controller stopped.
    pub fn wait_for_block(&self, timeout: Duration) -> Option<BlockedState> {
        let deadline = Instant::now() + timeout;
        let mut control = self.lock();
        loop {
            if let Some(slot) = control.parked.first() {
                return Some(slot.state.clone());
            }
            if control.stopped.is_some() {
                return None;
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            control = self
                .blocked
                .wait_timeout(control, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

impl ExecutionHooks for ExecutionController {
    fn on_hook(
        &self,
        stage: LifecycleStage,
        actor: &dyn Actor,
        token: Option<&Token>,
    ) -> HookOutcome {
        self.on_hook_reached(stage, actor, token)
    }
}

impl std::fmt::Debug for ExecutionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionController")
            .field("mode", &self.mode())
            .field("breakpoints", &self.registry.len())
            .finish()
    }
}
