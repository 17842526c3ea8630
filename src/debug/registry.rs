//! The shared, ordered collection of breakpoints.
//!
//! Writers swap in a fresh `Arc<Vec<_>>` under a short write lock; the
//! execution thread clones the current `Arc` and evaluates without holding
//! any lock. A breakpoint removed concurrently may therefore fire once more.

use crate::debug::breakpoint::{Breakpoint, BreakpointSummary};
use crate::debug::hooks::HookContext;
use crate::error::{FlowDebugError, Result};
use std::sync::{Arc, PoisonError, RwLock};

type Entries = Arc<Vec<Arc<Breakpoint>>>;

/// Ordered breakpoints plus the step-mode sentinel bookkeeping.
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    entries: RwLock<Entries>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current sequence; cheap to call on every hook.
    pub fn snapshot(&self) -> Entries {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn modify<R>(&self, f: impl FnOnce(&mut Vec<Arc<Breakpoint>>) -> R) -> R {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.as_ref().clone();
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }

    pub fn list(&self) -> Vec<Arc<Breakpoint>> {
        self.snapshot().as_ref().clone()
    }

    pub fn summaries(&self) -> Vec<BreakpointSummary> {
        self.snapshot()
            .iter()
            .enumerate()
            .map(|(i, bp)| bp.summary(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Append a breakpoint; returns the shared handle.
    ///
    /// The step-mode sentinel is never listed twice: adding it again returns
    /// the registered one unchanged.
    pub fn add(&self, breakpoint: impl Into<Arc<Breakpoint>>) -> Arc<Breakpoint> {
        let breakpoint = breakpoint.into();
        self.modify(|v| {
            if breakpoint.is_step_sentinel() {
                if let Some(existing) = v.iter().find(|bp| bp.is_step_sentinel()) {
                    tracing::debug!("Step-mode breakpoint already registered");
                    return Arc::clone(existing);
                }
            }
            v.push(Arc::clone(&breakpoint));
            breakpoint
        })
    }

    pub fn replace_at(&self, index: usize, breakpoint: impl Into<Arc<Breakpoint>>) -> Result<()> {
        let breakpoint = breakpoint.into();
        self.modify(|v| {
            let len = v.len();
            if index >= len {
                return Err(FlowDebugError::BreakpointIndex { index, len });
            }
            if breakpoint.is_step_sentinel() {
                if let Some(existing) = v
                    .iter()
                    .position(|bp| bp.is_step_sentinel())
                    .filter(|&i| i != index)
                {
                    return Err(FlowDebugError::DuplicateStepSentinel { existing });
                }
            }
            v[index] = breakpoint;
            Ok(())
        })
    }

    pub fn remove_at(&self, index: usize) -> Result<Arc<Breakpoint>> {
        self.modify(|v| {
            if index >= v.len() {
                return Err(FlowDebugError::BreakpointIndex { index, len: v.len() });
            }
            Ok(v.remove(index))
        })
    }

    /// Remove a specific breakpoint by identity.
    pub fn remove(&self, breakpoint: &Arc<Breakpoint>) -> bool {
        self.modify(|v| {
            let before = v.len();
            v.retain(|bp| !Arc::ptr_eq(bp, breakpoint));
            v.len() != before
        })
    }

    pub fn clear(&self) {
        self.modify(Vec::clear);
    }

    /// Flip `disabled` on the breakpoint at `index`; returns the new value.
    pub fn toggle_disabled(&self, index: usize) -> Result<bool> {
        let entries = self.snapshot();
        let bp = entries.get(index).ok_or(FlowDebugError::BreakpointIndex {
            index,
            len: entries.len(),
        })?;
        Ok(bp.toggle_disabled())
    }

    pub fn find(&self, predicate: impl Fn(&Breakpoint) -> bool) -> Option<Arc<Breakpoint>> {
        self.snapshot().iter().find(|bp| predicate(bp)).cloned()
    }

    pub fn position(&self, breakpoint: &Arc<Breakpoint>) -> Option<usize> {
        self.snapshot()
            .iter()
            .position(|bp| Arc::ptr_eq(bp, breakpoint))
    }

    /// All breakpoints firing for the hook, in registry order.
    pub fn triggered_at(&self, ctx: &HookContext<'_>) -> Vec<Arc<Breakpoint>> {
        self.snapshot()
            .iter()
            .filter(|bp| bp.triggers(ctx))
            .cloned()
            .collect()
    }

    /// First breakpoint firing for the hook; stops at the first hit.
    pub fn first_triggered(&self, ctx: &HookContext<'_>) -> Option<Arc<Breakpoint>> {
        self.snapshot().iter().find(|bp| bp.triggers(ctx)).cloned()
    }

    // ── Step mode ──

    fn sentinel(&self) -> Option<Arc<Breakpoint>> {
        self.find(Breakpoint::is_step_sentinel)
    }

    /// Arm the sentinel, synthesizing it on first use.
    pub fn enable_step_mode(&self) {
        self.modify(|v| match v.iter().find(|bp| bp.is_step_sentinel()) {
            Some(sentinel) => {
                if sentinel.is_disabled() {
                    sentinel.set_disabled(false);
                }
            }
            None => {
                tracing::debug!("Synthesizing step-mode breakpoint");
                v.push(Arc::new(Breakpoint::step_mode_sentinel()));
            }
        });
    }

    /// Disable the sentinel; it stays in the list.
    pub fn disable_step_mode(&self) {
        if let Some(sentinel) = self.sentinel() {
            if !sentinel.is_disabled() {
                sentinel.set_disabled(true);
            }
        }
    }

    pub fn toggle_step_mode(&self, enabled: bool) {
        if enabled {
            self.enable_step_mode();
        } else {
            self.disable_step_mode();
        }
    }

    pub fn is_step_mode_enabled(&self) -> bool {
        self.sentinel().is_some_and(|s| !s.is_disabled())
    }

    /// Drop one-off breakpoints that have fired; returns how many went.
    pub fn remove_spent_one_offs(&self) -> usize {
        if !self
            .snapshot()
            .iter()
            .any(|bp| bp.is_one_off() && bp.trigger_count() > 0)
        {
            return 0;
        }
        self.modify(|v| {
            let before = v.len();
            v.retain(|bp| !(bp.is_one_off() && bp.trigger_count() > 0));
            before - v.len()
        })
    }
}
