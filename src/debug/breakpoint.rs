//! Breakpoints: configured watch-points that may halt a flow at a hook.
//!
//! A [`Breakpoint`] combines per-hook flags, a disabled switch, a
//! [`ScopeRestriction`] and a kind-specific [`BreakpointCondition`]. It is
//! shared as `Arc<Breakpoint>`; identity is the allocation, not the contents.
//!
//! Settings live behind a lock so the control thread can change them while
//! an execution thread evaluates the breakpoint. Each trigger query takes the
//! lock once, copies what it needs and evaluates the condition unlocked.

use crate::debug::hooks::{Actor, HookContext};
use crate::debug::scope::ScopeRestriction;
use crate::error::Result;
use crate::types::{ActorPath, HookFlags, LifecycleStage, Token, ViewKind, Watch};
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// Kind-specific trigger predicate of a breakpoint.
pub trait BreakpointCondition: Send + Sync {
    /// Short human-readable description, e.g. for breakpoint lists.
    fn describe(&self) -> String;

    /// Whether the breakpoint should fire for this hook.
    ///
    /// Must not have side effects visible to the caller; an `Err` is
    /// treated as "does not trigger".
    fn evaluate(&self, ctx: &HookContext<'_>) -> Result<bool>;
}

/// Fires for every actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyActorCondition;

impl BreakpointCondition for AnyActorCondition {
    fn describe(&self) -> String {
        "any actor".to_string()
    }

    fn evaluate(&self, _ctx: &HookContext<'_>) -> Result<bool> {
        Ok(true)
    }
}

/// Fires for actors whose full path equals one of the listed paths.
#[derive(Debug, Clone)]
pub struct ActorPathCondition {
    paths: Vec<ActorPath>,
}

impl ActorPathCondition {
    pub fn new(paths: Vec<ActorPath>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[ActorPath] {
        &self.paths
    }
}

impl BreakpointCondition for ActorPathCondition {
    fn describe(&self) -> String {
        let names: Vec<String> = self.paths.iter().map(ToString::to_string).collect();
        format!("actor path in [{}]", names.join(", "))
    }

    fn evaluate(&self, ctx: &HookContext<'_>) -> Result<bool> {
        Ok(self.paths.iter().any(|p| p == ctx.path()))
    }
}

/// Adapter turning a closure into a condition.
pub struct FnCondition<F> {
    label: String,
    f: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&HookContext<'_>) -> Result<bool> + Send + Sync,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> BreakpointCondition for FnCondition<F>
where
    F: Fn(&HookContext<'_>) -> Result<bool> + Send + Sync,
{
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn evaluate(&self, ctx: &HookContext<'_>) -> Result<bool> {
        (self.f)(ctx)
    }
}

/// Mutable configuration of a breakpoint.
#[derive(Debug, Clone)]
pub struct BreakpointSettings {
    pub disabled: bool,
    pub hooks: HookFlags,
    pub scope: Arc<ScopeRestriction>,
    pub watches: Vec<Watch>,
    pub views: BTreeSet<ViewKind>,
    /// Removed from the registry once it has fired and the flow continues.
    pub one_off: bool,
}

impl Default for BreakpointSettings {
    fn default() -> Self {
        Self {
            disabled: false,
            hooks: HookFlags::none(),
            scope: Arc::new(ScopeRestriction::Unrestricted),
            watches: Vec::new(),
            views: BTreeSet::new(),
            one_off: false,
        }
    }
}

/// One configured breakpoint.
pub struct Breakpoint {
    settings: RwLock<BreakpointSettings>,
    condition: Box<dyn BreakpointCondition>,
    trigger_count: AtomicU64,
    step_sentinel: bool,
}

/// Row of a breakpoint listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSummary {
    pub index: usize,
    pub description: String,
    pub disabled: bool,
    pub hooks: HookFlags,
    pub one_off: bool,
    pub trigger_count: u64,
    pub step_sentinel: bool,
}

impl Breakpoint {
    /// Create a breakpoint with no hooks enabled.
    pub fn new(condition: impl BreakpointCondition + 'static) -> Self {
        Self::from_boxed(Box::new(condition))
    }

    pub fn from_boxed(condition: Box<dyn BreakpointCondition>) -> Self {
        Self {
            settings: RwLock::new(BreakpointSettings::default()),
            condition,
            trigger_count: AtomicU64::new(0),
            step_sentinel: false,
        }
    }

    /// Breakpoint that fires for every actor.
    pub fn any_actor() -> Self {
        Self::new(AnyActorCondition)
    }

    /// Breakpoint that fires for the given actor paths.
    pub fn for_paths(paths: Vec<ActorPath>) -> Self {
        Self::new(ActorPathCondition::new(paths))
    }

    /// The synthetic "break before every actor" breakpoint of step mode.
    pub(crate) fn step_mode_sentinel() -> Self {
        let mut bp = Self::any_actor().with_hooks(HookFlags::only(LifecycleStage::PreExecute));
        bp.step_sentinel = true;
        bp
    }

    // ── Builder-style configuration (before sharing) ──

    pub fn with_hooks(self, hooks: HookFlags) -> Self {
        self.set_hooks(hooks);
        self
    }

    pub fn with_scope(self, scope: ScopeRestriction) -> Self {
        self.set_scope(scope);
        self
    }

    pub fn with_watches(self, watches: Vec<Watch>) -> Self {
        self.set_watches(watches);
        self
    }

    pub fn with_views(self, views: impl IntoIterator<Item = ViewKind>) -> Self {
        self.set_views(views.into_iter().collect());
        self
    }

    pub fn with_disabled(self, disabled: bool) -> Self {
        self.set_disabled(disabled);
        self
    }

    pub fn with_one_off(self, one_off: bool) -> Self {
        self.set_one_off(one_off);
        self
    }

    // ── Setters ──
    //
    // Every setter resets the trigger counter.

    fn update(&self, f: impl FnOnce(&mut BreakpointSettings)) {
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut settings);
        self.trigger_count.store(0, Ordering::Relaxed);
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.update(|s| s.disabled = disabled);
    }

    /// Flip the disabled state; returns the new value.
    pub fn toggle_disabled(&self) -> bool {
        let mut now_disabled = false;
        self.update(|s| {
            s.disabled = !s.disabled;
            now_disabled = s.disabled;
        });
        now_disabled
    }

    pub fn set_hooks(&self, hooks: HookFlags) {
        self.update(|s| s.hooks = hooks);
    }

    pub fn set_hook(&self, stage: LifecycleStage, enabled: bool) {
        self.update(|s| s.hooks.set(stage, enabled));
    }

    pub fn set_on_pre_input(&self, enabled: bool) {
        self.set_hook(LifecycleStage::PreInput, enabled);
    }

    pub fn set_on_post_input(&self, enabled: bool) {
        self.set_hook(LifecycleStage::PostInput, enabled);
    }

    pub fn set_on_pre_execute(&self, enabled: bool) {
        self.set_hook(LifecycleStage::PreExecute, enabled);
    }

    pub fn set_on_post_execute(&self, enabled: bool) {
        self.set_hook(LifecycleStage::PostExecute, enabled);
    }

    pub fn set_on_pre_output(&self, enabled: bool) {
        self.set_hook(LifecycleStage::PreOutput, enabled);
    }

    pub fn set_on_post_output(&self, enabled: bool) {
        self.set_hook(LifecycleStage::PostOutput, enabled);
    }

    /// Replace the scope restriction.
    pub fn set_scope(&self, scope: ScopeRestriction) {
        self.update(|s| s.scope = Arc::new(scope));
    }

    pub fn set_watches(&self, watches: Vec<Watch>) {
        self.update(|s| s.watches = watches);
    }

    pub fn set_views(&self, views: BTreeSet<ViewKind>) {
        self.update(|s| s.views = views);
    }

    pub fn set_one_off(&self, one_off: bool) {
        self.update(|s| s.one_off = one_off);
    }

    // ── Getters ──

    fn read(&self) -> RwLockReadGuard<'_, BreakpointSettings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current settings.
    pub fn settings(&self) -> BreakpointSettings {
        self.read().clone()
    }

    pub fn is_disabled(&self) -> bool {
        self.read().disabled
    }

    pub fn hooks(&self) -> HookFlags {
        self.read().hooks
    }

    pub fn scope(&self) -> Arc<ScopeRestriction> {
        Arc::clone(&self.read().scope)
    }

    pub fn watches(&self) -> Vec<Watch> {
        self.read().watches.clone()
    }

    pub fn views(&self) -> BTreeSet<ViewKind> {
        self.read().views.clone()
    }

    pub fn is_one_off(&self) -> bool {
        self.read().one_off
    }

    pub fn is_step_sentinel(&self) -> bool {
        self.step_sentinel
    }

    pub fn describe(&self) -> String {
        if self.step_sentinel {
            "step mode".to_string()
        } else {
            self.condition.describe()
        }
    }

    pub fn summary(&self, index: usize) -> BreakpointSummary {
        let settings = self.read();
        BreakpointSummary {
            index,
            description: self.describe(),
            disabled: settings.disabled,
            hooks: settings.hooks,
            one_off: settings.one_off,
            trigger_count: self.trigger_count(),
            step_sentinel: self.step_sentinel,
        }
    }

    // ── Triggering ──

    /// Record that this breakpoint caused a block.
    pub fn triggered(&self) {
        self.trigger_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn trigger_count(&self) -> u64 {
        self.trigger_count.load(Ordering::Relaxed)
    }

    /// Whether the breakpoint fires for the given hook.
    pub fn triggers(&self, ctx: &HookContext<'_>) -> bool {
        let scope = {
            let settings = self.read();
            if settings.disabled || !settings.hooks.for_stage(ctx.stage) {
                return false;
            }
            Arc::clone(&settings.scope)
        };

        if !scope.matches(ctx.path(), ctx.stage) {
            return false;
        }

        self.evaluate(ctx)
    }

    pub fn triggers_pre_input(&self, actor: &dyn Actor, token: &Token) -> bool {
        self.triggers(&HookContext::new(actor, LifecycleStage::PreInput, Some(token)))
    }

    pub fn triggers_post_input(&self, actor: &dyn Actor) -> bool {
        self.triggers(&HookContext::new(actor, LifecycleStage::PostInput, None))
    }

    pub fn triggers_pre_execute(&self, actor: &dyn Actor) -> bool {
        self.triggers(&HookContext::new(actor, LifecycleStage::PreExecute, None))
    }

    pub fn triggers_post_execute(&self, actor: &dyn Actor) -> bool {
        self.triggers(&HookContext::new(actor, LifecycleStage::PostExecute, None))
    }

    pub fn triggers_pre_output(&self, actor: &dyn Actor) -> bool {
        self.triggers(&HookContext::new(actor, LifecycleStage::PreOutput, None))
    }

    pub fn triggers_post_output(&self, actor: &dyn Actor, token: &Token) -> bool {
        self.triggers(&HookContext::new(actor, LifecycleStage::PostOutput, Some(token)))
    }

    /// Run the condition, containing any failure at this boundary.
    fn evaluate(&self, ctx: &HookContext<'_>) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.condition.evaluate(ctx))) {
            Ok(Ok(fires)) => fires,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Breakpoint '{}' failed at {} of {}: {}",
                    self.describe(),
                    ctx.stage,
                    ctx.path(),
                    e
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    "Breakpoint '{}' panicked at {} of {}",
                    self.describe(),
                    ctx.stage,
                    ctx.path()
                );
                false
            }
        }
    }
}

impl fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.read();
        f.debug_struct("Breakpoint")
            .field("condition", &self.describe())
            .field("disabled", &settings.disabled)
            .field("hooks", &settings.hooks)
            .field("scope", &settings.scope)
            .field("one_off", &settings.one_off)
            .field("trigger_count", &self.trigger_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowDebugError;

    struct TestActor {
        path: ActorPath,
    }

    impl Actor for TestActor {
        fn full_path(&self) -> &ActorPath {
            &self.path
        }

        fn parent(&self) -> Option<&dyn Actor> {
            None
        }
    }

    fn actor(path: &str) -> TestActor {
        TestActor {
            path: ActorPath::parse(path).unwrap(),
        }
    }

    fn fires_everywhere(bp: &Breakpoint, a: &TestActor) -> Vec<bool> {
        let token = Token::new(1);
        vec![
            bp.triggers_pre_input(a, &token),
            bp.triggers_post_input(a),
            bp.triggers_pre_execute(a),
            bp.triggers_post_execute(a),
            bp.triggers_pre_output(a),
            bp.triggers_post_output(a, &token),
        ]
    }

    #[test]
    fn test_disabled_never_triggers() {
        let bp = Breakpoint::any_actor()
            .with_hooks(HookFlags::all())
            .with_disabled(true);
        assert_eq!(fires_everywhere(&bp, &actor("Flow.A")), vec![false; 6]);
    }

    #[test]
    fn test_only_flagged_hooks_trigger() {
        let bp = Breakpoint::any_actor().with_hooks(HookFlags::only(LifecycleStage::PostExecute));
        assert_eq!(
            fires_everywhere(&bp, &actor("Flow.A")),
            vec![false, false, false, true, false, false]
        );
    }

    #[test]
    fn test_scope_limits_triggering() {
        let bp = Breakpoint::any_actor()
            .with_hooks(HookFlags::all())
            .with_scope(ScopeRestriction::subtree(ActorPath::parse("Flow.Branch").unwrap()));
        assert!(bp.triggers_pre_execute(&actor("Flow.Branch.Sub")));
        assert!(!bp.triggers_pre_execute(&actor("Flow.BranchOther")));
    }

    #[test]
    fn test_path_condition() {
        let bp = Breakpoint::for_paths(vec![ActorPath::parse("Flow.A").unwrap()])
            .with_hooks(HookFlags::only(LifecycleStage::PreExecute));
        assert!(bp.triggers_pre_execute(&actor("Flow.A")));
        assert!(!bp.triggers_pre_execute(&actor("Flow.A.Child")));
    }

    #[test]
    fn test_failing_condition_does_not_trigger() {
        let bp = Breakpoint::new(FnCondition::new("broken", |_ctx: &HookContext<'_>| {
            Err(FlowDebugError::Condition("malformed".to_string()))
        }))
        .with_hooks(HookFlags::all());
        assert!(!bp.triggers_pre_execute(&actor("Flow.A")));
    }

    #[test]
    fn test_panicking_condition_does_not_trigger() {
        let bp = Breakpoint::new(FnCondition::new("panics", |_ctx: &HookContext<'_>| -> Result<bool> {
            panic!("bad predicate")
        }))
        .with_hooks(HookFlags::all());
        assert!(!bp.triggers_pre_execute(&actor("Flow.A")));
    }

    #[test]
    fn test_condition_sees_token() {
        let bp = Breakpoint::new(FnCondition::new("token is 7", |ctx: &HookContext<'_>| {
            Ok(ctx.token.map(|t| t.payload == 7).unwrap_or(false))
        }))
        .with_hooks(HookFlags::all());
        let a = actor("Flow.A");
        assert!(bp.triggers_pre_input(&a, &Token::new(7)));
        assert!(!bp.triggers_pre_input(&a, &Token::new(8)));
        assert!(!bp.triggers_pre_execute(&a));
    }

    #[test]
    fn test_setters_reset_trigger_count() {
        let bp = Breakpoint::any_actor();
        bp.triggered();
        bp.triggered();
        assert_eq!(bp.trigger_count(), 2);
        bp.set_on_pre_output(true);
        assert_eq!(bp.trigger_count(), 0);
        assert!(bp.hooks().on_pre_output);
    }

    #[test]
    fn test_toggle_disabled() {
        let bp = Breakpoint::any_actor();
        assert!(bp.toggle_disabled());
        assert!(bp.is_disabled());
        assert!(!bp.toggle_disabled());
    }

    #[test]
    fn test_step_sentinel_shape() {
        let bp = Breakpoint::step_mode_sentinel();
        assert!(bp.is_step_sentinel());
        assert_eq!(bp.hooks(), HookFlags::only(LifecycleStage::PreExecute));
        assert_eq!(bp.describe(), "step mode");
    }

    #[test]
    fn test_flag_writes_while_evaluating() {
        let bp = Arc::new(Breakpoint::any_actor().with_hooks(HookFlags::all()));
        let writer = {
            let bp = Arc::clone(&bp);
            std::thread::spawn(move || {
                for i in 0..1_000 {
                    bp.set_disabled(i % 2 == 0);
                }
                bp.set_disabled(true);
            })
        };
        let a = actor("Flow.A");
        for _ in 0..1_000 {
            let _ = bp.triggers_pre_execute(&a);
        }
        writer.join().unwrap();
        assert!(!bp.triggers_pre_execute(&a));
    }
}
