//! Flow executor: runs actors in dependency order and reports every
//! lifecycle hook to an [`ExecutionHooks`] implementation.
//!
//! One run:
//! 1. Compute the execution order (Kahn's algorithm, insertion order for ties).
//! 2. Run each source once; its outputs are queued on the downstream actors.
//! 3. Every other actor consumes its queue one token at a time.
//!
//! Per token the hooks are visited in program order: pre-input, post-input,
//! pre-execute, post-execute, then a pre-output/post-output pair around each
//! emitted token. Sources skip the two input hooks; an actor that emits
//! nothing skips the output hooks.

use crate::debug::hooks::{ExecutionHooks, HookOutcome};
use crate::debug::scope::ScopeRestriction;
use crate::error::{FlowDebugError, Result};
use crate::flow::actor::ActorInfo;
use crate::flow::id::{ActorId, EdgeId};
use crate::flow::node::{ActorContext, AnyLogic};
use crate::scripting::ScriptEngine;
use crate::types::{ActorPath, Token, Variables};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// A data edge between two actors.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: ActorId,
    pub to: ActorId,
}

/// An actor and its pending input tokens.
struct ActorSlot {
    info: Arc<ActorInfo>,
    logic: AnyLogic,
    queue: VecDeque<Token>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Every actor drained its input.
    Completed { executions: usize },
    /// A hook returned `Cancelled`.
    Stopped(String),
}

enum Invocation {
    Emitted(Vec<Token>),
    Stopped(String),
}

fn cancelled(outcome: HookOutcome) -> Option<String> {
    match outcome {
        HookOutcome::Cancelled(reason) => Some(reason),
        HookOutcome::Continue | HookOutcome::Resumed => None,
    }
}

/// A tree of named groups holding actors connected by a DAG of edges.
pub struct Flow {
    root: Arc<ActorInfo>,
    groups: BTreeMap<ActorPath, Arc<ActorInfo>>,
    actors: Vec<ActorSlot>,
    edges: Vec<Edge>,
    execution_order: Vec<ActorId>,
    order_dirty: bool,
    variables: Variables,
    engine: Arc<ScriptEngine>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_engine(name, Arc::new(ScriptEngine::new()))
    }

    pub fn with_engine(name: impl Into<String>, engine: Arc<ScriptEngine>) -> Self {
        let variables = Variables::new();
        let root = Arc::new(ActorInfo::root(name, variables.clone()));
        let mut groups = BTreeMap::new();
        groups.insert(root.path().clone(), Arc::clone(&root));
        Self {
            root,
            groups,
            actors: Vec::new(),
            edges: Vec::new(),
            execution_order: Vec::new(),
            order_dirty: true,
            variables,
            engine,
        }
    }

    pub fn root_path(&self) -> &ActorPath {
        self.root.path()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn engine(&self) -> &Arc<ScriptEngine> {
        &self.engine
    }

    fn group(&self, path: &ActorPath) -> Result<&Arc<ActorInfo>> {
        self.groups
            .get(path)
            .ok_or_else(|| FlowDebugError::Graph(format!("No group named '{}'", path)))
    }

    fn ensure_unused(&self, path: &ActorPath) -> Result<()> {
        if self.groups.contains_key(path) || self.find_actor(path).is_some() {
            return Err(FlowDebugError::Graph(format!("'{}' already exists", path)));
        }
        Ok(())
    }

    /// Add a group below `parent`, optionally restricting breakpoints inside it.
    pub fn add_group(
        &mut self,
        parent: &ActorPath,
        name: &str,
        scope: Option<ScopeRestriction>,
    ) -> Result<ActorPath> {
        let parent = Arc::clone(self.group(parent)?);
        let mut info = ActorInfo::child(&parent, name);
        if let Some(scope) = scope {
            info = info.with_scope(scope);
        }
        let path = info.path().clone();
        self.ensure_unused(&path)?;
        self.groups.insert(path.clone(), Arc::new(info));
        Ok(path)
    }

    /// Add an actor below the group at `parent`.
    pub fn add_actor(
        &mut self,
        parent: &ActorPath,
        name: &str,
        logic: impl Into<AnyLogic>,
    ) -> Result<ActorId> {
        let parent = Arc::clone(self.group(parent)?);
        let info = ActorInfo::child(&parent, name);
        self.ensure_unused(info.path())?;

        let id = ActorId(self.actors.len() as u32);
        let logic = logic.into();
        tracing::debug!("Added {} actor {} as {}", logic.kind(), info.path(), id);
        self.actors.push(ActorSlot {
            info: Arc::new(info),
            logic,
            queue: VecDeque::new(),
        });
        self.order_dirty = true;
        Ok(id)
    }

    /// Connect `from` to `to`; rejects unknown actors, self-loops and cycles.
    pub fn add_edge(&mut self, from: ActorId, to: ActorId) -> Result<EdgeId> {
        for id in [from, to] {
            if id.index() >= self.actors.len() {
                return Err(FlowDebugError::Graph(format!("Unknown actor {}", id)));
            }
        }
        if from == to || self.would_create_cycle(from, to) {
            return Err(FlowDebugError::Graph(format!(
                "Edge {} -> {} would create a cycle",
                self.actors[from.index()].info.path(),
                self.actors[to.index()].info.path()
            )));
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { id, from, to });
        self.order_dirty = true;
        Ok(id)
    }

    /// Check if adding an edge from `from` to `to` would create a cycle.
    fn would_create_cycle(&self, from: ActorId, to: ActorId) -> bool {
        // If `to` can already reach `from`, the new edge closes a loop.
        let mut visited = vec![false; self.actors.len()];
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let idx = current.index();
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend(
                self.edges
                    .iter()
                    .filter(|e| e.from == current)
                    .map(|e| e.to),
            );
        }
        false
    }

    pub fn find_actor(&self, path: &ActorPath) -> Option<ActorId> {
        self.actors
            .iter()
            .position(|slot| slot.info.path() == path)
            .map(|i| ActorId(i as u32))
    }

    pub fn actor_path(&self, id: ActorId) -> Option<&ActorPath> {
        self.actors.get(id.index()).map(|slot| slot.info.path())
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    // ── Topological sort (Kahn's algorithm) ──

    fn recompute_execution_order(&mut self) {
        let n = self.actors.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for edge in &self.edges {
            adj[edge.from.index()].push(edge.to.index());
            in_degree[edge.to.index()] += 1;
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(actor) = queue.pop_front() {
            order.push(ActorId(actor as u32));
            for &next in &adj[actor] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        // add_edge refuses cycles, so every actor gets scheduled
        debug_assert_eq!(order.len(), n);
        self.execution_order = order;
        self.order_dirty = false;
    }

    pub fn execution_order(&mut self) -> &[ActorId] {
        if self.order_dirty {
            self.recompute_execution_order();
        }
        &self.execution_order
    }

    // ── Running ──

    /// Run the flow to completion or until a hook cancels it.
    pub fn run(&mut self, hooks: &dyn ExecutionHooks) -> Result<FlowOutcome> {
        let order = self.execution_order().to_vec();
        for slot in &mut self.actors {
            slot.queue.clear();
        }

        tracing::info!(
            "Running flow {} ({} actors, {} edges)",
            self.root.path(),
            self.actors.len(),
            self.edges.len()
        );

        let mut executions = 0usize;
        for id in order {
            let inputs: Vec<Option<Token>> = if self.actors[id.index()].logic.is_source() {
                vec![None]
            } else {
                self.actors[id.index()].queue.drain(..).map(Some).collect()
            };

            for input in inputs {
                executions += 1;
                match self.invoke(id, input, hooks)? {
                    Invocation::Emitted(tokens) => self.forward(id, tokens),
                    Invocation::Stopped(reason) => {
                        tracing::info!("Flow {} stopped: {}", self.root.path(), reason);
                        return Ok(FlowOutcome::Stopped(reason));
                    }
                }
            }
        }

        tracing::info!(
            "Flow {} completed after {} executions",
            self.root.path(),
            executions
        );
        Ok(FlowOutcome::Completed { executions })
    }

    /// One actor invocation with all of its hooks.
    fn invoke(
        &mut self,
        id: ActorId,
        input: Option<Token>,
        hooks: &dyn ExecutionHooks,
    ) -> Result<Invocation> {
        let info = Arc::clone(&self.actors[id.index()].info);
        let actor = info.as_ref();

        if let Some(token) = &input {
            if let Some(reason) = cancelled(hooks.pre_input(actor, token)) {
                return Ok(Invocation::Stopped(reason));
            }
            if let Some(reason) = cancelled(hooks.post_input(actor)) {
                return Ok(Invocation::Stopped(reason));
            }
        }

        if let Some(reason) = cancelled(hooks.pre_execute(actor)) {
            return Ok(Invocation::Stopped(reason));
        }

        let ctx = ActorContext {
            path: info.path(),
            variables: &self.variables,
            engine: &self.engine,
        };
        let outputs = self.actors[id.index()]
            .logic
            .execute(input, &ctx)
            .map_err(|e| {
                tracing::error!("Actor {} failed: {}", info.path(), e);
                FlowDebugError::Actor {
                    path: info.path().to_string(),
                    message: e.to_string(),
                }
            })?;

        if let Some(reason) = cancelled(hooks.post_execute(actor)) {
            return Ok(Invocation::Stopped(reason));
        }
        for token in &outputs {
            if let Some(reason) = cancelled(hooks.pre_output(actor)) {
                return Ok(Invocation::Stopped(reason));
            }
            if let Some(reason) = cancelled(hooks.post_output(actor, token)) {
                return Ok(Invocation::Stopped(reason));
            }
        }

        Ok(Invocation::Emitted(outputs))
    }

    fn forward(&mut self, from: ActorId, tokens: Vec<Token>) {
        let targets: Vec<ActorId> = self
            .edges
            .iter()
            .filter(|e| e.from == from)
            .map(|e| e.to)
            .collect();
        for target in targets {
            self.actors[target.index()]
                .queue
                .extend(tokens.iter().cloned());
        }
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("root", self.root.path())
            .field("actors", &self.actors.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::hooks::{Actor, NoHooks};
    use crate::flow::nodes::{
        CollectorActor, PassthroughActor, ScriptActor, SetVariableActor, SourceActor,
    };
    use crate::types::LifecycleStage;
    use std::sync::Mutex;

    /// Hooks that record every call and optionally cancel at one point.
    #[derive(Default)]
    struct RecordingHooks {
        calls: Mutex<Vec<(LifecycleStage, String, Option<Token>)>>,
        cancel_at: Option<(LifecycleStage, String)>,
    }

    impl ExecutionHooks for RecordingHooks {
        fn on_hook(
            &self,
            stage: LifecycleStage,
            actor: &dyn Actor,
            token: Option<&Token>,
        ) -> HookOutcome {
            let path = actor.full_path().to_string();
            self.calls
                .lock()
                .unwrap()
                .push((stage, path.clone(), token.cloned()));
            match &self.cancel_at {
                Some((s, p)) if *s == stage && *p == path => {
                    HookOutcome::Cancelled("test".to_string())
                }
                _ => HookOutcome::Continue,
            }
        }
    }

    fn root() -> ActorPath {
        ActorPath::root("Flow")
    }

    #[test]
    fn test_topological_sort_diamond() {
        let mut flow = Flow::new("Flow");
        let a = flow.add_actor(&root(), "A", PassthroughActor::new()).unwrap();
        let b = flow.add_actor(&root(), "B", PassthroughActor::new()).unwrap();
        let c = flow.add_actor(&root(), "C", PassthroughActor::new()).unwrap();
        let d = flow.add_actor(&root(), "D", PassthroughActor::new()).unwrap();

        flow.add_edge(c, d).unwrap();
        flow.add_edge(a, b).unwrap();
        flow.add_edge(a, c).unwrap();
        flow.add_edge(b, d).unwrap();

        let order = flow.execution_order().to_vec();
        let pos = |id: ActorId| order.iter().position(|&x| x == id).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
    }

    #[test]
    fn test_cycles_rejected() {
        let mut flow = Flow::new("Flow");
        let a = flow.add_actor(&root(), "A", PassthroughActor::new()).unwrap();
        let b = flow.add_actor(&root(), "B", PassthroughActor::new()).unwrap();
        flow.add_edge(a, b).unwrap();
        assert!(flow.add_edge(b, a).is_err());
        assert!(flow.add_edge(a, a).is_err());
        assert!(flow.add_edge(a, ActorId(9)).is_err());
    }

    #[test]
    fn test_duplicate_and_unknown_paths_rejected() {
        let mut flow = Flow::new("Flow");
        flow.add_actor(&root(), "A", PassthroughActor::new()).unwrap();
        assert!(flow.add_actor(&root(), "A", PassthroughActor::new()).is_err());
        assert!(flow.add_group(&root(), "A", None).is_err());
        let missing = ActorPath::parse("Flow.Missing").unwrap();
        assert!(flow.add_actor(&missing, "B", PassthroughActor::new()).is_err());
    }

    #[test]
    fn test_hook_order_per_token() {
        let mut flow = Flow::new("Flow");
        let src = flow
            .add_actor(&root(), "Src", SourceActor::counting(1..2))
            .unwrap();
        let pass = flow.add_actor(&root(), "Pass", PassthroughActor::new()).unwrap();
        flow.add_edge(src, pass).unwrap();

        let hooks = RecordingHooks::default();
        let outcome = flow.run(&hooks).unwrap();
        assert_eq!(outcome, FlowOutcome::Completed { executions: 2 });

        let calls = hooks.calls.lock().unwrap();
        let seen: Vec<(LifecycleStage, &str)> =
            calls.iter().map(|(s, p, _)| (*s, p.as_str())).collect();
        use LifecycleStage::*;
        assert_eq!(
            seen,
            vec![
                (PreExecute, "Flow.Src"),
                (PostExecute, "Flow.Src"),
                (PreOutput, "Flow.Src"),
                (PostOutput, "Flow.Src"),
                (PreInput, "Flow.Pass"),
                (PostInput, "Flow.Pass"),
                (PreExecute, "Flow.Pass"),
                (PostExecute, "Flow.Pass"),
                (PreOutput, "Flow.Pass"),
                (PostOutput, "Flow.Pass"),
            ]
        );
        // tokens only on the token-carrying hooks
        for (stage, _, token) in calls.iter() {
            assert_eq!(token.is_some(), stage.carries_token());
        }
    }

    #[test]
    fn test_output_hooks_pair_per_emitted_token() {
        let mut flow = Flow::new("Flow");
        let src = flow
            .add_actor(&root(), "Src", SourceActor::counting(0..3))
            .unwrap();
        let (collector, handle) = CollectorActor::new();
        let sink = flow.add_actor(&root(), "Sink", collector).unwrap();
        flow.add_edge(src, sink).unwrap();

        let hooks = RecordingHooks::default();
        flow.run(&hooks).unwrap();
        assert_eq!(handle.len(), 3);

        let calls = hooks.calls.lock().unwrap();
        let stages_of = |path: &str| -> Vec<LifecycleStage> {
            calls
                .iter()
                .filter(|(_, p, _)| p == path)
                .map(|(s, _, _)| *s)
                .collect()
        };
        use LifecycleStage::*;
        assert_eq!(
            stages_of("Flow.Src"),
            vec![
                PreExecute, PostExecute, PreOutput, PostOutput, PreOutput, PostOutput, PreOutput,
                PostOutput,
            ]
        );
        // The collector emits nothing, so it never reaches the output hooks.
        assert_eq!(
            stages_of("Flow.Sink"),
            [PreInput, PostInput, PreExecute, PostExecute].repeat(3)
        );

        let emitted: Vec<Token> = calls
            .iter()
            .filter(|(s, p, _)| *s == PostOutput && p == "Flow.Src")
            .filter_map(|(_, _, t)| t.clone())
            .collect();
        assert_eq!(emitted, vec![Token::new(0), Token::new(1), Token::new(2)]);
    }

    #[test]
    fn test_script_and_variables() {
        let mut flow = Flow::new("Flow");
        let script = ScriptActor::new(flow.engine(), "token * 10").unwrap();
        let src = flow
            .add_actor(&root(), "Src", SourceActor::counting(1..4))
            .unwrap();
        let times = flow.add_actor(&root(), "Times", script).unwrap();
        let last = flow
            .add_actor(&root(), "Last", SetVariableActor::new("last"))
            .unwrap();
        let (collector, handle) = CollectorActor::new();
        let sink = flow.add_actor(&root(), "Sink", collector).unwrap();
        flow.add_edge(src, times).unwrap();
        flow.add_edge(times, last).unwrap();
        flow.add_edge(last, sink).unwrap();

        let outcome = flow.run(&NoHooks).unwrap();
        assert_eq!(outcome, FlowOutcome::Completed { executions: 10 });
        assert_eq!(
            handle.tokens(),
            vec![Token::new(10), Token::new(20), Token::new(30)]
        );
        assert_eq!(flow.variables().get("last").as_deref(), Some("30"));
    }

    #[test]
    fn test_cancelled_hook_stops_flow() {
        let mut flow = Flow::new("Flow");
        let src = flow
            .add_actor(&root(), "Src", SourceActor::counting(0..3))
            .unwrap();
        let (collector, handle) = CollectorActor::new();
        let sink = flow.add_actor(&root(), "Sink", collector).unwrap();
        flow.add_edge(src, sink).unwrap();

        let hooks = RecordingHooks {
            cancel_at: Some((LifecycleStage::PreExecute, "Flow.Sink".to_string())),
            ..Default::default()
        };
        let outcome = flow.run(&hooks).unwrap();
        assert_eq!(outcome, FlowOutcome::Stopped("test".to_string()));
        assert!(handle.is_empty());
    }

    #[test]
    fn test_actor_failure_is_reported() {
        let mut flow = Flow::new("Flow");
        let script = ScriptActor::new(flow.engine(), "token + missing_fn()").unwrap();
        let src = flow
            .add_actor(&root(), "Src", SourceActor::counting(0..1))
            .unwrap();
        let bad = flow.add_actor(&root(), "Bad", script).unwrap();
        flow.add_edge(src, bad).unwrap();

        let err = flow.run(&NoHooks).unwrap_err();
        assert!(matches!(err, FlowDebugError::Actor { ref path, .. } if path == "Flow.Bad"));
    }

    #[test]
    fn test_groups_nest_paths() {
        let mut flow = Flow::new("Flow");
        let branch = flow.add_group(&root(), "Branch", None).unwrap();
        let id = flow.add_actor(&branch, "Leaf", PassthroughActor::new()).unwrap();
        assert_eq!(flow.actor_path(id).unwrap().to_string(), "Flow.Branch.Leaf");
        assert_eq!(
            flow.find_actor(&ActorPath::parse("Flow.Branch.Leaf").unwrap()),
            Some(id)
        );
    }
}
