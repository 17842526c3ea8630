//! Test data builders for flows and breakpoints

use flowdebug_rs::{
    debug::Breakpoint,
    flow::{
        nodes::{CollectorActor, CollectorHandle, PassthroughActor, SourceActor},
        ActorId, Flow,
    },
    types::{ActorPath, HookFlags, LifecycleStage},
    ScopeRestriction,
};

pub fn path(full_name: &str) -> ActorPath {
    ActorPath::parse(full_name).unwrap()
}

/// Builder for a linear flow `Src -> stage... -> Sink` under the root `Flow`
pub struct FlowBuilder {
    tokens: i64,
    stages: Vec<String>,
    group: Option<(String, Option<ScopeRestriction>)>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self {
            tokens: 1,
            stages: Vec::new(),
            group: None,
        }
    }

    /// Number of tokens the source emits (`0..n`)
    pub fn tokens(mut self, n: i64) -> Self {
        self.tokens = n;
        self
    }

    /// Append a passthrough stage
    pub fn stage(mut self, name: &str) -> Self {
        self.stages.push(name.to_string());
        self
    }

    /// Place the stages inside a group, optionally restricting its sub-tree
    pub fn grouped(mut self, name: &str, scope: Option<ScopeRestriction>) -> Self {
        self.group = Some((name.to_string(), scope));
        self
    }

    pub fn build(self) -> (Flow, CollectorHandle) {
        let mut flow = Flow::new("Flow");
        let root = flow.root_path().clone();
        let stage_parent = match self.group {
            Some((name, scope)) => flow.add_group(&root, &name, scope).unwrap(),
            None => root.clone(),
        };

        let mut previous: ActorId = flow
            .add_actor(&root, "Src", SourceActor::counting(0..self.tokens))
            .unwrap();
        for name in &self.stages {
            let id = flow
                .add_actor(&stage_parent, name, PassthroughActor::new())
                .unwrap();
            flow.add_edge(previous, id).unwrap();
            previous = id;
        }

        let (collector, handle) = CollectorActor::new();
        let sink = flow.add_actor(&root, "Sink", collector).unwrap();
        flow.add_edge(previous, sink).unwrap();
        (flow, handle)
    }
}

/// Builder for breakpoints; defaults to "any actor, pre-execute only"
pub struct BreakpointBuilder {
    paths: Vec<ActorPath>,
    hooks: HookFlags,
    scope: ScopeRestriction,
    disabled: bool,
    one_off: bool,
}

impl BreakpointBuilder {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            hooks: HookFlags::only(LifecycleStage::PreExecute),
            scope: ScopeRestriction::Unrestricted,
            disabled: false,
            one_off: false,
        }
    }

    pub fn at(mut self, full_name: &str) -> Self {
        self.paths.push(path(full_name));
        self
    }

    pub fn hook(mut self, stage: LifecycleStage) -> Self {
        self.hooks = HookFlags::only(stage);
        self
    }

    pub fn hooks(mut self, hooks: HookFlags) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn within(mut self, root: &str) -> Self {
        self.scope = ScopeRestriction::subtree(path(root));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn one_off(mut self) -> Self {
        self.one_off = true;
        self
    }

    pub fn build(self) -> Breakpoint {
        let breakpoint = if self.paths.is_empty() {
            Breakpoint::any_actor()
        } else {
            Breakpoint::for_paths(self.paths)
        };
        breakpoint
            .with_hooks(self.hooks)
            .with_scope(self.scope)
            .with_disabled(self.disabled)
            .with_one_off(self.one_off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_builder() {
        let (flow, handle) = FlowBuilder::new().stage("A").stage("B").build();
        assert_eq!(flow.actor_count(), 4);
        assert_eq!(flow.edges().len(), 3);
        assert!(handle.is_empty());
    }

    #[test]
    fn test_breakpoint_builder() {
        let bp = BreakpointBuilder::new()
            .at("Flow.A")
            .hook(LifecycleStage::PostOutput)
            .disabled()
            .build();
        assert!(bp.is_disabled());
        assert!(bp.hooks().for_stage(LifecycleStage::PostOutput));
        assert!(!bp.hooks().for_stage(LifecycleStage::PreExecute));
    }
}
