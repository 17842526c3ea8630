//! Actor records of the flow tree.
//!
//! Groups and executable actors share one record type: a path, an optional
//! parent, an optional scope restriction for the sub-tree and a handle to
//! the flow's variables.

use crate::debug::hooks::Actor;
use crate::debug::scope::ScopeRestriction;
use crate::types::{ActorPath, Variables};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Position and environment of one actor or group in the flow tree.
#[derive(Debug, Clone)]
pub struct ActorInfo {
    path: ActorPath,
    parent: Option<Arc<ActorInfo>>,
    scope: Option<ScopeRestriction>,
    variables: Variables,
}

impl ActorInfo {
    /// Root of a flow tree.
    pub fn root(name: impl Into<String>, variables: Variables) -> Self {
        Self {
            path: ActorPath::root(name),
            parent: None,
            scope: None,
            variables,
        }
    }

    /// Child of `parent`, sharing its variables.
    pub fn child(parent: &Arc<ActorInfo>, name: impl Into<String>) -> Self {
        Self {
            path: parent.path.child(name),
            parent: Some(Arc::clone(parent)),
            scope: None,
            variables: parent.variables.clone(),
        }
    }

    /// Make this actor restrict breakpoints for its sub-tree.
    pub fn with_scope(mut self, scope: ScopeRestriction) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    pub fn vars(&self) -> &Variables {
        &self.variables
    }
}

impl Actor for ActorInfo {
    fn full_path(&self) -> &ActorPath {
        &self.path
    }

    fn parent(&self) -> Option<&dyn Actor> {
        self.parent.as_deref().map(|p| p as &dyn Actor)
    }

    fn scope_restriction(&self) -> Option<&ScopeRestriction> {
        self.scope.as_ref()
    }

    fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name)
    }

    fn variables(&self) -> BTreeMap<String, String> {
        self.variables.snapshot()
    }
}
