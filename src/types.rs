//! Core data types for flowdebug-rs
//!
//! This module contains the fundamental data structures shared by the
//! breakpoint engine and the flow runtime.
//!
//! # Main Types
//!
//! - [`ActorPath`] - Segment-based full name of an actor in the flow tree
//! - [`LifecycleStage`] - The six hook points of one actor invocation
//! - [`HookFlags`] - Which hooks a breakpoint reacts to
//! - [`Token`] - Opaque payload travelling between actors
//! - [`ViewKind`] / [`Watch`] - What the operator gets shown on a block
//! - [`Variables`] - Named flow variables shared across actors
//!
//! # Paths
//!
//! Actor paths compare segment by segment, never as raw strings, so
//! `Flow.Branch` is an ancestor of `Flow.Branch.Sub` but not of
//! `Flow.BranchOther`.

use crate::error::{FlowDebugError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Full name of an actor, split into its path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorPath {
    segments: Vec<String>,
}

impl ActorPath {
    /// Parse a full name delimited by `.` or `/`.
    pub fn parse(full_name: &str) -> Result<Self> {
        let trimmed = full_name.trim();
        if trimmed.is_empty() {
            return Err(FlowDebugError::InvalidActorPath(full_name.to_string()));
        }

        let segments: Vec<String> = trimmed
            .split(['.', '/'])
            .map(|s| s.trim().to_string())
            .collect();

        if segments.iter().any(|s| s.is_empty()) {
            return Err(FlowDebugError::InvalidActorPath(full_name.to_string()));
        }

        Ok(Self { segments })
    }

    /// Path consisting of a single root segment.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Path of a direct child of this path.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Path of the enclosing actor, `None` for a root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment (the actor's own name).
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True if `other` equals this path or lies below it.
    pub fn is_ancestor_or_self_of(&self, other: &ActorPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for ActorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for ActorPath {
    type Err = FlowDebugError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ActorPath {
    type Error = FlowDebugError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ActorPath> for String {
    fn from(path: ActorPath) -> Self {
        path.to_string()
    }
}

/// The six lifecycle hooks of one actor invocation, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleStage {
    PreInput,
    PostInput,
    PreExecute,
    PostExecute,
    PreOutput,
    PostOutput,
}

impl LifecycleStage {
    /// All stages in the order they are visited.
    pub const ALL: [LifecycleStage; 6] = [
        LifecycleStage::PreInput,
        LifecycleStage::PostInput,
        LifecycleStage::PreExecute,
        LifecycleStage::PostExecute,
        LifecycleStage::PreOutput,
        LifecycleStage::PostOutput,
    ];

    /// Hook method name as shown to the operator.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleStage::PreInput => "preInput",
            LifecycleStage::PostInput => "postInput",
            LifecycleStage::PreExecute => "preExecute",
            LifecycleStage::PostExecute => "postExecute",
            LifecycleStage::PreOutput => "preOutput",
            LifecycleStage::PostOutput => "postOutput",
        }
    }

    /// Whether the hook receives the token (pre-input and post-output).
    pub fn carries_token(&self) -> bool {
        matches!(self, LifecycleStage::PreInput | LifecycleStage::PostOutput)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One flag per lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HookFlags {
    pub on_pre_input: bool,
    pub on_post_input: bool,
    pub on_pre_execute: bool,
    pub on_post_execute: bool,
    pub on_pre_output: bool,
    pub on_post_output: bool,
}

impl HookFlags {
    /// No hooks enabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every hook enabled.
    pub fn all() -> Self {
        Self {
            on_pre_input: true,
            on_post_input: true,
            on_pre_execute: true,
            on_post_execute: true,
            on_pre_output: true,
            on_post_output: true,
        }
    }

    /// Only the given hook enabled.
    pub fn only(stage: LifecycleStage) -> Self {
        let mut flags = Self::none();
        flags.set(stage, true);
        flags
    }

    pub fn for_stage(&self, stage: LifecycleStage) -> bool {
        self.as_array()[stage.index()]
    }

    pub fn set(&mut self, stage: LifecycleStage, enabled: bool) {
        let slot = match stage {
            LifecycleStage::PreInput => &mut self.on_pre_input,
            LifecycleStage::PostInput => &mut self.on_post_input,
            LifecycleStage::PreExecute => &mut self.on_pre_execute,
            LifecycleStage::PostExecute => &mut self.on_post_execute,
            LifecycleStage::PreOutput => &mut self.on_pre_output,
            LifecycleStage::PostOutput => &mut self.on_post_output,
        };
        *slot = enabled;
    }

    pub fn any(&self) -> bool {
        self.as_array().iter().any(|&b| b)
    }

    fn as_array(&self) -> [bool; 6] {
        [
            self.on_pre_input,
            self.on_post_input,
            self.on_pre_execute,
            self.on_post_execute,
            self.on_pre_output,
            self.on_post_output,
        ]
    }
}

/// Opaque payload passed between actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub payload: serde_json::Value,
}

impl Token {
    pub fn new(payload: impl Into<serde_json::Value>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Text form used for variables and display (strings without quotes).
    pub fn as_text(&self) -> String {
        match &self.payload {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}

/// External displays that can be raised when a breakpoint fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewKind {
    Source,
    Expressions,
    Variables,
    Storage,
    InspectToken,
    Breakpoints,
}

impl ViewKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ViewKind::Source => "Source",
            ViewKind::Expressions => "Expressions",
            ViewKind::Variables => "Variables",
            ViewKind::Storage => "Storage",
            ViewKind::InspectToken => "Inspect token",
            ViewKind::Breakpoints => "Breakpoints",
        }
    }
}

/// How a watch expression gets evaluated and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WatchKind {
    /// Name of a flow variable
    #[default]
    Variable,
    Boolean,
    Numeric,
    String,
}

/// A watch expression shown to the operator when a breakpoint fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    pub expression: String,
    #[serde(default)]
    pub kind: WatchKind,
}

impl Watch {
    pub fn new(expression: impl Into<String>, kind: WatchKind) -> Self {
        Self {
            expression: expression.into(),
            kind,
        }
    }
}

/// Named string variables shared by the actors of one flow.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.read().ok().and_then(|vars| vars.get(name).cloned())
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut vars) = self.inner.write() {
            vars.insert(name.into(), value.into());
        }
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.inner.write().ok().and_then(|mut vars| vars.remove(name))
    }

    /// Copy of all variables at this moment.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .map(|vars| vars.clone())
            .unwrap_or_default()
    }
}
