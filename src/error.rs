//! Error handling for the flow debugger
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for flowdebug-rs operations
#[derive(Error, Debug)]
pub enum FlowDebugError {
    /// Errors related to Rhai expression compilation or evaluation
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A full actor name that cannot be turned into a path
    #[error("Invalid actor path: '{0}'")]
    InvalidActorPath(String),

    /// Breakpoint index outside the registry
    #[error("Breakpoint index {index} out of range (registry holds {len})")]
    BreakpointIndex { index: usize, len: usize },

    /// The step-mode sentinel already lives at another index
    #[error("Step-mode breakpoint already registered at index {existing}")]
    DuplicateStepSentinel { existing: usize },

    /// A breakpoint condition failed to evaluate
    #[error("Condition error: {0}")]
    Condition(String),

    /// An actor failed while executing
    #[error("Actor '{path}' failed: {message}")]
    Actor { path: String, message: String },

    /// Errors in the flow graph structure
    #[error("Flow graph error: {0}")]
    Graph(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowDebugError>,
    },
}

impl FlowDebugError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowDebugError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        FlowDebugError::Script(err.to_string())
    }
}

impl From<rhai::ParseError> for FlowDebugError {
    fn from(err: rhai::ParseError) -> Self {
        FlowDebugError::Script(err.to_string())
    }
}

/// Result type alias for flowdebug-rs operations
pub type Result<T> = std::result::Result<T, FlowDebugError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FlowDebugError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FlowDebugError::from_rhai_error(e).with_context(f()))
    }
}
