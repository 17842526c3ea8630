//! Rhai expressions for breakpoint conditions, watches and script actors.
//!
//! ## Scope Variables
//!
//! Every expression evaluated against a hook sees:
//!
//! - `actor` - Full path of the actor, e.g. `"Flow.Branch.Sub"`
//! - `actor_name` - Last path segment
//! - `hook` - Hook name (`"preInput"`, `"postExecute"`, ...)
//! - `token` - Token payload converted to a Rhai value, `()` if the hook has none
//! - `has_token` - Whether `token` is set
//! - `vars` - Map of flow variables (string values)
//!
//! ## Helper Functions
//!
//! - `is_under(path, root)` - Segment-exact ancestor-or-self test on actor paths
//! - `to_number(text)` - Parse a variable value, NaN if it is not numeric
//!
//! ## Examples
//!
//! Break when a counter variable crosses a threshold:
//! ```rhai
//! to_number(vars["count"]) > 10.0
//! ```
//!
//! Break on even tokens inside one branch:
//! ```rhai
//! has_token && is_under(actor, "Flow.Branch") && token % 2 == 0
//! ```

mod engine;

pub use engine::{ExpressionCondition, ScriptEngine};

use crate::error::{FlowDebugError, Result};
use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A compiled expression, cheap to clone and share between threads.
#[derive(Clone)]
pub struct CompiledExpression {
    ast: Arc<AST>,
    source: String,
    name: String,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Compiled expressions keyed by source text.
#[derive(Default)]
pub struct ExpressionCache {
    cache: HashMap<String, CompiledExpression>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached expression or compile and cache it
    pub fn get_or_compile(
        &mut self,
        engine: &Engine,
        name: &str,
        source: &str,
    ) -> Result<CompiledExpression> {
        if let Some(compiled) = self.cache.get(source) {
            return Ok(compiled.clone());
        }

        let ast = engine
            .compile_expression(source)
            .map_err(|e| FlowDebugError::Script(format!("Compilation error in '{}': {}", name, e)))?;

        let compiled = CompiledExpression {
            ast: Arc::new(ast),
            source: source.to_string(),
            name: name.to_string(),
        };

        self.cache.insert(source.to_string(), compiled.clone());
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Thread-safe cache wrapper
pub type SharedExpressionCache = Arc<RwLock<ExpressionCache>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_reuses_compiled_expression() {
        let engine = Engine::new();
        let mut cache = ExpressionCache::new();
        let a = cache.get_or_compile(&engine, "a", "1 + 1 == 2").unwrap();
        let b = cache.get_or_compile(&engine, "b", "1 + 1 == 2").unwrap();
        assert_eq!(a.source(), b.source());
        assert_eq!(b.name(), "a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_statements_rejected() {
        let engine = Engine::new();
        let mut cache = ExpressionCache::new();
        assert!(cache.get_or_compile(&engine, "loop", "let x = 1; x").is_err());
        assert!(cache.is_empty());
    }
}
