//! Rhai engine wrapper
//!
//! One [`ScriptEngine`] is shared (behind an `Arc`) by every expression
//! condition, the watch evaluator and the script actors of a flow.

use crate::debug::breakpoint::BreakpointCondition;
use crate::debug::hooks::HookContext;
use crate::debug::notify::BlockedState;
use crate::error::{FlowDebugError, Result, ResultExt};
use crate::scripting::{CompiledExpression, ExpressionCache, SharedExpressionCache};
use crate::types::{ActorPath, LifecycleStage, Token, Watch, WatchKind};
use rhai::{Dynamic, Engine, Map, Scope};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Inputs an expression is evaluated against.
struct ScopeInputs<'a> {
    path: &'a ActorPath,
    stage: Option<LifecycleStage>,
    token: Option<&'a Token>,
    variables: &'a BTreeMap<String, String>,
}

/// The expression engine with safety limits applied.
pub struct ScriptEngine {
    engine: Engine,
    cache: SharedExpressionCache,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(RwLock::new(ExpressionCache::new())))
    }

    pub fn with_cache(cache: SharedExpressionCache) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);
        Self { engine, cache }
    }

    /// Safety limits and helper functions
    fn configure_engine(engine: &mut Engine) {
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        engine.register_fn("is_under", |path: &str, root: &str| -> bool {
            match (ActorPath::parse(path), ActorPath::parse(root)) {
                (Ok(path), Ok(root)) => root.is_ancestor_or_self_of(&path),
                _ => false,
            }
        });
        engine.register_fn("to_number", |text: &str| -> f64 {
            text.trim().parse::<f64>().unwrap_or(f64::NAN)
        });
    }

    /// Compile an expression (cached by source).
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledExpression> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| FlowDebugError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, name, source)
    }

    /// Validate an expression without caching it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile_expression(source)
            .map(|_| ())
            .map_err(|e| FlowDebugError::Script(format!("Validation error: {}", e)))
    }

    fn build_scope(inputs: &ScopeInputs<'_>) -> Scope<'static> {
        let mut scope = Scope::new();
        scope.push_constant("actor", inputs.path.to_string());
        scope.push_constant("actor_name", inputs.path.name().to_string());
        scope.push_constant(
            "hook",
            inputs.stage.map(|s| s.name()).unwrap_or_default().to_string(),
        );

        let token = match inputs.token {
            Some(token) => rhai::serde::to_dynamic(&token.payload).unwrap_or_else(|e| {
                tracing::debug!("Token not representable in scripts: {}", e);
                Dynamic::from(token.as_text())
            }),
            None => Dynamic::UNIT,
        };
        scope.push_constant("has_token", inputs.token.is_some());
        scope.push_dynamic("token", token);

        let vars: Map = inputs
            .variables
            .iter()
            .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
            .collect();
        scope.push_constant("vars", vars);
        scope
    }

    fn eval_dynamic(&self, expr: &CompiledExpression, inputs: &ScopeInputs<'_>) -> Result<Dynamic> {
        let mut scope = Self::build_scope(inputs);
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, expr.ast())
            .with_context(|| format!("Evaluating '{}'", expr.source()))
    }

    /// Evaluate a boolean expression for one hook.
    pub fn eval_bool(&self, expr: &CompiledExpression, ctx: &HookContext<'_>) -> Result<bool> {
        let variables = ctx.actor.variables();
        let inputs = ScopeInputs {
            path: ctx.path(),
            stage: Some(ctx.stage),
            token: ctx.token,
            variables: &variables,
        };
        let value = self.eval_dynamic(expr, &inputs)?;
        value.as_bool().map_err(|type_name| {
            FlowDebugError::Condition(format!(
                "'{}' returned {} instead of a boolean",
                expr.source(),
                type_name
            ))
        })
    }

    /// Render a watch against the context of a blocked thread.
    pub fn evaluate_watch(&self, watch: &Watch, state: &BlockedState) -> Result<String> {
        if watch.kind == WatchKind::Variable {
            return state
                .variables
                .get(watch.expression.trim())
                .cloned()
                .ok_or_else(|| {
                    FlowDebugError::Script(format!("Unknown variable '{}'", watch.expression))
                });
        }

        let expr = self.compile("watch", &watch.expression)?;
        let inputs = ScopeInputs {
            path: &state.actor_path,
            stage: Some(state.stage),
            token: state.token.as_ref(),
            variables: &state.variables,
        };
        let value = self.eval_dynamic(&expr, &inputs)?;

        match watch.kind {
            WatchKind::Boolean => value
                .as_bool()
                .map(|b| b.to_string())
                .map_err(|t| FlowDebugError::Script(format!("Expected boolean, got {}", t))),
            WatchKind::Numeric => {
                if let Ok(f) = value.as_float() {
                    Ok(f.to_string())
                } else if let Ok(i) = value.as_int() {
                    Ok(i.to_string())
                } else {
                    Err(FlowDebugError::Script(format!(
                        "Expected number, got {}",
                        value.type_name()
                    )))
                }
            }
            WatchKind::String | WatchKind::Variable => Ok(value.to_string()),
        }
    }

    /// Run a transform expression on a token (`token` and `vars` in scope).
    pub fn transform(
        &self,
        expr: &CompiledExpression,
        path: &ActorPath,
        token: &Token,
        variables: &BTreeMap<String, String>,
    ) -> Result<Token> {
        let inputs = ScopeInputs {
            path,
            stage: None,
            token: Some(token),
            variables,
        };
        let value = self.eval_dynamic(expr, &inputs)?;
        let payload: serde_json::Value = rhai::serde::from_dynamic(&value)
            .map_err(|e| FlowDebugError::Serialization(e.to_string()))?;
        Ok(Token::new(payload))
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn cache(&self) -> &SharedExpressionCache {
        &self.cache
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cache.read().map(|c| c.len()).ok())
            .finish()
    }
}

/// Breakpoint condition backed by a boolean Rhai expression.
#[derive(Debug, Clone)]
pub struct ExpressionCondition {
    engine: Arc<ScriptEngine>,
    expr: CompiledExpression,
}

impl ExpressionCondition {
    /// Compile `source`; malformed expressions are rejected here.
    pub fn new(engine: Arc<ScriptEngine>, source: &str) -> Result<Self> {
        let expr = engine.compile("condition", source)?;
        Ok(Self { engine, expr })
    }

    pub fn source(&self) -> &str {
        self.expr.source()
    }
}

impl BreakpointCondition for ExpressionCondition {
    fn describe(&self) -> String {
        format!("expression: {}", self.expr.source())
    }

    fn evaluate(&self, ctx: &HookContext<'_>) -> Result<bool> {
        self.engine.eval_bool(&self.expr, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::breakpoint::Breakpoint;
    use crate::debug::hooks::Actor;
    use crate::types::HookFlags;

    struct VarActor {
        path: ActorPath,
        vars: BTreeMap<String, String>,
    }

    impl Actor for VarActor {
        fn full_path(&self) -> &ActorPath {
            &self.path
        }

        fn parent(&self) -> Option<&dyn Actor> {
            None
        }

        fn variables(&self) -> BTreeMap<String, String> {
            self.vars.clone()
        }
    }

    fn actor(path: &str, vars: &[(&str, &str)]) -> VarActor {
        VarActor {
            path: ActorPath::parse(path).unwrap(),
            vars: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn eval(source: &str, ctx: &HookContext<'_>) -> Result<bool> {
        let engine = ScriptEngine::new();
        let expr = engine.compile("test", source)?;
        engine.eval_bool(&expr, ctx)
    }

    #[test]
    fn test_scope_variables() {
        let a = actor("Flow.Branch.Sub", &[("count", "12")]);
        let token = Token::new(4);
        let ctx = HookContext::new(&a, LifecycleStage::PreInput, Some(&token));
        assert!(eval(r#"actor == "Flow.Branch.Sub" && actor_name == "Sub""#, &ctx).unwrap());
        assert!(eval(r#"hook == "preInput" && has_token && token == 4"#, &ctx).unwrap());
        assert!(eval(r#"to_number(vars["count"]) > 10.0"#, &ctx).unwrap());
        assert!(eval(r#"is_under(actor, "Flow.Branch")"#, &ctx).unwrap());
        assert!(!eval(r#"is_under(actor, "Flow.Bran")"#, &ctx).unwrap());
    }

    #[test]
    fn test_token_absent_on_execute_hooks() {
        let a = actor("Flow.A", &[]);
        let ctx = HookContext::new(&a, LifecycleStage::PreExecute, None);
        assert!(eval(r#"!has_token && type_of(token) == "()""#, &ctx).unwrap());
    }

    #[test]
    fn test_non_boolean_result_is_error() {
        let a = actor("Flow.A", &[]);
        let ctx = HookContext::new(&a, LifecycleStage::PreExecute, None);
        assert!(matches!(eval("1 + 2", &ctx), Err(FlowDebugError::Condition(_))));
    }

    #[test]
    fn test_malformed_expression_rejected_at_construction() {
        let engine = Arc::new(ScriptEngine::new());
        assert!(ExpressionCondition::new(engine, "actor == ").is_err());
    }

    #[test]
    fn test_runtime_failure_means_no_trigger() {
        let engine = Arc::new(ScriptEngine::new());
        let condition = ExpressionCondition::new(engine, r#"vars["missing"] > 3"#).unwrap();
        let bp = Breakpoint::new(condition).with_hooks(HookFlags::all());
        let a = actor("Flow.A", &[]);
        assert!(!bp.triggers_pre_execute(&a));
    }

    #[test]
    fn test_oversized_value_is_limited() {
        let engine = ScriptEngine::new();
        let expr = engine
            .compile("huge", r#""a".pad(20000, "b").len() > 0"#)
            .unwrap();
        let a = actor("Flow.A", &[]);
        let ctx = HookContext::new(&a, LifecycleStage::PreExecute, None);
        assert!(engine.eval_bool(&expr, &ctx).is_err());
    }

    #[test]
    fn test_transform_token() {
        let engine = ScriptEngine::new();
        let expr = engine.compile("double", "token * 2").unwrap();
        let path = ActorPath::parse("Flow.Double").unwrap();
        let out = engine
            .transform(&expr, &path, &Token::new(21), &BTreeMap::new())
            .unwrap();
        assert_eq!(out, Token::new(42));
    }

    #[test]
    fn test_watches() {
        let engine = ScriptEngine::new();
        let mut variables = BTreeMap::new();
        variables.insert("count".to_string(), "3".to_string());
        let state = BlockedState {
            breakpoint: Arc::new(Breakpoint::any_actor()),
            actor_path: ActorPath::parse("Flow.A").unwrap(),
            stage: LifecycleStage::PostOutput,
            token: Some(Token::new(5)),
            thread: "test".into(),
            blocked_at: chrono::Utc::now(),
            variables,
        };

        let var = Watch::new("count", WatchKind::Variable);
        assert_eq!(engine.evaluate_watch(&var, &state).unwrap(), "3");
        let missing = Watch::new("nope", WatchKind::Variable);
        assert!(engine.evaluate_watch(&missing, &state).is_err());

        let boolean = Watch::new("token > 4", WatchKind::Boolean);
        assert_eq!(engine.evaluate_watch(&boolean, &state).unwrap(), "true");
        let numeric = Watch::new("token + 1", WatchKind::Numeric);
        assert_eq!(engine.evaluate_watch(&numeric, &state).unwrap(), "6");
        let text = Watch::new("actor + \"@\" + hook", WatchKind::String);
        assert_eq!(
            engine.evaluate_watch(&text, &state).unwrap(),
            "Flow.A@postOutput"
        );
    }
}
