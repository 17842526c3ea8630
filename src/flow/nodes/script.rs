//! ScriptActor: transforms each token with a Rhai expression.
//!
//! The expression sees `token` and `vars` (see [`crate::scripting`]) and its
//! result becomes the output token. A `()` result drops the token.

use crate::error::{Result, ResultExt};
use crate::flow::node::{ActorContext, ActorLogic};
use crate::scripting::{CompiledExpression, ScriptEngine};
use crate::types::Token;

pub struct ScriptActor {
    expr: CompiledExpression,
}

impl ScriptActor {
    /// Compile `source` up front so syntax errors surface at build time.
    pub fn new(engine: &ScriptEngine, source: &str) -> Result<Self> {
        let expr = engine
            .compile("script actor", source)
            .context("Compiling script actor")?;
        Ok(Self { expr })
    }

    pub fn source(&self) -> &str {
        self.expr.source()
    }
}

impl ActorLogic for ScriptActor {
    fn kind(&self) -> &str {
        "Script"
    }

    fn execute(&mut self, input: Option<Token>, ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        let Some(token) = input else {
            return Ok(Vec::new());
        };
        let out = ctx
            .engine
            .transform(&self.expr, ctx.path, &token, &ctx.variables.snapshot())?;
        if out.payload.is_null() {
            tracing::trace!("{} dropped token {}", ctx.path, token);
            return Ok(Vec::new());
        }
        Ok(vec![out])
    }
}
