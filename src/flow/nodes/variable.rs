//! SetVariableActor: stores the token text in a flow variable.
//!
//! The token is forwarded unchanged, so the actor can sit in the middle of
//! a chain.

use crate::error::Result;
use crate::flow::node::{ActorContext, ActorLogic};
use crate::types::Token;

pub struct SetVariableActor {
    name: String,
}

impl SetVariableActor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn variable_name(&self) -> &str {
        &self.name
    }
}

impl ActorLogic for SetVariableActor {
    fn kind(&self) -> &str {
        "SetVariable"
    }

    fn execute(&mut self, input: Option<Token>, ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        if let Some(token) = &input {
            ctx.variables.set(self.name.clone(), token.as_text());
        }
        Ok(input.into_iter().collect())
    }
}
