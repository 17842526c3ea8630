//! PassthroughActor: forwards its input unchanged.

use crate::error::Result;
use crate::flow::node::{ActorContext, ActorLogic};
use crate::types::Token;

#[derive(Debug, Default)]
pub struct PassthroughActor;

impl PassthroughActor {
    pub fn new() -> Self {
        Self
    }
}

impl ActorLogic for PassthroughActor {
    fn kind(&self) -> &str {
        "Passthrough"
    }

    fn execute(&mut self, input: Option<Token>, _ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        Ok(input.into_iter().collect())
    }
}
