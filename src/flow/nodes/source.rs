//! SourceActor: emits a fixed list of tokens once per run.

use crate::error::Result;
use crate::flow::node::{ActorContext, ActorLogic};
use crate::types::Token;

pub struct SourceActor {
    tokens: Vec<Token>,
}

impl SourceActor {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Source emitting the integers in `range`.
    pub fn counting(range: std::ops::Range<i64>) -> Self {
        Self::new(range.map(Token::new))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl ActorLogic for SourceActor {
    fn kind(&self) -> &str {
        "Source"
    }

    fn is_source(&self) -> bool {
        true
    }

    fn execute(&mut self, _input: Option<Token>, _ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        Ok(self.tokens.clone())
    }
}
