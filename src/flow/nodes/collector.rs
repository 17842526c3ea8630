//! CollectorActor: sink that records every token it receives.

use crate::error::Result;
use crate::flow::node::{ActorContext, ActorLogic};
use crate::types::Token;
use std::sync::{Arc, Mutex, PoisonError};

/// Read side of a collector, usable after the flow moved to another thread.
#[derive(Debug, Clone, Default)]
pub struct CollectorHandle {
    tokens: Arc<Mutex<Vec<Token>>>,
}

impl CollectorHandle {
    pub fn tokens(&self) -> Vec<Token> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct CollectorActor {
    handle: CollectorHandle,
}

impl CollectorActor {
    pub fn new() -> (Self, CollectorHandle) {
        let handle = CollectorHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl ActorLogic for CollectorActor {
    fn kind(&self) -> &str {
        "Collector"
    }

    fn execute(&mut self, input: Option<Token>, _ctx: &ActorContext<'_>) -> Result<Vec<Token>> {
        if let Some(token) = input {
            self.handle
                .tokens
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(token);
        }
        Ok(Vec::new())
    }
}
