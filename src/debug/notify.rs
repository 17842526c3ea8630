//! What gets reported when an execution thread blocks.

use crate::debug::breakpoint::Breakpoint;
use crate::types::{ActorPath, LifecycleStage, Token, ViewKind};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Context captured at the moment an execution thread blocked.
#[derive(Debug, Clone)]
pub struct BlockedState {
    /// The breakpoint that caused the block.
    pub breakpoint: Arc<Breakpoint>,
    pub actor_path: ActorPath,
    pub stage: LifecycleStage,
    /// Only set on hooks that carry a token.
    pub token: Option<Token>,
    /// Name (or id) of the blocked execution thread.
    pub thread: String,
    pub blocked_at: DateTime<Utc>,
    /// Flow variables visible to the actor when it blocked.
    pub variables: BTreeMap<String, String>,
}

impl BlockedState {
    pub fn hook_name(&self) -> &'static str {
        self.stage.name()
    }
}

/// Receiver of "breakpoint reached" notifications.
///
/// Called on the execution thread right before it parks, exactly once per
/// block. The call is made under the controller's state lock, at the moment
/// the block is published: a `resume` sent in response always finds the
/// thread, and nothing can release it before the notification went out.
///
/// Implementations must hand the work off and return promptly, and must not
/// call back into the controller.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, state: &BlockedState, views: &BTreeSet<ViewKind>);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, state: &BlockedState, _views: &BTreeSet<ViewKind>) {
        tracing::trace!(
            "Blocked at {} of {} (no listener)",
            state.hook_name(),
            state.actor_path
        );
    }
}
