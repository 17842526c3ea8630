//! Mock construction helpers

use crossbeam_channel::{bounded, Receiver, Sender};
use flowdebug_rs::{
    debug::{BlockedState, NotificationSink},
    types::{ActorPath, LifecycleStage, ViewKind},
};
use mockall::mock;
use std::collections::BTreeSet;
use std::sync::Mutex;

mock! {
    pub Sink {}

    impl NotificationSink for Sink {
        fn notify(&self, state: &BlockedState, views: &BTreeSet<ViewKind>);
    }
}

/// One notification as seen by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub actor_path: ActorPath,
    pub stage: LifecycleStage,
    pub breakpoint: String,
    pub views: BTreeSet<ViewKind>,
}

/// Sink that records every notification
#[derive(Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, state: &BlockedState, views: &BTreeSet<ViewKind>) {
        self.seen.lock().unwrap().push(Notification {
            actor_path: state.actor_path.clone(),
            stage: state.stage,
            breakpoint: state.breakpoint.describe(),
            views: views.clone(),
        });
    }
}

/// Sink that forwards the blocked actor's path to a channel, like a UI queue
pub struct ForwardingSink {
    tx: Sender<ActorPath>,
}

impl ForwardingSink {
    pub fn channel() -> (Self, Receiver<ActorPath>) {
        let (tx, rx) = bounded(16);
        (Self { tx }, rx)
    }
}

impl NotificationSink for ForwardingSink {
    fn notify(&self, state: &BlockedState, _views: &BTreeSet<ViewKind>) {
        let _ = self.tx.try_send(state.actor_path.clone());
    }
}

/// Create test channels with default size
pub fn create_test_channels<T, U>() -> (Sender<T>, Receiver<T>, Sender<U>, Receiver<U>) {
    let (tx1, rx1) = bounded(16);
    let (tx2, rx2) = bounded(16);
    (tx1, rx1, tx2, rx2)
}
