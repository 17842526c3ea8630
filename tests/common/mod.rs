//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use flowdebug_rs::debug::{BlockedState, ExecutionController};
use std::time::Duration;

/// Upper bound for anything that waits on another thread
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Short wait used to show that something does *not* happen
pub fn quiet_period() -> Duration {
    Duration::from_millis(100)
}

/// Wait for a block, failing the test on timeout
pub fn expect_block(controller: &ExecutionController) -> BlockedState {
    controller
        .wait_for_block(test_timeout())
        .expect("execution thread never blocked")
}
