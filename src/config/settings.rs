//! Controller settings
//!
//! Settings that shape how the controller and its control bridge behave,
//! independent of which breakpoints are configured.

use crate::types::ViewKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default `tracing` filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,flowdebug_rs=debug";

/// Default capacity of the command and event channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Settings for the execution controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Views requested on every block, merged with each breakpoint's own
    pub views: BTreeSet<ViewKind>,

    /// Start with step mode armed
    pub step_mode: bool,

    /// Capacity of the command and event channels
    pub channel_capacity: usize,

    /// `tracing` filter directive used by the console host
    pub log_filter: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            views: BTreeSet::new(),
            step_mode: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ControllerSettings {
    /// Channel capacity, never zero (a zero-capacity channel would block).
    pub fn effective_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ControllerSettings::default();
        assert!(settings.views.is_empty());
        assert!(!settings.step_mode);
        assert_eq!(settings.effective_capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let settings = ControllerSettings {
            channel_capacity: 0,
            ..Default::default()
        };
        assert_eq!(settings.effective_capacity(), 1);
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: ControllerSettings =
            serde_json::from_str(r#"{"views": ["Variables"], "step_mode": true}"#).unwrap();
        assert!(settings.step_mode);
        assert!(settings.views.contains(&ViewKind::Variables));
        assert_eq!(settings.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }
}
