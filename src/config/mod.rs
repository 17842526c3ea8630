//! Configuration for flowdebug-rs
//!
//! A [`DebugConfig`] holds the controller settings and a list of
//! breakpoint descriptions. Files are read and written as TOML or JSON,
//! chosen by extension (`.json` is JSON, anything else TOML).
//!
//! # Default Location
//!
//! - **Linux**: `~/.config/dev.flowdebug.flowdebug-rs/debug.toml`
//! - **macOS**: `~/Library/Application Support/dev.flowdebug.flowdebug-rs/debug.toml`
//! - **Windows**: `%APPDATA%\dev.flowdebug.flowdebug-rs\debug.toml`
//!
//! # Example
//!
//! ```toml
//! [controller]
//! views = ["Variables"]
//!
//! [[breakpoints]]
//! hooks = { onPreExecute = true }
//! condition = { type = "Expression", expression = "has_token && token > 2" }
//! scope = { type = "SubtreeRooted", root = "Flow.Branch" }
//! ```

pub mod settings;

pub use settings::*;

use crate::debug::breakpoint::{ActorPathCondition, AnyActorCondition, Breakpoint};
use crate::debug::controller::ExecutionController;
use crate::debug::scope::ScopeRestriction;
use crate::error::{FlowDebugError, Result, ResultExt};
use crate::scripting::{ExpressionCondition, ScriptEngine};
use crate::types::{ActorPath, HookFlags, ViewKind, Watch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.flowdebug.flowdebug-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "debug.toml";

/// Current config version
pub const CONFIG_VERSION: u32 = 1;

/// Directory holding the config file
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// On-disk format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Which trigger predicate a configured breakpoint uses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConditionConfig {
    /// Fires for every actor
    #[default]
    AnyActor,
    /// Fires for the listed actor paths
    ActorPath { paths: Vec<ActorPath> },
    /// Fires when the Rhai expression evaluates to `true`
    Expression { expression: String },
}

/// Serializable description of one breakpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakpointConfig {
    pub condition: ConditionConfig,
    pub disabled: bool,
    pub one_off: bool,
    pub hooks: HookFlags,
    pub scope: ScopeRestriction,
    pub watches: Vec<Watch>,
    pub views: BTreeSet<ViewKind>,
}

impl BreakpointConfig {
    /// Build the live breakpoint; expression conditions compile here.
    pub fn build(&self, engine: &Arc<ScriptEngine>) -> Result<Breakpoint> {
        let breakpoint = match &self.condition {
            ConditionConfig::AnyActor => Breakpoint::new(AnyActorCondition),
            ConditionConfig::ActorPath { paths } => {
                Breakpoint::new(ActorPathCondition::new(paths.clone()))
            }
            ConditionConfig::Expression { expression } => {
                Breakpoint::new(ExpressionCondition::new(Arc::clone(engine), expression)?)
            }
        };

        if !self.hooks.any() {
            tracing::warn!(
                "Breakpoint '{}' has no hooks enabled and will never fire",
                breakpoint.describe()
            );
        }

        Ok(breakpoint
            .with_hooks(self.hooks)
            .with_scope(self.scope.clone())
            .with_watches(self.watches.clone())
            .with_views(self.views.iter().copied())
            .with_disabled(self.disabled)
            .with_one_off(self.one_off))
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Version for future migration support
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub controller: ControllerSettings,

    #[serde(default)]
    pub breakpoints: Vec<BreakpointConfig>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            controller: ControllerSettings::default(),
            breakpoints: Vec::new(),
        }
    }
}

impl DebugConfig {
    /// Parse config text in the given format
    pub fn from_str_as(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| FlowDebugError::Config(format!("Failed to parse TOML: {}", e))),
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| FlowDebugError::Config(format!("Failed to parse JSON: {}", e))),
        }
    }

    /// Render config text in the given format
    pub fn to_string_as(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| FlowDebugError::Serialization(e.to_string())),
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| FlowDebugError::Serialization(e.to_string())),
        }
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(FlowDebugError::from)
            .with_context(|| format!("Reading {}", path.display()))?;

        let config = Self::from_str_as(&content, ConfigFormat::from_path(path))?;
        if config.version > CONFIG_VERSION {
            tracing::warn!(
                "{} has version {}, newer than supported {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        tracing::debug!(
            "Loaded {} breakpoint(s) from {}",
            config.breakpoints.len(),
            path.display()
        );
        Ok(config)
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save to a file, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(FlowDebugError::from)
                .context("Creating config directory")?;
        }

        let content = self.to_string_as(ConfigFormat::from_path(path))?;
        std::fs::write(path, content)
            .map_err(FlowDebugError::from)
            .with_context(|| format!("Writing {}", path.display()))
    }

    /// Build every configured breakpoint, in order
    pub fn build_breakpoints(&self, engine: &Arc<ScriptEngine>) -> Result<Vec<Breakpoint>> {
        self.breakpoints
            .iter()
            .enumerate()
            .map(|(i, bp)| {
                bp.build(engine)
                    .with_context(|| format!("Breakpoint #{}", i))
            })
            .collect()
    }

    /// Install settings and breakpoints on a controller; returns how many were added.
    pub fn apply_to(
        &self,
        controller: &ExecutionController,
        engine: &Arc<ScriptEngine>,
    ) -> Result<usize> {
        let breakpoints = self.build_breakpoints(engine)?;
        let count = breakpoints.len();
        for bp in breakpoints {
            controller.registry().add(bp);
        }
        controller.set_global_views(self.controller.views.clone());
        if self.controller.step_mode {
            controller.toggle_step_mode(true);
        }
        Ok(count)
    }
}
