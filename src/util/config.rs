//! Configuration file support.
//!
//! Two locations are read:
//! - Global: `~/.footprints/config.toml` - user-wide defaults
//! - Project: `.footprints/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{priority, Context, PrioritySet};
use crate::ops::catalog::convert_value;
use crate::resolver::{AliasPolicy, AmbiguityPolicy, ResolveOptions};

/// footprints configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution behaviour
    pub resolve: ResolveConfig,

    /// Ambient context values used by `only` rules
    pub defaults: IndexMap<String, toml::Value>,

    /// Priority level ordering
    pub priorities: PrioritiesConfig,
}

/// When to print the resolution report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    #[default]
    OnError,
    Always,
    Never,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// `warn` (default) or `error`
    pub ambiguity: Option<AmbiguityPolicy>,

    /// `canonical` (default) or `reject`
    pub alias_conflict: Option<AliasPolicy>,

    /// `on-error` (default), `always` or `never`
    pub report: Option<ReportMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritiesConfig {
    /// Replacement level list, lowest first
    pub levels: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or is broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.resolve.ambiguity.is_some() {
            self.resolve.ambiguity = other.resolve.ambiguity;
        }
        if other.resolve.alias_conflict.is_some() {
            self.resolve.alias_conflict = other.resolve.alias_conflict;
        }
        if other.resolve.report.is_some() {
            self.resolve.report = other.resolve.report;
        }

        // defaults merge key by key
        self.defaults.extend(other.defaults);

        if other.priorities.levels.is_some() {
            self.priorities.levels = other.priorities.levels;
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            alias_policy: self.resolve.alias_conflict.unwrap_or_default(),
            ambiguity: self.resolve.ambiguity.unwrap_or_default(),
        }
    }

    pub fn report_mode(&self) -> ReportMode {
        self.resolve.report.unwrap_or_default()
    }

    /// The ambient context built from `[defaults]`.
    pub fn context(&self) -> Context {
        self.defaults
            .iter()
            .map(|(k, v)| (k.clone(), convert_value(v)))
            .collect()
    }

    /// The priority set described by `[priorities]`, if any.
    pub fn priority_set(&self) -> Option<PrioritySet> {
        self.priorities.levels.as_ref().map(PrioritySet::with_levels)
    }

    /// Replace the process-wide priority levels when `[priorities]` says so.
    pub fn apply_priorities(&self) {
        if let Some(set) = self.priority_set() {
            tracing::debug!("priority levels from config: {}", set.levels().join(" < "));
            *priority::top_mut() = set;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.footprints/config.toml)
/// 2. Global config (~/.footprints/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.footprints).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".footprints"))
}

/// Get the global config path (~/.footprints/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.footprints/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".footprints").join("config.toml")
}
