//! Command implementations

pub mod attrmap;
pub mod completions;
pub mod entries;
pub mod priorities;
pub mod resolve;

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{anyhow, bail, Result};

use footprints::collector::Registry;
use footprints::ops::open_registry;
use footprints::util::config::{global_config_path, load_config, project_config_path};
use footprints::util::diagnostic::suggestions;
use footprints::util::Config;

/// Configuration and terminal settings shared by every command.
pub struct Session {
    pub config: Config,
    pub color: bool,
}

impl Session {
    /// Load config from `explicit`, or from the global and project
    /// locations.
    pub fn new(explicit: Option<&Path>, color: bool) -> Self {
        let config = match explicit {
            Some(path) => Config::load_or_default(path),
            None => {
                let cwd = std::env::current_dir().unwrap_or_default();
                let project = project_config_path(&cwd);
                match global_config_path() {
                    Some(global) => load_config(&global, &project),
                    None => load_config(Path::new(""), &project),
                }
            }
        };
        Session {
            config,
            color: color && std::io::stderr().is_terminal(),
        }
    }

    /// Load `catalog` and make sure `tag` has candidates.
    pub fn open(&self, catalog: &Path, tag: &str) -> Result<Registry> {
        let registry = open_registry(catalog, &self.config)
            .map_err(|e| anyhow!("{:#}\n{}", e, suggestions::BAD_CATALOG))?;
        if registry.entries(tag).is_empty() {
            bail!(
                "no candidates are registered under `{}` in {}\n{}",
                tag,
                catalog.display(),
                suggestions::UNKNOWN_TAG
            );
        }
        Ok(registry)
    }
}
