//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/topotree/topotree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `TOPOTREE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ArrangementSupplier, SyntheticSupplier};

/// Tree rendering options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Print each object's cpuset next to its name
    pub show_cpuset: bool,
    /// Print the OS index of objects that have one
    pub show_os_index: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_cpuset: true,
            show_os_index: true,
        }
    }
}

/// Defaults for `closest`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClosestConfig {
    pub default_count: usize,
}

impl Default for ClosestConfig {
    fn default() -> Self {
        Self { default_count: 8 }
    }
}

/// Raw render config; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRenderConfig {
    pub show_cpuset: Option<bool>,
    pub show_os_index: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawClosestConfig {
    pub default_count: Option<usize>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub synthetic: Option<String>,
    pub render: RawRenderConfig,
    pub closest: RawClosestConfig,
}

/// Unified configuration for topotree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Synthetic description used as the topology source; `None` loads a
    /// single processing unit
    pub synthetic: Option<String>,
    pub render: RenderConfig,
    pub closest: ClosestConfig,
}

/// Get the XDG config directory for topotree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "topotree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("topotree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> ApplicationResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins wherever it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            synthetic: overlay
                .synthetic
                .clone()
                .or_else(|| self.synthetic.clone()),
            render: RenderConfig {
                show_cpuset: overlay
                    .render
                    .show_cpuset
                    .unwrap_or(self.render.show_cpuset),
                show_os_index: overlay
                    .render
                    .show_os_index
                    .unwrap_or(self.render.show_os_index),
            },
            closest: ClosestConfig {
                default_count: overlay
                    .closest
                    .default_count
                    .unwrap_or(self.closest.default_count),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file; unlike the global file it must exist
    #[instrument(level = "debug")]
    pub fn load(explicit: Option<&Path>) -> ApplicationResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            debug!("explicit config: {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply TOPOTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> ApplicationResult<Self> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TOPOTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("synthetic") {
            settings.synthetic = Some(val);
        }
        if let Ok(val) = config.get_bool("render.show_cpuset") {
            settings.render.show_cpuset = val;
        }
        if let Ok(val) = config.get_bool("render.show_os_index") {
            settings.render.show_os_index = val;
        }
        if let Ok(val) = config.get_int("closest.default_count") {
            settings.closest.default_count = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("closest.default_count must not be negative: {}", val),
            })?;
        }

        Ok(settings)
    }

    /// Supplier selected by this configuration.
    pub fn supplier(&self) -> ApplicationResult<Box<dyn ArrangementSupplier>> {
        let description = self.synthetic.as_deref().unwrap_or("");
        Ok(Box::new(SyntheticSupplier::parse(description)?))
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# topotree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/topotree/topotree.toml
#   Explicit: topotree --config <file>
#   Env:      TOPOTREE_* environment variables, e.g. TOPOTREE_RENDER__SHOW_CPUSET=false

# Synthetic topology: arity of each level, outermost first
# synthetic = "2 4 2"

[render]
# show_cpuset = true
# show_os_index = true

[closest]
# default_count = 8
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
