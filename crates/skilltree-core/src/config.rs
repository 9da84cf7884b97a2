//! Configuration loading and typed config structures for the skill tree runtime.
//!
//! The configuration lives in `skilltree-config.yaml`. Every section and
//! field has a default, so an empty file (or no file at all, see
//! [`SkillTreeConfig::load_or_default`]) yields a working setup.
//!
//! ```yaml
//! logging:
//!   level: debug
//!   json: false
//! activation:
//!   refund_percent: 50
//!   require_unlocked_parent: true
//! save:
//!   slot_name: SkillTreeSaveSlot
//!   directory: ./saves
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use skilltree_engine::ActivationEngine;
use skilltree_ledger::{LedgerError, RefundPolicy};

use crate::manager::DEFAULT_SLOT_NAME;

/// Environment variable that overrides `save.directory`.
pub const SAVE_DIR_ENV: &str = "SKILLTREE_SAVE_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {source}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        source: LedgerError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level runtime configuration.
///
/// Mirrors the structure of `skilltree-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SkillTreeConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Activation, deactivation and respec policy.
    #[serde(default)]
    pub activation: ActivationConfig,

    /// Save slot and storage location.
    #[serde(default)]
    pub save: SaveConfig,
}

impl SkillTreeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SKILLTREE_SAVE_DIR` overrides `save.directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_file`], except that a missing file is not an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        let mut config = Self::default();
        config.save.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml reads an empty document as null.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.save.apply_env_overrides();
        Ok(config)
    }

    /// Build the activation engine described by the `activation` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `refund_percent` is above 100.
    pub fn engine(&self) -> Result<ActivationEngine, ConfigError> {
        let policy =
            RefundPolicy::new(self.activation.refund_percent).map_err(|source| {
                ConfigError::Invalid {
                    field: "activation.refund_percent",
                    source,
                }
            })?;
        Ok(ActivationEngine::new(
            policy,
            self.activation.require_unlocked_parent,
        ))
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Activation policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivationConfig {
    /// Share of the paid cost returned on deactivation and respec (0-100).
    #[serde(default = "default_refund_percent")]
    pub refund_percent: u8,

    /// Whether a node with parents needs at least one unlocked parent.
    #[serde(default = "default_require_unlocked_parent")]
    pub require_unlocked_parent: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            refund_percent: default_refund_percent(),
            require_unlocked_parent: default_require_unlocked_parent(),
        }
    }
}

const fn default_refund_percent() -> u8 {
    100
}

const fn default_require_unlocked_parent() -> bool {
    true
}

/// Save slot and storage location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveConfig {
    /// Slot name every owner's save is filed under.
    #[serde(default = "default_slot_name")]
    pub slot_name: String,

    /// Directory for file-backed saves. `None` keeps saves in memory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl SaveConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_directory_override(std::env::var(SAVE_DIR_ENV).ok());
    }

    fn apply_directory_override(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|v| !v.trim().is_empty()) {
            self.directory = Some(PathBuf::from(dir));
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            slot_name: default_slot_name(),
            directory: None,
        }
    }
}

fn default_slot_name() -> String {
    DEFAULT_SLOT_NAME.to_owned()
}
