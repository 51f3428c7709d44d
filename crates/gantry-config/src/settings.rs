//! Run settings with layered loading
//!
//! Settings are loaded from these sources, later sources overriding earlier:
//!
//! 1. Built-in defaults
//! 2. User-global `settings.toml` in the platform config directory
//!    (`<config_dir>/gantry/settings.toml`)
//! 3. The workspace `[settings]` table of `gantry.toml`
//!
//! Missing layers are skipped. Invalid TOML in any layer is an error.
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! max_parallel = 4
//! capability_timeout_secs = 600
//! gate_timeout_secs = 60
//! max_retries = 2
//! retry_initial_backoff_ms = 200
//! inherit = "parent"
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scope::InheritMode;

/// One layer of settings; unset fields defer to earlier layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_initial_backoff_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<InheritMode>,
}

impl SettingsLayer {
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Upper bound on modules processed concurrently
    pub max_parallel: usize,
    pub capability_timeout: Duration,
    pub gate_timeout: Duration,
    /// Retries after a timed-out collaborator call
    pub max_retries: u32,
    pub retry_initial_backoff: Duration,
    pub inherit: InheritMode,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_parallel: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(4),
            capability_timeout: Duration::from_secs(600),
            gate_timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_initial_backoff: Duration::from_millis(200),
            inherit: InheritMode::default(),
        }
    }
}

impl RunSettings {
    /// Apply a layer on top of these settings
    pub fn apply(&mut self, layer: &SettingsLayer) {
        if let Some(max_parallel) = layer.max_parallel {
            self.max_parallel = max_parallel;
        }
        if let Some(secs) = layer.capability_timeout_secs {
            self.capability_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = layer.gate_timeout_secs {
            self.gate_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = layer.max_retries {
            self.max_retries = retries;
        }
        if let Some(ms) = layer.retry_initial_backoff_ms {
            self.retry_initial_backoff = Duration::from_millis(ms);
        }
        if let Some(inherit) = layer.inherit {
            self.inherit = inherit;
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    pub fn with_gate_timeout(mut self, timeout: Duration) -> Self {
        self.gate_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_initial_backoff(mut self, backoff: Duration) -> Self {
        self.retry_initial_backoff = backoff;
        self
    }

    pub fn with_inherit(mut self, inherit: InheritMode) -> Self {
        self.inherit = inherit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(Error::InvalidSetting {
                key: "max_parallel".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.capability_timeout.is_zero() {
            return Err(Error::InvalidSetting {
                key: "capability_timeout_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.gate_timeout.is_zero() {
            return Err(Error::InvalidSetting {
                key: "gate_timeout_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads [`RunSettings`] from the layered sources
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    /// Override for the global config directory (used for testing).
    /// When `None`, `dirs::config_dir()` is used.
    global_config_dir_override: Option<PathBuf>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom global config directory instead of the platform one
    pub fn with_global_config_dir(global_config_dir: PathBuf) -> Self {
        Self {
            global_config_dir_override: Some(global_config_dir),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("gantry"))
    }

    /// Path of the user-global settings file, if a config directory exists
    pub fn global_settings_path(&self) -> Option<PathBuf> {
        self.global_config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings, applying `workspace` as the last layer.
    pub fn load(&self, workspace: &SettingsLayer) -> Result<RunSettings> {
        let mut settings = RunSettings::default();

        if let Some(global_path) = self.global_settings_path() {
            if global_path.is_file() {
                tracing::debug!(?global_path, "Loading global settings");
                let content = fs::read_to_string(&global_path)?;
                let layer = SettingsLayer::parse(&content).map_err(|source| {
                    Error::SettingsParse {
                        path: global_path.clone(),
                        source,
                    }
                })?;
                settings.apply(&layer);
            } else {
                tracing::debug!(?global_path, "No global settings found, skipping");
            }
        }

        settings.apply(workspace);
        settings.validate()?;
        tracing::debug!(?settings, "Resolved run settings");
        Ok(settings)
    }
}
