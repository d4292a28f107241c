//! Configuration for embedding the upgrader.

use crate::error::{Result, UpgradeError};
use crate::installer::{InstallerCommand, TargetStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level upgrade configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Package path inside the module to install (empty for the module root).
    pub package_path: String,
    /// Installer settings.
    pub installer: InstallerConfig,
}

/// External installer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Installer executable.
    pub program: String,
    /// Arguments placed before the install target.
    pub args: Vec<String>,
    /// Form of the install target argument (`cargo` or `verbatim`).
    pub target_style: TargetStyle,
    /// Kill the installer after this many seconds (None = no limit).
    pub timeout_secs: Option<u64>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let command = InstallerCommand::default();
        Self {
            program: command.program,
            args: command.args,
            target_style: command.target_style,
            timeout_secs: None,
        }
    }
}

impl InstallerConfig {
    pub fn command(&self) -> InstallerCommand {
        InstallerCommand {
            program: self.program.clone(),
            args: self.args.clone(),
            target_style: self.target_style,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl UpgradeConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| UpgradeError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpgradeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/selfup/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("selfup").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("selfup")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/selfup-config/config.toml")
        }
    }
}
