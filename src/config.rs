// TCM Set Operator Auth - Configuration Module
//
// Run configuration derived from the command line, and the module service
// configuration loaded from tcm-module.yaml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Immutable settings for one provisioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// Use the well-known secret instead of prompting
    pub well_known: bool,

    /// Unicode-encode the operator password
    pub op_password_unicode: bool,

    /// Unicode-encode every password this tool asks for
    pub use_unicode: bool,
}

impl ProvisionConfig {
    /// Whether an interactively entered secret is Unicode-encoded.
    pub fn unicode_secret(&self) -> bool {
        self.op_password_unicode || self.use_unicode
    }
}

/// Module service backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// File-backed software module
    Simulator,
}

/// Module service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModuleConfig {
    /// Backend implementing the module service
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Path to the simulated module state file
    pub state: String,
}

fn default_backend() -> Backend {
    Backend::Simulator
}

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Module service configuration
    pub module: ModuleConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.module.state.trim().is_empty() {
            anyhow::bail!("Module state path cannot be empty");
        }

        Ok(())
    }

    /// Get the absolute path of the simulated module state file
    pub fn state_path(&self) -> Result<PathBuf> {
        let state = &self.module.state;
        let path = Path::new(state);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else if let Some(rest) = state.strip_prefix('~') {
            let home = dirs::home_dir().context("Failed to determine home directory")?;
            Ok(home.join(rest.trim_start_matches(|c: char| c == '/' || c == '\\')))
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(state))
                .with_context(|| "Failed to get current directory")
        }
    }
}
