use std::path::PathBuf;

use debfeed_utils::path::resolve_path;
use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Post-install hook settings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct HookConfig {
    /// Canonical configuration file shipped by the package.
    pub source: String,

    /// Path where the service expects its configuration.
    /// Replaced by a symlink to `source`; a regular file found here is saved as `<path>.bak`.
    pub destination: String,

    /// Command validating the linked configuration.
    /// `{config}` is replaced with the destination path.
    pub validator: Vec<String>,

    /// Command restarting the service once the configuration is valid.
    /// Failures are logged and ignored.
    pub restart: Vec<String>,
}

impl HookConfig {
    pub fn default_config() -> Self {
        Self {
            source: "/opt/example-agent/etc/agent.yaml".to_string(),
            destination: "/etc/example-agent/agent.yaml".to_string(),
            validator: ["example-agent", "check-config", "--config", "{config}"]
                .into_iter()
                .map(String::from)
                .collect(),
            restart: ["systemctl", "restart", "example-agent"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn get_source(&self) -> Result<PathBuf> {
        Ok(resolve_path(&self.source)?)
    }

    pub fn get_destination(&self) -> Result<PathBuf> {
        Ok(resolve_path(&self.destination)?)
    }

    /// Validator argv with `{config}` substituted.
    pub fn validator_command(&self, config: &str) -> Vec<String> {
        self.validator
            .iter()
            .map(|arg| arg.replace("{config}", config))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.validator.is_empty() {
            return Err(ConfigError::EmptyCommand("validator"));
        }
        if self.restart.is_empty() {
            return Err(ConfigError::EmptyCommand("restart"));
        }

        let destination = self.get_destination()?;
        if self.get_source()? == destination {
            return Err(ConfigError::HookSelfLink(destination.display().to_string()));
        }
        Ok(())
    }
}
