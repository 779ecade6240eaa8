//! Implementation of the `intent config` commands.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::ConfigCommands;
use crate::domain::models::Config;

const REDACTED: &str = "<redacted>";

/// Effective configuration as printed by `config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    /// Merged settings with the API key redacted.
    pub config: Config,
    /// Whether a key was found in settings or the environment.
    pub api_key_present: bool,
}

impl ConfigShowOutput {
    fn new(mut config: Config) -> Self {
        let api_key_present = config.inference.resolved_api_key().is_some();
        if config.inference.api_key.is_some() {
            config.inference.api_key = Some(REDACTED.to_string());
        }
        Self {
            config,
            api_key_present,
        }
    }
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        let yaml = serde_yaml::to_string(&self.config).unwrap_or_default();
        let key_line = if self.api_key_present {
            "API key: set"
        } else {
            "API key: not set"
        };
        format!("{}\n{}", yaml.trim_end(), key_line)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run a `config` subcommand.
pub async fn execute(command: ConfigCommands, config: Config, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            output(&ConfigShowOutput::new(config), json_mode);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_redacted() {
        let mut config = Config::default();
        config.inference.api_key = Some("sk-secret".to_string());
        let shown = ConfigShowOutput::new(config);

        assert!(shown.api_key_present);
        let human = shown.to_human();
        assert!(!human.contains("sk-secret"));
        assert!(human.contains(REDACTED));
        assert!(!shown.to_json().to_string().contains("sk-secret"));
    }
}
