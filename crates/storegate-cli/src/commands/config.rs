//! Config command - show, validate, and locate configuration.

use std::path::{Path, PathBuf};

use crate::ui;
use anyhow::Result;
use storegate_core::Config;

/// Config command arguments.
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    /// Config file path.
    pub config_path: PathBuf,
    /// What to do.
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Validate the file.
    Validate,
    /// Print the file path.
    Path,
}

/// Run the config command.
pub fn run_config(args: &ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(&args.config_path),
        ConfigAction::Validate => validate_config(&args.config_path),
        ConfigAction::Path => {
            println!("{}", args.config_path.display());
            Ok(())
        }
    }
}

/// Print the configuration after the environment overlay.
fn show_config(path: &Path) -> Result<()> {
    if !path.exists() {
        ui::info(&format!(
            "No config file at {}; showing defaults",
            path.display()
        ));
    }

    let config = super::read_config(path)?.with_env_overrides();
    println!("{}", render_redacted(&config)?);
    Ok(())
}

/// Serialize config with the secret masked.
fn render_redacted(config: &Config) -> Result<String> {
    let mut value = serde_json::to_value(config)?;
    if let Some(secret) = value.pointer_mut("/gateway/jwtSecret") {
        if !secret.is_null() {
            *secret = serde_json::Value::String("[REDACTED]".to_string());
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Validate the configuration file.
fn validate_config(path: &Path) -> Result<()> {
    ui::header("Validating Configuration");

    if !path.exists() {
        ui::warning(&format!("Config file not found: {}", path.display()));
        ui::info("Defaults and environment variables will be used");
        return Ok(());
    }

    let content = std::fs::read_to_string(path)?;
    match Config::parse(&content) {
        Ok(config) => {
            ui::success("Syntax: Valid JSON5");
            ui::success("Schema: Configuration is valid");
            if config.gateway.routes.is_none() {
                ui::info(&format!(
                    "Routes: using the {} preset",
                    config.server.surface
                ));
            }
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("{e}"));
            anyhow::bail!("invalid configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_redacts_secret() {
        let mut config = Config::default();
        config.gateway.jwt_secret = Some("hunter2".to_string());

        let rendered = render_redacted(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_render_leaves_missing_secret_null() {
        let rendered = render_redacted(&Config::default()).unwrap();
        assert!(!rendered.contains("[REDACTED]"));
    }
}
