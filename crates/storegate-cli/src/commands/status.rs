//! Status command - probe a local gateway.

use std::path::PathBuf;
use std::time::Duration;

use crate::ui::{self, HealthStatus};
use anyhow::Result;

/// Status command arguments.
#[derive(Debug, Clone)]
pub struct StatusArgs {
    /// Config file path.
    pub config_path: PathBuf,
    /// Port override.
    pub port: Option<u16>,
}

/// Run the status command.
pub async fn run_status(args: StatusArgs) -> Result<()> {
    ui::header("Storegate Status");

    let config = super::read_config(&args.config_path);
    let port = args
        .port
        .unwrap_or_else(|| config.as_ref().map_or(3000, |c| c.server.port));

    println!();
    ui::info("Gateway");
    match probe_health(port).await {
        Ok(body) => {
            ui::health_check("Status", HealthStatus::Ok, Some("running"));
            ui::kv("  Port", &port.to_string());
            if let Some(surface) = body.get("surface").and_then(|v| v.as_str()) {
                ui::kv("  Surface", surface);
            }
            if let Some(version) = body.get("version").and_then(|v| v.as_str()) {
                ui::kv("  Version", version);
            }
        }
        Err(e) => {
            ui::health_check("Status", HealthStatus::Warning, Some(&e));
            ui::info("  Start with: storegate serve");
        }
    }

    println!();
    ui::info("Configuration");
    match config {
        Ok(config) => {
            ui::health_check("Config", HealthStatus::Ok, Some("loaded"));
            let config = config.with_env_overrides();
            let secret = config
                .gateway
                .jwt_secret
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty());
            if secret {
                ui::health_check("Secret", HealthStatus::Ok, Some("configured"));
            } else {
                ui::health_check("Secret", HealthStatus::Error, Some("JWT_SECRET_KEY not set"));
            }
        }
        Err(e) => {
            ui::health_check("Config", HealthStatus::Error, Some(&format!("{e:#}")));
        }
    }

    Ok(())
}

async fn probe_health(port: u16) -> Result<serde_json::Value, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| e.to_string())?;

    let resp = client
        .get(format!("http://127.0.0.1:{port}/health"))
        .send()
        .await
        .map_err(|_| "not running".to_string())?;

    if !resp.status().is_success() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json().await.map_err(|e| e.to_string())
}
