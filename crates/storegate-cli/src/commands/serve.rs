//! Serve command - run the HTTP host behind the gateway.

use std::path::PathBuf;

use crate::ui;
use anyhow::Result;
use storegate_core::SurfaceKind;
use storegate_core::config::BindMode;
use storegate_gateway::{GatewayBuilder, GatewayConfig, GatewayPolicy};

/// Serve command arguments.
#[derive(Debug, Clone)]
pub struct ServeArgs {
    /// Config file path.
    pub config_path: PathBuf,
    /// Surface override.
    pub surface: Option<SurfaceKind>,
    /// Port override.
    pub port: Option<u16>,
    /// Bind override: `local`, `public`, or an address.
    pub bind: Option<String>,
}

/// Run the serve command.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = super::load_config(&args.config_path, args.surface)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.mode = parse_bind(&bind);
    }
    config.validate()?;

    let policy = GatewayPolicy::from_config(&config);
    let host = GatewayConfig::from_config(&config);

    ui::header("Starting Storegate Gateway");
    ui::kv("Surface", config.server.surface.as_str());
    ui::kv("Address", &format!("{}:{}", host.bind_address, host.port));
    let environment = if policy.bypass().mode().is_production() {
        "production"
    } else {
        "development"
    };
    ui::kv("Environment", environment);
    ui::kv("Default tier", config.gateway.default_tier.as_str());

    if !policy.verifier().is_configured() {
        ui::warning("JWT_SECRET_KEY is not set; protected routes will return 500");
    }
    if let Some(identity) = policy.bypass().active() {
        ui::warning(&format!(
            "Development auth bypass active as '{}' (admin: {})",
            identity.user_id, identity.is_admin
        ));
    }
    println!();

    ui::info("Press Ctrl+C to stop");
    println!();

    let gateway = GatewayBuilder::new()
        .with_config(host)
        .with_policy(policy)
        .build()?;
    gateway.run().await?;

    Ok(())
}

fn parse_bind(value: &str) -> BindMode {
    match value {
        "local" | "loopback" => BindMode::Local,
        "public" | "lan" => BindMode::Public,
        addr => BindMode::Custom(addr.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind() {
        assert_eq!(parse_bind("local").address(), "127.0.0.1");
        assert_eq!(parse_bind("public").address(), "0.0.0.0");
        assert_eq!(parse_bind("10.0.0.5").address(), "10.0.0.5");
    }
}
