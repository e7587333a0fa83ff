//! Inspect command - verify a token the way the gateway would.

use std::path::PathBuf;

use crate::ui;
use anyhow::Result;
use chrono::{DateTime, Utc};
use storegate_core::SurfaceKind;
use storegate_gateway::GatewayPolicy;

/// Inspect command arguments.
#[derive(Debug, Clone)]
pub struct InspectArgs {
    /// Config file path.
    pub config_path: PathBuf,
    /// Encoded token.
    pub token: String,
    /// Surface override.
    pub surface: Option<SurfaceKind>,
}

/// Run the inspect command.
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let config = super::load_config(&args.config_path, args.surface)?;
    let policy = GatewayPolicy::from_config(&config);

    if !policy.verifier().is_configured() {
        anyhow::bail!("JWT_SECRET_KEY is not set; cannot verify tokens");
    }

    // Accept a pasted Authorization header value too.
    let token = args
        .token
        .strip_prefix("Bearer ")
        .unwrap_or(&args.token)
        .trim();

    ui::header("Token");
    let claims = match policy.verifier().verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            ui::error(&format!("Rejected ({}): {e}", e.kind()));
            anyhow::bail!("token rejected");
        }
    };
    ui::success("Signature and expiry valid");

    ui::kv("Subject", &claims.sub);
    if let Some(role) = &claims.role {
        ui::kv("Role", role);
    }
    if let Some(is_admin) = claims.is_admin {
        ui::kv("isAdmin claim", &is_admin.to_string());
    }
    if let Some(exp) = claims.exp {
        ui::kv("Expires", &format_timestamp(exp));
    }

    let identity = policy.resolver().resolve(&claims);
    ui::header("Resolved identity");
    ui::kv("User", &identity.user_id);
    ui::kv("Admin", &identity.is_admin.to_string());

    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map_or_else(|| secs.to_string(), |t| t.to_rfc3339())
}
