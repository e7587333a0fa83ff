//! Classify command - show which tier guards a path.

use std::path::PathBuf;

use crate::ui;
use anyhow::Result;
use storegate_core::{PolicyTier, SurfaceKind};
use storegate_gateway::GatewayPolicy;
use storegate_gateway::auth::normalize_path;

/// Classify command arguments.
#[derive(Debug, Clone)]
pub struct ClassifyArgs {
    /// Config file path.
    pub config_path: PathBuf,
    /// Path to classify.
    pub path: String,
    /// Surface override.
    pub surface: Option<SurfaceKind>,
}

/// Run the classify command.
pub fn run_classify(args: &ClassifyArgs) -> Result<()> {
    let config = super::load_config(&args.config_path, args.surface)?;
    let policy = GatewayPolicy::from_config(&config);
    let routes = policy.routes();

    let path = args.path.as_str();
    let tier = routes.classify_request(path);
    let canonical = normalize_path(path);

    ui::header(&format!("Route {path}"));
    ui::kv("Surface", config.server.surface.as_str());
    if canonical != path {
        ui::kv("Normalized", &canonical);
    }
    ui::kv("Tier", tier.as_str());
    ui::kv("Kind", if routes.is_api_request(path) { "api" } else { "page" });

    if routes.is_exempt(path) && !tier.requires_auth() {
        ui::info("Auth endpoints are exempt from all checks");
    } else if let Some(rule) = routes.matching_rule(&canonical) {
        let kind = if rule.exact { "exact" } else { "prefix" };
        ui::kv("Rule", &format!("{} ({kind})", rule.path));
    } else {
        ui::kv(
            "Rule",
            &format!(
                "none of {} matched, default tier {}",
                routes.rules().len(),
                routes.default_tier()
            ),
        );
    }

    let summary = match tier {
        PolicyTier::Public => "forwarded without checks",
        PolicyTier::Authenticated => "requires a valid token",
        PolicyTier::AdminOnly => "requires a valid token with admin role",
    };
    ui::kv("Effect", summary);

    Ok(())
}
