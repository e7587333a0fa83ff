//! Configuration loading and validation.
//!
//! Config is JSON5, located at `~/.storegate/storegate.json` unless
//! `STOREGATE_STATE_DIR` points elsewhere. Process environment is overlaid on
//! top of the file with [`Config::with_env_overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{DeploymentMode, PolicyTier, RouteRule, SurfaceKind};

/// Environment variable holding the token verification secret.
pub const ENV_JWT_SECRET: &str = "JWT_SECRET_KEY";
/// Environment variable selecting the deployment mode.
pub const ENV_DEPLOYMENT: &str = "STOREGATE_ENV";
/// Environment variable enabling the development auth bypass.
pub const ENV_BYPASS_ENABLED: &str = "DEV_AUTH_BYPASS";
/// Bypass user id for the admin surface.
pub const ENV_BYPASS_ADMIN_ID: &str = "DEV_ADMIN_ID";
/// Bypass user id for the storefront surface.
pub const ENV_BYPASS_USER_ID: &str = "DEV_USER_ID";
/// Bypass admin flag.
pub const ENV_BYPASS_IS_ADMIN: &str = "DEV_IS_ADMIN";
/// Override for the state directory.
pub const ENV_STATE_DIR: &str = "STOREGATE_STATE_DIR";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP host configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Gateway policy configuration.
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns error if config exists but cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate JSON5 config text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid JSON5 or fails validation.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("storegate.json")
    }

    /// Get the storegate state directory.
    ///
    /// Uses `STOREGATE_STATE_DIR` env var if set, otherwise `~/.storegate`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".storegate")
        } else {
            PathBuf::from(".storegate")
        }
    }

    /// Overlay process environment variables on this config.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup.
    ///
    /// The bypass user id is read from `DEV_ADMIN_ID` on the admin surface
    /// and from `DEV_USER_ID` on the storefront.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.gateway.jwt_secret = Some(secret);
        }

        if let Some(mode) = lookup(ENV_DEPLOYMENT) {
            self.gateway.environment = DeploymentMode::from_env_value(&mode);
        }

        if let Some(flag) = lookup(ENV_BYPASS_ENABLED) {
            self.gateway.bypass.enabled = flag == "true";
        }

        let user_var = match self.server.surface {
            SurfaceKind::Admin => ENV_BYPASS_ADMIN_ID,
            SurfaceKind::Storefront => ENV_BYPASS_USER_ID,
        };
        if let Some(user_id) = lookup(user_var).filter(|v| !v.is_empty()) {
            self.gateway.bypass.user_id = Some(user_id);
        }

        if let Some(flag) = lookup(ENV_BYPASS_IS_ADMIN) {
            self.gateway.bypass.is_admin = Some(flag.trim().eq_ignore_ascii_case("true"));
        }

        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        let gateway = &self.gateway;
        for (name, value) in [
            ("loginPath", &gateway.login_path),
            ("forbiddenRedirect", &gateway.forbidden_redirect),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{name} must be an absolute path, got '{value}'"
                )));
            }
            // Sent verbatim as a Location header.
            if value.bytes().any(|b| b.is_ascii_control()) {
                return Err(ConfigError::Validation(format!(
                    "{name} contains control characters"
                )));
            }
        }

        if let Some(routes) = &gateway.routes {
            if let Some(rule) = routes.iter().find(|r| !r.path.starts_with('/')) {
                return Err(ConfigError::Validation(format!(
                    "Route '{}' must start with '/'",
                    rule.path
                )));
            }
        }

        if gateway.admin_user_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "adminUserIds cannot contain empty entries".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address mode.
    #[serde(default)]
    pub mode: BindMode,

    /// Surface this instance protects.
    #[serde(default)]
    pub surface: SurfaceKind,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            mode: BindMode::default(),
            surface: SurfaceKind::default(),
            timeout_secs: default_timeout(),
        }
    }
}

const fn default_port() -> u16 {
    3000
}

const fn default_timeout() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

/// Bind mode for the HTTP host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to localhost only.
    #[default]
    Local,
    /// Bind to all interfaces.
    Public,
    /// Custom bind address.
    Custom(String),
}

impl BindMode {
    /// Address to bind for this mode.
    #[must_use]
    pub fn address(&self) -> String {
        match self {
            Self::Local => "127.0.0.1".to_string(),
            Self::Public => "0.0.0.0".to_string(),
            Self::Custom(addr) => addr.clone(),
        }
    }
}

/// Gateway policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    /// Token verification secret. Usually supplied via `JWT_SECRET_KEY`.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Reject tokens without an `exp` claim.
    #[serde(default = "default_true")]
    pub require_expiry: bool,

    /// Clock skew tolerance for `exp`, in seconds.
    #[serde(default)]
    pub leeway_secs: u64,

    /// User ids treated as admin regardless of token claims.
    #[serde(default)]
    pub admin_user_ids: Vec<String>,

    /// Route table override. When unset the surface preset is used.
    #[serde(default)]
    pub routes: Option<Vec<RouteRule>>,

    /// Tier for paths no route rule matches.
    #[serde(default)]
    pub default_tier: PolicyTier,

    /// Redirect target for unauthenticated page requests.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Redirect target for forbidden page requests.
    #[serde(default = "default_forbidden_redirect")]
    pub forbidden_redirect: String,

    /// Deployment mode.
    #[serde(default)]
    pub environment: DeploymentMode,

    /// Development auth bypass.
    #[serde(default)]
    pub bypass: BypassSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            require_expiry: true,
            leeway_secs: 0,
            admin_user_ids: Vec::new(),
            routes: None,
            default_tier: PolicyTier::default(),
            login_path: default_login_path(),
            forbidden_redirect: default_forbidden_redirect(),
            environment: DeploymentMode::default(),
            bypass: BypassSettings::default(),
        }
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_forbidden_redirect() -> String {
    "/".to_string()
}

/// Raw development bypass settings.
///
/// These are only honored outside production; the gateway enforces that
/// when it builds its bypass configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassSettings {
    /// Whether the bypass was requested.
    #[serde(default)]
    pub enabled: bool,

    /// Synthetic user id.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Synthetic admin flag.
    #[serde(default)]
    pub is_admin: Option<bool>,
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Log format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.surface, SurfaceKind::Admin);
        assert!(config.gateway.jwt_secret.is_none());
        assert!(config.gateway.require_expiry);
        assert_eq!(config.gateway.login_path, "/login");
        assert_eq!(config.gateway.forbidden_redirect, "/");
        assert_eq!(config.gateway.default_tier, PolicyTier::Public);
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("storegate.json");

        let mut config = Config::default();
        config.gateway.admin_user_ids = vec!["cl_admin_123".to_string()];
        config.gateway.routes = Some(vec![RouteRule::prefix(
            "/reports",
            PolicyTier::AdminOnly,
        )]);

        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.gateway.admin_user_ids, vec!["cl_admin_123"]);
        assert_eq!(loaded.gateway.routes.unwrap()[0].tier, PolicyTier::AdminOnly);
    }

    #[test]
    fn test_json5_parsing() {
        let content = r#"{
            // storefront instance
            server: { port: 8080, surface: "storefront" },
            gateway: {
                adminUserIds: ["u-1"],
                defaultTier: "authenticated",
                routes: [
                    { path: "/", tier: "public", exact: true },
                    { path: "/account", tier: "authenticated" },
                ],
            },
        }"#;

        let config = Config::parse(content).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.surface, SurfaceKind::Storefront);
        assert_eq!(config.gateway.default_tier, PolicyTier::Authenticated);
        let routes = config.gateway.routes.unwrap();
        assert_eq!(routes.len(), 2);
        assert!(routes[0].exact);
        assert!(!routes[1].exact);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gateway.login_path = "login".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gateway.login_path = "/login\u{7}".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gateway.forbidden_redirect = "/\r\nSet-Cookie: x=1".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gateway.routes = Some(vec![RouteRule::prefix("reports", PolicyTier::AdminOnly)]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gateway.admin_user_ids = vec![String::new()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_admin_surface() {
        let config = Config::default().with_overrides_from(lookup_from(&[
            ("JWT_SECRET_KEY", "s3cret"),
            ("STOREGATE_ENV", "production"),
            ("DEV_AUTH_BYPASS", "true"),
            ("DEV_ADMIN_ID", "dev-1"),
            ("DEV_USER_ID", "ignored-on-admin"),
            ("DEV_IS_ADMIN", "false"),
        ]));

        assert_eq!(config.gateway.jwt_secret.as_deref(), Some("s3cret"));
        assert!(config.gateway.environment.is_production());
        assert!(config.gateway.bypass.enabled);
        assert_eq!(config.gateway.bypass.user_id.as_deref(), Some("dev-1"));
        assert_eq!(config.gateway.bypass.is_admin, Some(false));
    }

    #[test]
    fn test_env_overrides_storefront_surface() {
        let mut config = Config::default();
        config.server.surface = SurfaceKind::Storefront;
        let config = config.with_overrides_from(lookup_from(&[
            ("DEV_AUTH_BYPASS", "true"),
            ("DEV_ADMIN_ID", "ignored-on-storefront"),
            ("DEV_USER_ID", "shopper-1"),
        ]));

        assert!(config.gateway.bypass.enabled);
        assert_eq!(config.gateway.bypass.user_id.as_deref(), Some("shopper-1"));
        assert_eq!(config.gateway.bypass.is_admin, None);
    }

    #[test]
    fn test_bypass_flag_is_exact_true() {
        for value in ["TRUE", "True", "1", "yes", " true"] {
            let config =
                Config::default().with_overrides_from(lookup_from(&[("DEV_AUTH_BYPASS", value)]));
            assert!(!config.gateway.bypass.enabled, "{value:?} enabled the bypass");
        }

        let config = Config::default().with_overrides_from(lookup_from(&[
            ("DEV_AUTH_BYPASS", "true"),
            ("DEV_IS_ADMIN", "TRUE"),
        ]));
        assert!(config.gateway.bypass.enabled);
        assert_eq!(config.gateway.bypass.is_admin, Some(true));
    }

    #[test]
    fn test_env_overrides_absent_leave_file_values() {
        let mut config = Config::default();
        config.gateway.jwt_secret = Some("from-file".to_string());
        let config = config.with_overrides_from(|_| None);

        assert_eq!(config.gateway.jwt_secret.as_deref(), Some("from-file"));
        assert!(!config.gateway.bypass.enabled);
    }

    #[test]
    fn test_bind_mode_address() {
        assert_eq!(BindMode::Local.address(), "127.0.0.1");
        assert_eq!(BindMode::Public.address(), "0.0.0.0");
        assert_eq!(BindMode::Custom("10.0.0.2".to_string()).address(), "10.0.0.2");
    }

    #[test]
    fn test_state_dir() {
        let dir = Config::state_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
