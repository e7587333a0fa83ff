//! Core types shared across storegate crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level a route requires.
///
/// Ordered from weakest to strictest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyTier {
    /// No check at all.
    #[default]
    Public,
    /// Any verified identity.
    Authenticated,
    /// Verified identity with `is_admin = true`.
    AdminOnly,
}

impl PolicyTier {
    /// Whether this tier needs a verified identity.
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Self::Public)
    }

    /// Whether this tier needs an admin identity.
    #[must_use]
    pub const fn requires_admin(self) -> bool {
        matches!(self, Self::AdminOnly)
    }

    /// Stable name, as used in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Authenticated => "authenticated",
            Self::AdminOnly => "admin-only",
        }
    }
}

impl fmt::Display for PolicyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved per-request principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user identifier (the token subject).
    pub user_id: String,
    /// Whether the user may reach admin-only routes.
    pub is_admin: bool,
}

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub fn new(user_id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin,
        }
    }
}

/// A single entry of a route table.
///
/// Prefix rules match on a path-segment boundary, so `/orders` covers
/// `/orders` and `/orders/7` but not `/ordersX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    /// Path or path prefix, starting with `/`.
    pub path: String,
    /// Tier required by matching paths.
    pub tier: PolicyTier,
    /// Match the literal path only.
    #[serde(default)]
    pub exact: bool,
}

impl RouteRule {
    /// Rule matching `path` and everything below it.
    #[must_use]
    pub fn prefix(path: impl Into<String>, tier: PolicyTier) -> Self {
        Self {
            path: path.into(),
            tier,
            exact: false,
        }
    }

    /// Rule matching `path` only.
    #[must_use]
    pub fn exact(path: impl Into<String>, tier: PolicyTier) -> Self {
        Self {
            path: path.into(),
            tier,
            exact: true,
        }
    }

    /// Check whether a request path falls under this rule.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.exact {
            return path == self.path;
        }

        let prefix = self.path.trim_end_matches('/');
        if prefix.is_empty() {
            // "/" as a prefix covers everything
            return true;
        }

        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Application surface a gateway instance protects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// Admin console (reports, catalog management).
    #[default]
    Admin,
    /// Customer-facing storefront.
    Storefront,
}

impl SurfaceKind {
    /// Stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Storefront => "storefront",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "storefront" | "store" => Ok(Self::Storefront),
            other => Err(format!("unknown surface '{other}' (expected admin or storefront)")),
        }
    }
}

/// Deployment mode of the running process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Local development; the auth bypass may be honored.
    #[default]
    Development,
    /// Production; the auth bypass is never honored.
    Production,
}

impl DeploymentMode {
    /// Parse an environment value. Only `production`/`prod` select production.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether this is a production deployment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}
