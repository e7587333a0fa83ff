//! Identity and role resolution.

use std::collections::HashSet;

use storegate_core::{DeploymentMode, Identity, config::BypassSettings};

use super::jwt::Claims;
use super::policy::SurfaceProfile;

/// Role claim value that grants admin.
pub const ADMIN_ROLE: &str = "ADMIN";

/// User ids treated as admin regardless of token claims.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList(HashSet<String>);

impl AdminAllowList {
    /// Create an allow-list from user ids.
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.0.contains(user_id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AdminAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Turns verified claims into the request's identity.
pub trait IdentityResolver: Send + Sync + std::fmt::Debug {
    /// Derive the identity. Must be deterministic for equal claims.
    fn resolve(&self, claims: &Claims) -> Identity;
}

/// Default resolver: admin if any source says so.
///
/// `is_admin = allow_list ∋ sub || claims.isAdmin || claims.role == "ADMIN"`.
/// No source can pull the flag back to `false`, so claim content never
/// weakens the allow-list.
#[derive(Debug, Clone, Default)]
pub struct ClaimsResolver {
    allow_list: AdminAllowList,
}

impl ClaimsResolver {
    /// Create a resolver over an allow-list.
    #[must_use]
    pub const fn new(allow_list: AdminAllowList) -> Self {
        Self { allow_list }
    }
}

impl IdentityResolver for ClaimsResolver {
    fn resolve(&self, claims: &Claims) -> Identity {
        let is_admin = self.allow_list.contains(&claims.sub)
            || claims.is_admin.unwrap_or(false)
            || claims.role.as_deref() == Some(ADMIN_ROLE);

        Identity::new(claims.sub.clone(), is_admin)
    }
}

/// Development bypass, validated against the deployment mode.
///
/// The only constructors drop the bypass identity in production, so an
/// active bypass in a production process cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassConfig {
    mode: DeploymentMode,
    identity: Option<Identity>,
}

impl BypassConfig {
    /// Bypass switched off.
    #[must_use]
    pub const fn disabled(mode: DeploymentMode) -> Self {
        Self {
            mode,
            identity: None,
        }
    }

    /// Build a bypass from explicit fields.
    #[must_use]
    pub fn new(mode: DeploymentMode, enabled: bool, user_id: impl Into<String>, is_admin: bool) -> Self {
        if !enabled {
            return Self::disabled(mode);
        }
        if mode.is_production() {
            tracing::warn!("Auth bypass requested in production; ignoring it");
            return Self::disabled(mode);
        }

        let user_id = user_id.into();
        if user_id.is_empty() {
            tracing::warn!("Auth bypass requested without a user id; ignoring it");
            return Self::disabled(mode);
        }

        tracing::warn!(user_id = %user_id, is_admin, "Development auth bypass is active");
        Self {
            mode,
            identity: Some(Identity::new(user_id, is_admin)),
        }
    }

    /// Build from raw settings, filling gaps from the surface profile.
    #[must_use]
    pub fn from_settings(
        mode: DeploymentMode,
        settings: &BypassSettings,
        profile: &SurfaceProfile,
    ) -> Self {
        let user_id = settings
            .user_id
            .clone()
            .or_else(|| profile.bypass_user_default.map(str::to_string));
        let is_admin = settings.is_admin.unwrap_or(profile.bypass_admin_default);

        match user_id {
            Some(user_id) => Self::new(mode, settings.enabled, user_id, is_admin),
            None => {
                if settings.enabled {
                    tracing::warn!(
                        surface = %profile.kind,
                        "Auth bypass requested but no user id configured; ignoring it"
                    );
                }
                Self::disabled(mode)
            }
        }
    }

    /// The synthetic identity, if the bypass is active.
    #[must_use]
    pub const fn active(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Deployment mode this bypass was validated against.
    #[must_use]
    pub const fn mode(&self) -> DeploymentMode {
        self.mode
    }
}
