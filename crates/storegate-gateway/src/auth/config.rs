//! Gateway policy construction.

use std::sync::Arc;
use std::time::Duration;

use storegate_core::{Config, DeploymentMode, SigningSecret};

use super::identity::{AdminAllowList, BypassConfig, ClaimsResolver, IdentityResolver};
use super::jwt::{TokenVerifier, VerifyOptions};
use super::policy::{RouteTable, SurfaceProfile};

/// Immutable, process-wide gateway state.
///
/// Built once at startup and shared behind an `Arc`; every request reads it
/// concurrently without locking.
pub struct GatewayPolicy {
    pub(super) routes: RouteTable,
    pub(super) verifier: TokenVerifier,
    pub(super) resolver: Arc<dyn IdentityResolver>,
    pub(super) bypass: BypassConfig,
    pub(super) login_path: String,
    pub(super) forbidden_redirect: String,
}

impl GatewayPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub fn builder() -> GatewayPolicyBuilder {
        GatewayPolicyBuilder::default()
    }

    /// Build a policy from loaded configuration.
    ///
    /// Routes come from the config when set, otherwise from the surface
    /// preset. The bypass is validated against the configured deployment mode.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.gateway;
        let profile = SurfaceProfile::for_kind(config.server.surface);

        let rules = settings.routes.clone().unwrap_or_else(|| profile.rules());
        let routes = RouteTable::new(rules, settings.default_tier);

        let bypass = BypassConfig::from_settings(settings.environment, &settings.bypass, &profile);

        Self::builder()
            .routes(routes)
            .secret(SigningSecret::from_configured(settings.jwt_secret.as_deref()))
            .verify_options(VerifyOptions {
                require_expiry: settings.require_expiry,
                leeway: Duration::from_secs(settings.leeway_secs),
            })
            .allow_list(AdminAllowList::new(settings.admin_user_ids.iter().cloned()))
            .bypass(bypass)
            .login_path(settings.login_path.clone())
            .forbidden_redirect(settings.forbidden_redirect.clone())
            .build()
    }

    /// Route table in use.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Token verifier in use.
    #[must_use]
    pub const fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Identity resolver in use.
    #[must_use]
    pub fn resolver(&self) -> &dyn IdentityResolver {
        self.resolver.as_ref()
    }

    /// Validated bypass configuration.
    #[must_use]
    pub const fn bypass(&self) -> &BypassConfig {
        &self.bypass
    }

    /// Redirect target for unauthenticated page requests.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Redirect target for forbidden page requests.
    #[must_use]
    pub fn forbidden_redirect(&self) -> &str {
        &self.forbidden_redirect
    }
}

impl std::fmt::Debug for GatewayPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayPolicy")
            .field("routes", &self.routes)
            .field("verifier", &self.verifier)
            .field("resolver", &self.resolver)
            .field("bypass", &self.bypass)
            .field("login_path", &self.login_path)
            .field("forbidden_redirect", &self.forbidden_redirect)
            .finish()
    }
}

/// Builder for `GatewayPolicy`.
#[derive(Debug)]
pub struct GatewayPolicyBuilder {
    routes: Option<RouteTable>,
    secret: Option<SigningSecret>,
    verify_options: VerifyOptions,
    resolver: Option<Arc<dyn IdentityResolver>>,
    allow_list: AdminAllowList,
    bypass: BypassConfig,
    login_path: String,
    forbidden_redirect: String,
}

impl Default for GatewayPolicyBuilder {
    fn default() -> Self {
        Self {
            routes: None,
            secret: None,
            verify_options: VerifyOptions::default(),
            resolver: None,
            allow_list: AdminAllowList::default(),
            bypass: BypassConfig::disabled(DeploymentMode::default()),
            login_path: "/login".to_string(),
            forbidden_redirect: "/".to_string(),
        }
    }
}

impl GatewayPolicyBuilder {
    /// Set the route table. Defaults to the admin surface preset.
    #[must_use]
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Set the verification secret. `None` leaves the gateway unconfigured.
    #[must_use]
    pub fn secret(mut self, secret: Option<SigningSecret>) -> Self {
        self.secret = secret;
        self
    }

    /// Set token verification options.
    #[must_use]
    pub const fn verify_options(mut self, options: VerifyOptions) -> Self {
        self.verify_options = options;
        self
    }

    /// Set the admin allow-list for the default resolver.
    #[must_use]
    pub fn allow_list(mut self, allow_list: AdminAllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Replace the identity resolution strategy.
    ///
    /// When set, the allow-list passed to [`Self::allow_list`] is unused.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the validated bypass configuration.
    #[must_use]
    pub fn bypass(mut self, bypass: BypassConfig) -> Self {
        self.bypass = bypass;
        self
    }

    /// Set the login redirect path.
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Set the forbidden redirect path.
    #[must_use]
    pub fn forbidden_redirect(mut self, path: impl Into<String>) -> Self {
        self.forbidden_redirect = path.into();
        self
    }

    /// Build the policy.
    #[must_use]
    pub fn build(self) -> GatewayPolicy {
        let verifier = TokenVerifier::new(self.secret.as_ref(), self.verify_options);
        if !verifier.is_configured() {
            tracing::error!("JWT secret key is missing; protected routes will fail with 500");
        }

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(ClaimsResolver::new(self.allow_list)));

        GatewayPolicy {
            routes: self
                .routes
                .unwrap_or_else(|| RouteTable::for_surface(storegate_core::SurfaceKind::Admin)),
            verifier,
            resolver,
            bypass: self.bypass,
            login_path: self.login_path,
            forbidden_redirect: self.forbidden_redirect,
        }
    }
}
