//! Per-request authorization decision.

use axum::http::HeaderMap;
use storegate_core::{Identity, PolicyTier};
use tracing::{debug, error, warn};

use super::AuthError;
use super::config::GatewayPolicy;
use super::cookies::{
    BYPASS_TOKEN_VALUE, CookieDirective, IS_ADMIN_COOKIE, LOGGED_IN_COOKIE, SameSite,
    TOKEN_COOKIE, clear_identity_cookies,
};
use super::credential::Credential;

/// Terminal result of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Let the request through. `None` for public and exempt routes.
    Forward(Option<Identity>),
    /// Refuse the request.
    Deny(AuthError),
}

/// Everything the response builder needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Tier the path requires.
    pub tier: PolicyTier,
    /// Whether the path is an API route (JSON denials instead of redirects).
    pub is_api: bool,
    /// Forward or deny.
    pub outcome: Outcome,
    /// Cookie mutations for the outgoing response.
    pub cookies: Vec<CookieDirective>,
}

impl Decision {
    fn forward(tier: PolicyTier, is_api: bool, identity: Option<Identity>) -> Self {
        Self {
            tier,
            is_api,
            outcome: Outcome::Forward(identity),
            cookies: Vec::new(),
        }
    }

    fn deny(tier: PolicyTier, is_api: bool, error: AuthError) -> Self {
        Self {
            tier,
            is_api,
            outcome: Outcome::Deny(error),
            cookies: Vec::new(),
        }
    }

    fn with_cookies(mut self, cookies: Vec<CookieDirective>) -> Self {
        self.cookies = cookies;
        self
    }

    /// The forwarded identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match &self.outcome {
            Outcome::Forward(identity) => identity.as_ref(),
            Outcome::Deny(_) => None,
        }
    }

    /// The denial, if any.
    #[must_use]
    pub const fn denial(&self) -> Option<&AuthError> {
        match &self.outcome {
            Outcome::Deny(error) => Some(error),
            Outcome::Forward(_) => None,
        }
    }

    /// Whether the request goes through.
    #[must_use]
    pub const fn is_forwarded(&self) -> bool {
        matches!(self.outcome, Outcome::Forward(_))
    }
}

impl GatewayPolicy {
    /// Decide what happens to a request.
    ///
    /// Pure with respect to the request: the same path and headers always
    /// produce the same decision.
    #[must_use]
    pub fn decide(&self, path: &str, headers: &HeaderMap) -> Decision {
        let is_api = self.routes.is_api_request(path);

        let tier = self.routes.classify_request(path);
        if !tier.requires_auth() {
            if self.routes.is_exempt(path) {
                debug!(path, "Exempt path, skipping auth");
            }
            return Decision::forward(tier, is_api, None);
        }

        if let Some(identity) = self.bypass.active() {
            return Self::decide_bypass(tier, is_api, identity);
        }

        if !self.verifier.is_configured() {
            error!(path, "JWT secret key is missing");
            return Decision::deny(tier, is_api, AuthError::Config);
        }

        let Some(credential) = Credential::extract(headers) else {
            debug!(path, %tier, "No credential on protected route");
            return Self::deny_unauthenticated(tier, is_api, AuthError::CredentialAbsent);
        };

        let claims = match self.verifier.verify(credential.token()) {
            Ok(claims) => claims,
            Err(err) if err.is_fatal() => {
                error!(path, "JWT secret key is missing");
                return Decision::deny(tier, is_api, AuthError::Config);
            }
            Err(err) => {
                warn!(
                    path,
                    source = ?credential.source(),
                    reason = err.kind(),
                    "Credential rejected"
                );
                return Self::deny_unauthenticated(tier, is_api, AuthError::CredentialInvalid(err));
            }
        };

        let identity = self.resolver.resolve(&claims);

        if tier.requires_admin() && !identity.is_admin {
            debug!(path, user_id = %identity.user_id, "Admin role required");
            return Decision::deny(tier, is_api, AuthError::InsufficientRole);
        }

        debug!(path, %tier, user_id = %identity.user_id, is_admin = identity.is_admin, "Forwarding");
        let admin_flag = CookieDirective::visible(IS_ADMIN_COOKIE, identity.is_admin.to_string());
        Decision::forward(tier, is_api, Some(identity)).with_cookies(vec![admin_flag])
    }

    fn decide_bypass(tier: PolicyTier, is_api: bool, identity: &Identity) -> Decision {
        if tier.requires_admin() && !identity.is_admin {
            debug!(user_id = %identity.user_id, "Bypass identity is not admin");
            return Decision::deny(tier, is_api, AuthError::InsufficientRole);
        }

        let cookies = vec![
            CookieDirective::protected(TOKEN_COOKIE, BYPASS_TOKEN_VALUE),
            CookieDirective::visible(LOGGED_IN_COOKIE, "true"),
            CookieDirective::Set {
                name: IS_ADMIN_COOKIE,
                value: identity.is_admin.to_string(),
                http_only: false,
                same_site: Some(SameSite::Lax),
                secure: false,
            },
        ];

        Decision::forward(tier, is_api, Some(identity.clone())).with_cookies(cookies)
    }

    fn deny_unauthenticated(tier: PolicyTier, is_api: bool, error: AuthError) -> Decision {
        let decision = Decision::deny(tier, is_api, error);
        if is_api {
            decision
        } else {
            decision.with_cookies(clear_identity_cookies())
        }
    }
}
