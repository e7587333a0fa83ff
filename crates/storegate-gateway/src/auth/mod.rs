//! Edge authorization for the gateway.
//!
//! This module provides:
//! - Route classification into policy tiers
//! - Bearer credential extraction (cookie, then `Authorization` header)
//! - HS256 token verification
//! - Identity and admin-role resolution, including the development bypass
//! - The per-request decision and its axum middleware

mod config;
pub mod cookies;
mod credential;
mod decision;
mod identity;
mod jwt;
mod middleware;
mod policy;

pub use config::{GatewayPolicy, GatewayPolicyBuilder};
pub use credential::{Credential, CredentialSource};
pub use decision::{Decision, Outcome};
pub use identity::{ADMIN_ROLE, AdminAllowList, BypassConfig, ClaimsResolver, IdentityResolver};
pub use jwt::{Claims, TokenError, TokenVerifier, VerifyOptions};
pub use middleware::{
    ErrorBody, OptionalIdentity, RequireAdmin, RequireIdentity, USER_ADMIN_HEADER, USER_ID_HEADER,
    authorize,
};
pub use policy::{API_PREFIX, AUTH_EXEMPT_PREFIX, RouteTable, SurfaceProfile, normalize_path};

use axum::http::StatusCode;
use thiserror::Error;

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No verification secret configured.
    #[error("Config error: verification secret is not configured")]
    Config,

    /// Protected route, no credential presented.
    #[error("Missing credential")]
    CredentialAbsent,

    /// Credential presented but rejected.
    #[error("Invalid credential: {0}")]
    CredentialInvalid(TokenError),

    /// Valid identity without the required role.
    #[error("Permission denied: admin role required")]
    InsufficientRole,
}

impl AuthError {
    /// HTTP status for API responses.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Config => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CredentialAbsent | Self::CredentialInvalid(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable reason code for API responses.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Config => "Internal Server Error",
            Self::CredentialAbsent => "INVALID TOKEN",
            Self::CredentialInvalid(_) => "UNAUTHORIZED",
            Self::InsufficientRole => "FORBIDDEN",
        }
    }

    /// Whether the caller should re-authenticate.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::CredentialAbsent | Self::CredentialInvalid(_))
    }
}
