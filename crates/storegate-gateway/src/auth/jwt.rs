//! Bearer token verification.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use storegate_core::SigningSecret;
use thiserror::Error;

/// Why a token was rejected.
///
/// Everything except [`TokenError::MissingSecret`] produces the same external
/// outcome; the variant only feeds logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No verification secret configured. Operator error, not the caller's.
    #[error("verification secret is not configured")]
    MissingSecret,

    /// Not a structurally valid token, or the payload does not decode.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature mismatch or unexpected algorithm.
    #[error("invalid signature")]
    InvalidSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// `nbf` is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// `sub` is absent or empty.
    #[error("token has no subject")]
    MissingSubject,
}

impl TokenError {
    /// Whether this is a configuration failure rather than a bad credential.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingSecret)
    }

    /// Short label for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingSecret => "missing_secret",
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::MissingSubject => "missing_subject",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// Verified token payload.
///
/// Only [`TokenVerifier::verify`] produces these, and `sub` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Admin flag asserted by the issuer.
    #[serde(rename = "isAdmin", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    /// Role name asserted by the issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Wire shape of the payload before the subject check.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default, rename = "isAdmin")]
    is_admin: Option<bool>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = TokenError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let sub = raw
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MissingSubject)?;

        Ok(Self {
            sub,
            is_admin: raw.is_admin,
            role: raw.role,
            exp: raw.exp,
            iat: raw.iat,
        })
    }
}

/// Verification options.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Reject tokens without `exp`.
    pub require_expiry: bool,
    /// Clock skew tolerance.
    pub leeway: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            require_expiry: true,
            leeway: Duration::ZERO,
        }
    }
}

/// HS256 verifier bound to the configured secret.
///
/// A verifier built without a secret still exists; every call then fails
/// with [`TokenError::MissingSecret`].
pub struct TokenVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier.
    #[must_use]
    pub fn new(secret: Option<&SigningSecret>, options: VerifyOptions) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = options.leeway.as_secs();
        validation.validate_exp = true;
        if options.require_expiry {
            validation.set_required_spec_claims(&["exp"]);
        } else {
            validation.set_required_spec_claims::<&str>(&[]);
        }

        Self {
            key: secret.map(|s| DecodingKey::from_secret(s.expose())),
            validation,
        }
    }

    /// Whether a secret is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingSecret`] when unconfigured, otherwise the
    /// reason the token was rejected.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let key = self.key.as_ref().ok_or(TokenError::MissingSecret)?;
        let data = decode::<RawClaims>(token, key, &self.validation)?;
        Claims::try_from(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("configured", &self.is_configured())
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}
