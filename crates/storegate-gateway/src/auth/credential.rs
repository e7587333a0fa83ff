//! Bearer credential extraction.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use super::cookies::{TOKEN_COOKIE, cookie_value};

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The `token` cookie.
    Cookie,
    /// An `Authorization: Bearer` header.
    Header,
}

/// Opaque bearer string presented by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

impl Credential {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            token: token.into(),
            source,
        }
    }

    /// Raw token text.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Where the token came from.
    #[must_use]
    pub const fn source(&self) -> CredentialSource {
        self.source
    }

    /// Locate the request's credential.
    ///
    /// The `token` cookie wins over the `Authorization` header. The header
    /// must start with exactly `Bearer ` (case-sensitive); any other scheme is
    /// ignored. Empty values count as absent.
    #[must_use]
    pub fn extract(headers: &HeaderMap) -> Option<Self> {
        if let Some(token) = cookie_value(headers, TOKEN_COOKIE).filter(|t| !t.is_empty()) {
            return Some(Self::new(token, CredentialSource::Cookie));
        }

        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::from_authorization)
            .map(|token| Self::new(token, CredentialSource::Header))
    }

    /// Extract the token from an `Authorization` header value.
    ///
    /// Expects format: "Bearer <token>"
    #[must_use]
    pub fn from_authorization(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ").filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
