//! Secret handling.
//!
//! `SigningSecret` wraps the token verification key so it never shows up
//! in logs or debug output.

use secrecy::{ExposeSecret, SecretBox};

/// Shared secret used to verify HS256 bearer tokens.
///
/// The inner value is wrapped with `secrecy::SecretBox` to ensure
/// it's not accidentally printed in logs or debug output.
pub struct SigningSecret(SecretBox<str>);

impl SigningSecret {
    /// Create a new signing secret.
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(SecretBox::new(secret.into_boxed_str()))
    }

    /// Build a secret from an optional configured value.
    ///
    /// Empty or whitespace-only values count as "not configured".
    #[must_use]
    pub fn from_configured(value: Option<&str>) -> Option<Self> {
        value
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::new(v.to_string()))
    }

    /// Expose the secret bytes for key construction.
    ///
    /// Use sparingly - only when building the verification key.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret([REDACTED])")
    }
}

impl std::fmt::Display for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}
