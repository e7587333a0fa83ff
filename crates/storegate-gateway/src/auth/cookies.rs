//! Cookie parsing and `Set-Cookie` rendering.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

/// Cookie carrying the bearer credential.
pub const TOKEN_COOKIE: &str = "token";
/// Marker cookie for client-side login state.
pub const LOGGED_IN_COOKIE: &str = "logged-in";
/// Script-readable admin flag for client-side UI gating.
pub const IS_ADMIN_COOKIE: &str = "is-admin";
/// Session value planted by the development bypass.
pub const BYPASS_TOKEN_VALUE: &str = "dev-bypass";

/// Read a cookie value from the request headers.
///
/// Multiple `Cookie` headers are searched in order; the first match wins.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"').to_string())
        })
}

/// `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Lax`
    Lax,
}

/// A cookie mutation to apply to the outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    /// Set a cookie at `Path=/`.
    Set {
        /// Cookie name.
        name: &'static str,
        /// Cookie value.
        value: String,
        /// Hide from client scripts.
        http_only: bool,
        /// `SameSite` attribute, if any.
        same_site: Option<SameSite>,
        /// Only send over HTTPS.
        secure: bool,
    },
    /// Expire a cookie at `Path=/`.
    Clear {
        /// Cookie name.
        name: &'static str,
    },
}

impl CookieDirective {
    /// Plain cookie readable by client scripts.
    #[must_use]
    pub fn visible(name: &'static str, value: impl Into<String>) -> Self {
        Self::Set {
            name,
            value: value.into(),
            http_only: false,
            same_site: None,
            secure: false,
        }
    }

    /// Cookie hidden from client scripts.
    #[must_use]
    pub fn protected(name: &'static str, value: impl Into<String>) -> Self {
        Self::Set {
            name,
            value: value.into(),
            http_only: true,
            same_site: None,
            secure: false,
        }
    }

    /// Cookie name this directive affects.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Set { name, .. } | Self::Clear { name } => name,
        }
    }

    /// Render as a `Set-Cookie` header value.
    #[must_use]
    pub fn to_header_string(&self) -> String {
        match self {
            Self::Set {
                name,
                value,
                http_only,
                same_site,
                secure,
            } => {
                let mut out = format!("{name}={value}; Path=/");
                if *http_only {
                    out.push_str("; HttpOnly");
                }
                if let Some(SameSite::Lax) = same_site {
                    out.push_str("; SameSite=Lax");
                }
                if *secure {
                    out.push_str("; Secure");
                }
                out
            }
            Self::Clear { name } => {
                format!("{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
            }
        }
    }

    /// Render as a header value, skipping values that are not valid header text.
    #[must_use]
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_header_string()).ok()
    }
}

/// Directives that wipe every identity cookie.
#[must_use]
pub fn clear_identity_cookies() -> Vec<CookieDirective> {
    [TOKEN_COOKIE, LOGGED_IN_COOKIE, IS_ADMIN_COOKIE]
        .into_iter()
        .map(|name| CookieDirective::Clear { name })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(cookies: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append(COOKIE, HeaderValue::from_static(c));
        }
        headers
    }

    #[test]
    fn test_cookie_value() {
        let headers = headers_with(&["theme=dark; token=abc.def.ghi; logged-in=true"]);
        assert_eq!(cookie_value(&headers, "token").as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(&headers, "logged-in").as_deref(), Some("true"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_no_prefix_confusion() {
        let headers = headers_with(&["xtoken=nope; token_old=nope"]);
        assert_eq!(cookie_value(&headers, "token"), None);
    }

    #[test]
    fn test_cookie_value_multiple_headers() {
        let headers = headers_with(&["theme=dark", "token=second-header"]);
        assert_eq!(cookie_value(&headers, "token").as_deref(), Some("second-header"));
    }

    #[test]
    fn test_set_cookie_rendering() {
        assert_eq!(
            CookieDirective::protected(TOKEN_COOKIE, "dev-bypass").to_header_string(),
            "token=dev-bypass; Path=/; HttpOnly"
        );
        assert_eq!(
            CookieDirective::visible(IS_ADMIN_COOKIE, "true").to_header_string(),
            "is-admin=true; Path=/"
        );

        let lax = CookieDirective::Set {
            name: IS_ADMIN_COOKIE,
            value: "false".to_string(),
            http_only: false,
            same_site: Some(SameSite::Lax),
            secure: true,
        };
        assert_eq!(
            lax.to_header_string(),
            "is-admin=false; Path=/; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn test_clear_identity_cookies() {
        let cleared = clear_identity_cookies();
        let names: Vec<_> = cleared.iter().map(CookieDirective::name).collect();
        assert_eq!(names, vec!["token", "logged-in", "is-admin"]);
        assert!(cleared[0].to_header_string().starts_with("token=; Path=/; Max-Age=0"));
    }
}
