//! Route classification.

use storegate_core::{PolicyTier, RouteRule, SurfaceKind};

/// Paths under this prefix skip every check.
pub const AUTH_EXEMPT_PREFIX: &str = "/api/auth";
/// Paths under this prefix get JSON denials instead of redirects.
pub const API_PREFIX: &str = "/api";

/// Static path -> tier mapping.
///
/// Exempt prefixes are checked first and always yield [`PolicyTier::Public`].
/// Remaining paths take the tier of the first matching rule, or
/// `default_tier` when nothing matches.
#[derive(Debug, Clone)]
pub struct RouteTable {
    exempt_prefixes: Vec<String>,
    api_prefix: String,
    rules: Vec<RouteRule>,
    default_tier: PolicyTier,
}

impl RouteTable {
    /// Create a table with the standard `/api/auth` exemption.
    #[must_use]
    pub fn new(rules: Vec<RouteRule>, default_tier: PolicyTier) -> Self {
        Self {
            exempt_prefixes: vec![AUTH_EXEMPT_PREFIX.to_string()],
            api_prefix: API_PREFIX.to_string(),
            rules,
            default_tier,
        }
    }

    /// Preset table for a surface.
    #[must_use]
    pub fn for_surface(surface: SurfaceKind) -> Self {
        Self::new(SurfaceProfile::for_kind(surface).rules(), PolicyTier::Public)
    }

    /// Whether the path bypasses the gateway entirely.
    ///
    /// This is a raw string prefix test: `/api/authorize` is exempt too.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Whether the path is an API route.
    #[must_use]
    pub fn is_api(&self, path: &str) -> bool {
        path.starts_with(self.api_prefix.as_str())
    }

    /// Map a request path to the tier it requires.
    #[must_use]
    pub fn classify(&self, path: &str) -> PolicyTier {
        if self.is_exempt(path) {
            return PolicyTier::Public;
        }

        self.matching_rule(path)
            .map_or(self.default_tier, |rule| rule.tier)
    }

    /// Map a request path, as received, to the tier it requires.
    ///
    /// The path is classified as sent, with dot segments and repeated
    /// slashes resolved, and with encoded separators decoded as well. The
    /// strictest result wins, so no spelling of a protected path lands on a
    /// weaker tier than its canonical form.
    #[must_use]
    pub fn classify_request(&self, path: &str) -> PolicyTier {
        path_variants(path)
            .iter()
            .map(|p| self.classify(p))
            .fold(self.classify(path), Ord::max)
    }

    /// Whether any reading of the request path is an API route.
    #[must_use]
    pub fn is_api_request(&self, path: &str) -> bool {
        self.is_api(path) || path_variants(path).iter().any(|p| self.is_api(p))
    }

    /// First rule matching `path`, if any.
    #[must_use]
    pub fn matching_rule(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Configured rules, in match order.
    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Tier for unmatched paths.
    #[must_use]
    pub const fn default_tier(&self) -> PolicyTier {
        self.default_tier
    }
}

/// Canonical form of a request path.
///
/// Decodes percent-encoded unreserved characters (so `%2e` is a dot),
/// collapses empty segments, and resolves `.` and `..`. Encoded slashes
/// stay encoded. The result always starts with `/` and has no trailing slash.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let decoded = decode_percent(path, is_unreserved);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut out = String::with_capacity(decoded.len());
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Normalized readings of a raw path: as a browser would, and as a router
/// that also decodes `%2F` / `%5C` into separators would.
fn path_variants(path: &str) -> [String; 2] {
    let separators = decode_percent(path, |b| b == b'/' || b == b'\\').replace('\\', "/");
    [normalize_path(path), normalize_path(&separators)]
}

const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Decode `%XX` escapes whose byte passes `keep`. Other escapes are left as is.
fn decode_percent(path: &str, keep: impl Fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let byte = tail
            .get(1..3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .filter(|b| keep(*b));

        match byte {
            Some(b) => {
                out.push(char::from(b));
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Per-surface presets: route rules and bypass defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceProfile {
    /// Which surface this profile describes.
    pub kind: SurfaceKind,
    /// Bypass user id when none is configured. `None` keeps the bypass off.
    pub bypass_user_default: Option<&'static str>,
    /// Bypass admin flag when none is configured.
    pub bypass_admin_default: bool,
}

impl SurfaceProfile {
    /// Admin console profile.
    #[must_use]
    pub const fn admin() -> Self {
        Self {
            kind: SurfaceKind::Admin,
            bypass_user_default: Some("dev-admin-id"),
            bypass_admin_default: true,
        }
    }

    /// Storefront profile.
    #[must_use]
    pub const fn storefront() -> Self {
        Self {
            kind: SurfaceKind::Storefront,
            bypass_user_default: None,
            bypass_admin_default: false,
        }
    }

    /// Profile for a surface kind.
    #[must_use]
    pub const fn for_kind(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Admin => Self::admin(),
            SurfaceKind::Storefront => Self::storefront(),
        }
    }

    /// Default route rules. Admin rules come first so they win over `/api`.
    #[must_use]
    pub fn rules(&self) -> Vec<RouteRule> {
        match self.kind {
            SurfaceKind::Admin => {
                let mut rules = vec![
                    RouteRule::prefix("/reports", PolicyTier::AdminOnly),
                    RouteRule::prefix("/api/reports", PolicyTier::AdminOnly),
                    RouteRule::exact("/", PolicyTier::Authenticated),
                ];
                rules.extend(
                    [
                        "/products",
                        "/banners",
                        "/orders",
                        "/categories",
                        "/payments",
                        "/codes",
                        "/users",
                        "/api",
                    ]
                    .into_iter()
                    .map(|p| RouteRule::prefix(p, PolicyTier::Authenticated)),
                );
                rules
            }
            SurfaceKind::Storefront => vec![
                RouteRule::prefix("/profile", PolicyTier::Authenticated),
                RouteRule::prefix("/api", PolicyTier::Authenticated),
            ],
        }
    }
}
