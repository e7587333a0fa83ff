//! Authorization middleware for axum.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderName, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use storegate_core::Identity;

use super::AuthError;
use super::config::GatewayPolicy;
use super::cookies::{CookieDirective, clear_identity_cookies};
use super::decision::{Decision, Outcome};
use super::jwt::TokenError;

/// Injected user id, for downstream handlers that read headers.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
/// Injected admin flag (`"true"` / `"false"`).
pub const USER_ADMIN_HEADER: HeaderName = HeaderName::from_static("x-user-admin");

/// JSON body of an API denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// HTTP status, repeated in the body.
    pub status: u16,
    /// Reason code (`UNAUTHORIZED`, `FORBIDDEN`, ...).
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            status: status.as_u16(),
            message: self.reason_code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Gate every request through the policy.
///
/// Install with `axum::middleware::from_fn_with_state(policy, authorize)`.
/// Client-supplied identity headers are always stripped, so downstream code
/// can trust `x-user-id` / `x-user-admin` whenever they are present.
pub async fn authorize(
    State(policy): State<Arc<GatewayPolicy>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers_mut();
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_ADMIN_HEADER);

    let decision = policy.decide(request.uri().path(), request.headers());

    let identity = match decision.outcome {
        Outcome::Deny(_) => return deny(&policy, decision),
        Outcome::Forward(ref identity) => identity.clone(),
    };

    if let Some(identity) = identity {
        let Ok(user_id) = HeaderValue::from_str(&identity.user_id) else {
            tracing::warn!("Token subject is not a valid header value");
            let cookies = if decision.is_api {
                Vec::new()
            } else {
                clear_identity_cookies()
            };
            let rejected = Decision {
                outcome: Outcome::Deny(AuthError::CredentialInvalid(TokenError::Malformed(
                    "subject is not a valid header value".to_string(),
                ))),
                cookies,
                ..decision
            };
            return deny(&policy, rejected);
        };

        let headers = request.headers_mut();
        headers.insert(USER_ID_HEADER, user_id);
        headers.insert(
            USER_ADMIN_HEADER,
            HeaderValue::from_static(if identity.is_admin { "true" } else { "false" }),
        );
        request.extensions_mut().insert(identity);
    }

    let response = next.run(request).await;
    with_cookies(response, &decision.cookies)
}

/// Render a denial: JSON for API routes, redirect for pages.
///
/// A missing secret is always a JSON 500, whatever the route.
fn deny(policy: &GatewayPolicy, decision: Decision) -> Response {
    let Outcome::Deny(error) = decision.outcome else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let response = if decision.is_api || matches!(error, AuthError::Config) {
        error.into_response()
    } else if error.is_unauthenticated() {
        redirect(policy.login_path())
    } else {
        redirect(policy.forbidden_redirect())
    };

    with_cookies(response, &decision.cookies)
}

/// 307 to `location`, or a 500 if the configured target is not header-safe.
fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!("Redirect target is not a valid header value");
            AuthError::Config.into_response()
        }
    }
}

fn with_cookies(mut response: Response, cookies: &[CookieDirective]) -> Response {
    let headers = response.headers_mut();
    for value in cookies.iter().filter_map(CookieDirective::to_header_value) {
        headers.append(SET_COOKIE, value);
    }
    response
}

/// Extractor for requests the gateway forwarded with an identity.
///
/// Use this in handler parameters to require authentication.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub Identity);

impl RequireIdentity {
    /// Get the user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }

    /// Check if user is admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.0.is_admin
    }
}

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AuthError::CredentialAbsent.into_response())
    }
}

/// Extractor for optional identity.
///
/// `None` on public routes, `Some` wherever the gateway resolved one.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Identity>().cloned()))
    }
}

/// Require admin role extractor.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Identity);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireIdentity(identity) = RequireIdentity::from_request_parts(parts, state).await?;

        if !identity.is_admin {
            return Err(AuthError::InsufficientRole.into_response());
        }

        Ok(Self(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AdminAllowList, BypassConfig, RouteTable};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::header::{AUTHORIZATION, COOKIE},
        middleware::from_fn_with_state,
        routing::get,
    };
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use storegate_core::{DeploymentMode, SigningSecret, SurfaceKind};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-0123456789ab";

    fn sign(payload: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn valid_token(sub: &str, is_admin: bool) -> String {
        sign(&json!({ "sub": sub, "isAdmin": is_admin, "exp": Utc::now().timestamp() + 3600 }))
    }

    fn expired_token(sub: &str) -> String {
        sign(&json!({ "sub": sub, "exp": Utc::now().timestamp() - 3600 }))
    }

    async fn echo(parts: axum::http::HeaderMap, OptionalIdentity(identity): OptionalIdentity) -> Json<serde_json::Value> {
        let header = |name: &HeaderName| {
            parts
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "identity": identity,
            "userIdHeader": header(&USER_ID_HEADER),
            "adminHeader": header(&USER_ADMIN_HEADER),
        }))
    }

    async fn admin_only(RequireAdmin(identity): RequireAdmin) -> String {
        identity.user_id
    }

    fn app(policy: GatewayPolicy) -> Router {
        Router::new()
            .route("/internal/admin", get(admin_only))
            .fallback(echo)
            .layer(from_fn_with_state(Arc::new(policy), authorize))
    }

    fn admin_policy() -> GatewayPolicy {
        GatewayPolicy::builder()
            .routes(RouteTable::for_surface(SurfaceKind::Admin))
            .secret(Some(SigningSecret::new(SECRET.to_string())))
            .build()
    }

    fn storefront_policy(secret: Option<&str>) -> GatewayPolicy {
        GatewayPolicy::builder()
            .routes(RouteTable::for_surface(SurfaceKind::Storefront))
            .secret(secret.map(|s| SigningSecret::new(s.to_string())))
            .build()
    }

    fn request(path: &str) -> axum::http::request::Builder {
        axum::http::Request::builder().uri(path)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_api_admin_route_with_non_admin_header_token() {
        let response = app(admin_policy())
            .oneshot(
                request("/api/reports/orders")
                    .header(AUTHORIZATION, format!("Bearer {}", valid_token("user_1", false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(set_cookies(&response).is_empty());
        let body = json_body(response).await;
        assert_eq!(body, json!({ "status": 403, "message": "FORBIDDEN" }));
    }

    #[tokio::test]
    async fn test_admin_page_without_credential_redirects_to_login() {
        let response = app(admin_policy())
            .oneshot(request("/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_auth_routes_pass_untouched() {
        let response = app(storefront_policy(None))
            .oneshot(
                request("/api/auth/login")
                    .header(COOKIE, "token=whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        let body = json_body(response).await;
        assert_eq!(body["identity"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_missing_secret_returns_500() {
        let response = app(storefront_policy(None))
            .oneshot(
                request("/profile")
                    .header(COOKIE, format!("token={}", valid_token("user_1", false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body, json!({ "status": 500, "message": "Internal Server Error" }));
    }

    #[tokio::test]
    async fn test_expired_page_credential_redirects_and_clears_cookies() {
        let response = app(admin_policy())
            .oneshot(
                request("/orders")
                    .header(COOKIE, format!("token={}; logged-in=true", expired_token("user_1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");

        let cookies = set_cookies(&response);
        for name in ["token", "logged-in", "is-admin"] {
            assert!(
                cookies.iter().any(|c| c.starts_with(&format!("{name}=;")) && c.contains("Max-Age=0")),
                "{name} not cleared in {cookies:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_api_unauthenticated_reason_codes() {
        let response = app(storefront_policy(Some(SECRET)))
            .oneshot(request("/api/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], "INVALID TOKEN");

        let response = app(storefront_policy(Some(SECRET)))
            .oneshot(
                request("/api/orders")
                    .header(AUTHORIZATION, format!("Bearer {}", expired_token("u")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(json_body(response).await["message"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_dot_segment_path_is_gated_like_its_target() {
        let response = app(admin_policy())
            .oneshot(
                request("/api/auth/../api/reports/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body, json!({ "status": 401, "message": "INVALID TOKEN" }));

        let response = app(admin_policy())
            .oneshot(request("//reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_unencodable_login_path_is_a_server_error() {
        let policy = GatewayPolicy::builder()
            .secret(Some(SigningSecret::new(SECRET.to_string())))
            .login_path("/login\u{7}")
            .build();

        let response = app(policy)
            .oneshot(request("/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_forbidden_page_redirects_home_without_clearing() {
        let response = app(admin_policy())
            .oneshot(
                request("/reports")
                    .header(COOKIE, format!("token={}", valid_token("user_1", false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_forward_injects_identity_and_refreshes_cookie() {
        let response = app(admin_policy())
            .oneshot(
                request("/reports/daily")
                    .header(AUTHORIZATION, format!("Bearer {}", valid_token("admin_1", true)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(set_cookies(&response), vec!["is-admin=true; Path=/"]);
        let body = json_body(response).await;
        assert_eq!(body["identity"], json!({ "userId": "admin_1", "isAdmin": true }));
        assert_eq!(body["userIdHeader"], "admin_1");
        assert_eq!(body["adminHeader"], "true");
    }

    #[tokio::test]
    async fn test_spoofed_identity_headers_are_stripped() {
        let response = app(admin_policy())
            .oneshot(
                request("/login")
                    .header("x-user-id", "attacker")
                    .header("x-user-admin", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["userIdHeader"], serde_json::Value::Null);
        assert_eq!(body["adminHeader"], serde_json::Value::Null);

        let response = app(admin_policy())
            .oneshot(
                request("/orders")
                    .header(COOKIE, format!("token={}", valid_token("user_1", false)))
                    .header("x-user-admin", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["adminHeader"], "false");
    }

    #[tokio::test]
    async fn test_bypass_sets_dev_cookies() {
        let policy = GatewayPolicy::builder()
            .bypass(BypassConfig::new(DeploymentMode::Development, true, "dev-admin-id", true))
            .build();

        let response = app(policy)
            .oneshot(request("/api/reports/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(cookies.contains(&"token=dev-bypass; Path=/; HttpOnly".to_string()));
        assert!(cookies.contains(&"logged-in=true; Path=/".to_string()));
        assert!(cookies.contains(&"is-admin=true; Path=/; SameSite=Lax".to_string()));
        assert_eq!(json_body(response).await["userIdHeader"], "dev-admin-id");
    }

    #[tokio::test]
    async fn test_production_never_bypasses() {
        let policy = GatewayPolicy::builder()
            .secret(Some(SigningSecret::new(SECRET.to_string())))
            .allow_list(AdminAllowList::default())
            .bypass(BypassConfig::new(DeploymentMode::Production, true, "dev-admin-id", true))
            .build();

        let response = app(policy)
            .oneshot(request("/api/reports/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin_extractor() {
        let policy = GatewayPolicy::builder()
            .routes(RouteTable::new(
                vec![storegate_core::RouteRule::prefix(
                    "/internal",
                    storegate_core::PolicyTier::Authenticated,
                )],
                storegate_core::PolicyTier::Public,
            ))
            .secret(Some(SigningSecret::new(SECRET.to_string())))
            .build();

        let response = app(policy)
            .oneshot(
                request("/internal/admin")
                    .header(AUTHORIZATION, format!("Bearer {}", valid_token("user_1", false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_identity_without_gateway_identity() {
        async fn needs_identity(identity: RequireIdentity) -> String {
            identity.user_id().to_string()
        }

        let router: Router = Router::new().route("/open", get(needs_identity));
        let response = router
            .oneshot(request("/open").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
