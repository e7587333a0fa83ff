//! Gateway server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::Uri,
    middleware::from_fn_with_state,
    routing::get,
};
use serde_json::json;
use storegate_core::{Config, SurfaceKind};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::GatewayError;
use crate::auth::{GatewayPolicy, OptionalIdentity, RequireIdentity, authorize};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address.
    pub bind_address: String,
    /// Surface being protected. Reported by `/health`.
    pub surface: SurfaceKind,
    /// Per-request timeout for downstream handlers.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "127.0.0.1".to_string(),
            surface: SurfaceKind::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Derive host settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.server.port,
            bind_address: config.server.mode.address(),
            surface: config.server.surface,
            timeout: Duration::from_secs(config.server.timeout_secs),
        }
    }
}

/// Gateway server.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    policy: Arc<GatewayPolicy>,
}

/// Builder for constructing a Gateway.
#[derive(Debug, Default)]
pub struct GatewayBuilder {
    config: GatewayConfig,
    policy: Option<Arc<GatewayPolicy>>,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gateway configuration.
    #[must_use]
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the authorization policy.
    #[must_use]
    pub fn with_policy(mut self, policy: GatewayPolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if no policy was supplied.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let policy = self
            .policy
            .ok_or_else(|| GatewayError::Config("Gateway policy is required".to_string()))?;

        Ok(Gateway {
            config: self.config,
            policy,
        })
    }
}

impl Gateway {
    /// Create a gateway from loaded configuration.
    ///
    /// The caller is expected to have applied environment overrides already.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration fails validation.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        GatewayBuilder::new()
            .with_config(GatewayConfig::from_config(config))
            .with_policy(GatewayPolicy::from_config(config))
            .build()
    }

    /// Host configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Shared authorization policy.
    #[must_use]
    pub fn policy(&self) -> Arc<GatewayPolicy> {
        Arc::clone(&self.policy)
    }

    /// Build the router.
    ///
    /// `/health` is mounted outside the authorization layer. Everything else,
    /// including the fallback, goes through [`authorize`].
    #[must_use]
    pub fn router(&self) -> Router {
        let surface = self.config.surface;

        Router::new()
            .route("/api/whoami", get(whoami_handler))
            .fallback(echo_handler)
            .layer(from_fn_with_state(Arc::clone(&self.policy), authorize))
            .route("/health", get(move || health_handler(surface)))
            .layer(TimeoutLayer::new(self.config.timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the gateway server until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or the listener fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!(
            surface = %self.config.surface,
            "Gateway listening on http://{}",
            addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(surface: SurfaceKind) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "surface": surface,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn whoami_handler(RequireIdentity(identity): RequireIdentity) -> Json<serde_json::Value> {
    Json(json!({ "identity": identity }))
}

async fn echo_handler(uri: Uri, OptionalIdentity(identity): OptionalIdentity) -> Json<serde_json::Value> {
    Json(json!({
        "path": uri.path(),
        "identity": identity,
    }))
}
