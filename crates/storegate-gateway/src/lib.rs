//! # Storegate Gateway
//!
//! Edge authorization for an e-commerce admin panel and storefront: route
//! classification, bearer verification, identity injection, and an axum host.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and authorization.
pub mod auth;
mod server;

pub use auth::{AuthError, GatewayPolicy, GatewayPolicyBuilder, authorize};
pub use server::{Gateway, GatewayBuilder, GatewayConfig};

/// Start the gateway server from loaded configuration.
///
/// # Errors
///
/// Returns error if the configuration is invalid or the server fails to start.
pub async fn start(config: &storegate_core::Config) -> Result<(), GatewayError> {
    let gateway = Gateway::new(config)?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
