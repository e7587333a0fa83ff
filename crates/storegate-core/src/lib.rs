//! # Storegate Core
//!
//! Core types, configuration, and secrets for the storegate edge gateway.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 format) with environment overlays
//! - Policy and identity types shared by the gateway and the CLI
//! - A redacting wrapper for the token verification secret

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;
pub mod types;

pub use config::{BypassSettings, Config, ConfigError, GatewaySettings};
pub use secrets::SigningSecret;
pub use types::{DeploymentMode, Identity, PolicyTier, RouteRule, SurfaceKind};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::secrets::SigningSecret;
    pub use crate::types::*;
}
