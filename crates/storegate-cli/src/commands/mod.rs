//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod inspect;
pub mod serve;
pub mod status;

pub use classify::run_classify;
pub use config::run_config;
pub use inspect::run_inspect;
pub use serve::run_serve;
pub use status::run_status;

use std::path::Path;

use anyhow::{Context, Result};
use storegate_core::{Config, SurfaceKind};

/// Read the config file, or defaults when it does not exist.
///
/// No environment overlay is applied.
pub fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Effective configuration for a command.
///
/// The surface is applied before the environment overlay, since the surface
/// decides which bypass user variable is read.
pub fn load_config(path: &Path, surface: Option<SurfaceKind>) -> Result<Config> {
    let mut config = read_config(path)?;
    if let Some(surface) = surface {
        config.server.surface = surface;
    }
    Ok(config.with_env_overrides())
}
