//! CLI bootstrap - resolves configuration, the composition root is
//! `transcribe_axum::bootstrap` itself for `serve`.

use std::path::PathBuf;

use anyhow::Result;

use transcribe_axum::{CorsConfig, ServerConfig};
use transcribe_core::settings::Settings;

/// Resolved configuration for the `serve` command.
#[derive(Debug, Clone)]
pub struct ServeArgs {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub cors_origins: Vec<String>,
}

impl ServeArgs {
    #[must_use]
    pub fn into_server_config(self) -> ServerConfig {
        let cors = if self.cors_origins.is_empty() {
            CorsConfig::AllowAll
        } else {
            CorsConfig::AllowOrigins(self.cors_origins)
        };

        ServerConfig {
            port: self.port,
            settings: Settings::from_env(),
            static_dir: self.static_dir,
            cors,
        }
    }
}

/// Resolve the SQLite database path from `Settings`, for commands that
/// need it without starting the full server (`migrate`).
#[must_use]
pub fn resolve_db_path(settings: &Settings) -> PathBuf {
    settings
        .store_url
        .strip_prefix("sqlite://")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("transcribe.db"))
}

/// Validate settings loaded from the environment before they reach the
/// server or the migration runner.
pub fn load_and_validate_settings() -> Result<Settings> {
    let settings = Settings::from_env();
    transcribe_core::settings::validate_settings(&settings)
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(settings)
}
