//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILINTAKE_CONFIG` (environment variable)
//! 2. `~/.config/mailintake/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailintake\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Selected values can then be overridden from the environment, which is how
//! the webhook secret is normally supplied.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Webhook authentication.
    pub webhook: WebhookConfig,
    /// Intake policy.
    pub intake: IntakeConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override directory for log files.
    pub log_dir: Option<PathBuf>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Largest accepted request body in bytes (default: 26214400 = 25 MB).
    pub max_body_bytes: usize,
}

/// Webhook authentication settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret used to verify signatures. Requests are refused without it.
    pub secret: Option<String>,
    /// Deployment environment name, reported by `/health`.
    pub environment: String,
}

/// Intake policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// File incidents from senders that match no client instead of rejecting them.
    pub handle_unknown_senders: bool,
    /// Client record that collects incidents from unknown senders.
    pub unknown_client_id: Option<String>,
    /// Return the existing incident when a provider message id is redelivered.
    pub deduplicate_message_ids: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            max_body_bytes: 25 * 1024 * 1024, // 25 MB
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            environment: "production".to_string(),
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            handle_unknown_senders: false,
            unknown_client_id: None,
            deduplicate_message_ids: true,
        }
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .field("environment", &self.environment)
            .finish()
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations, then apply env overrides.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    let mut config = Config::default();
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => config = cfg,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Load configuration from an explicit file. Errors are returned, not swallowed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| IntakeError::io(path, e))?;
    let config = toml::from_str::<Config>(&contents).map_err(|e| IntakeError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Apply `MAILINTAKE_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(secret) = lookup("MAILINTAKE_WEBHOOK_SECRET").filter(|s| !s.is_empty()) {
        config.webhook.secret = Some(secret);
    }
    if let Some(environment) = lookup("MAILINTAKE_ENVIRONMENT").filter(|s| !s.is_empty()) {
        config.webhook.environment = environment;
    }
    if let Some(flag) = lookup("MAILINTAKE_HANDLE_UNKNOWN_SENDERS") {
        match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => config.intake.handle_unknown_senders = true,
            "0" | "false" | "no" | "off" => config.intake.handle_unknown_senders = false,
            other => tracing::warn!(value = %other, "Ignoring unrecognized MAILINTAKE_HANDLE_UNKNOWN_SENDERS"),
        }
    }
    if let Some(id) = lookup("MAILINTAKE_UNKNOWN_CLIENT_ID").filter(|s| !s.is_empty()) {
        config.intake.unknown_client_id = Some(id);
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("MAILINTAKE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("mailintake").join("config.toml"))
}

/// Return the directory log files are written to.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailintake")
}
