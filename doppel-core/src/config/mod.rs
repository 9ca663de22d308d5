//! Configuration management for doppel.
//!
//! This module provides a unified configuration system that separates
//! secrets (from environment variables) from settings (from TOML files).
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `ANTHROPIC_API_KEY` - Anthropic API key
//! - `GEMINI_API_KEY` - Gemini API key
//! - `TELEGRAM_BOT_TOKEN` - Telegram bot token
//!
//! ## Settings (TOML File)
//! Located at `~/.config/doppel/config.toml`:
//! ```toml
//! chain = ["anthropic", "gemini"]
//!
//! [providers.anthropic]
//! model = "claude-3-opus-20240229"
//!
//! [watch]
//! poll_interval_ms = 2000
//! error_backoff_ms = 5000
//!
//! [telegram]
//! enabled = true
//! ```

mod secrets;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use crate::message::ProviderKind;

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    BrokerSettings, PersonaSettings, ProviderChain, ProviderConfig, Settings, SettingsError,
    TelegramSettings, WatchSettings,
};

/// Combined configuration containing both secrets and settings.
///
/// This is the main configuration type used throughout the application.
/// It is captured once at startup and passed down by value; nothing reads
/// configuration from mutable global state after that.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Provider chain is empty; set `chain` in the config file")]
    ChainNotSet,

    #[error("Provider chain entry is not a known provider: {0}")]
    UnknownProvider(String),

    #[error("No provider in the chain has a configured API key")]
    NoUsableProvider,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// This loads:
    /// 1. Secrets from environment variables
    /// 2. Settings from TOML file (creating defaults if needed)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No provider API keys are configured at all
    /// - The chain is empty or names an unknown provider
    /// - No provider in the chain has an API key
    /// - The TOML file cannot be read or parsed
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;

        let config = Self { secrets, settings };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.chain.is_empty() {
            return Err(ConfigError::ChainNotSet);
        }
        let kinds = self
            .settings
            .chain
            .kinds()
            .map_err(ConfigError::UnknownProvider)?;
        if !kinds.iter().any(|kind| self.secrets.has_provider(*kind)) {
            return Err(ConfigError::NoUsableProvider);
        }
        Ok(())
    }

    /// The configured chain restricted to providers with API keys,
    /// in priority order.
    pub fn usable_chain(&self) -> Result<Vec<ProviderKind>, ConfigError> {
        let kinds = self
            .settings
            .chain
            .kinds()
            .map_err(ConfigError::UnknownProvider)?;
        Ok(kinds
            .into_iter()
            .filter(|kind| self.secrets.has_provider(*kind))
            .collect())
    }

    /// Model identifier for a provider, with the built-in default as
    /// fallback when the providers table has no entry.
    pub fn model_for(&self, kind: ProviderKind) -> &str {
        self.settings.model_for(kind).unwrap_or(match kind {
            ProviderKind::Anthropic => "claude-3-opus-20240229",
            ProviderKind::Gemini => "gemini-pro",
        })
    }

    /// API key for a provider (if configured).
    pub fn provider_key(&self, kind: ProviderKind) -> Option<&str> {
        self.secrets.provider_key(kind)
    }

    /// Per-attempt timeout for provider calls.
    pub fn per_attempt_timeout(&self) -> Duration {
        self.settings.per_attempt_timeout()
    }

    /// Poll interval for watch loops.
    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval()
    }

    /// Error backoff for watch loops.
    pub fn error_backoff(&self) -> Duration {
        self.settings.error_backoff()
    }

    /// Check if the Telegram surface is enabled and has a token.
    pub fn telegram_enabled(&self) -> bool {
        self.settings.telegram.enabled && self.secrets.telegram_bot_token.is_some()
    }

    /// Get the Telegram bot token (if configured).
    pub fn telegram_bot_token(&self) -> Option<&str> {
        self.secrets.telegram_bot_token.as_deref()
    }

    /// Persona profile path (whether or not the file exists yet).
    pub fn persona_profile_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.settings.persona_profile_path()?)
    }
}

/// Load .env file if it exists (for development convenience).
///
/// This is called automatically by `Config::load()` but is also
/// exported for use in other contexts.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
