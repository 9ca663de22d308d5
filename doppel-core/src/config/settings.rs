//! Settings configuration loaded from TOML files.
//!
//! This module handles non-sensitive configuration stored in TOML format
//! in the XDG config directory (~/.config/doppel/config.toml).

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::message::ProviderKind;

/// Ordered list of providers forming the fallback chain.
///
/// Accepts either a single string (`"anthropic"`) or a list
/// (`["anthropic", "gemini"]`) in the TOML configuration. Serializes back as
/// a string when len==1, list otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderChain(Vec<String>);

impl ProviderChain {
    /// Create from a single provider name.
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Create from multiple provider names.
    pub fn many(names: Vec<String>) -> Self {
        Self(names)
    }

    /// The first (highest-priority) provider name.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|s| s.as_str())
    }

    /// Iterate over all provider names in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parse every entry into a [`ProviderKind`], in priority order.
    pub fn kinds(&self) -> Result<Vec<ProviderKind>, String> {
        self.0.iter().map(|name| name.parse()).collect()
    }
}

impl<'de> Deserialize<'de> for ProviderChain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ProviderChainVisitor;

        impl<'de> Visitor<'de> for ProviderChainVisitor {
            type Value = ProviderChain;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a provider name string or a list of provider name strings")
            }

            fn visit_str<E>(self, value: &str) -> Result<ProviderChain, E>
            where
                E: de::Error,
            {
                if value.is_empty() {
                    Ok(ProviderChain(Vec::new()))
                } else {
                    Ok(ProviderChain(vec![value.to_string()]))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<ProviderChain, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut names = Vec::new();
                while let Some(name) = seq.next_element::<String>()? {
                    if !name.trim().is_empty() {
                        names.push(name);
                    }
                }
                Ok(ProviderChain(names))
            }
        }

        deserializer.deserialize_any(ProviderChainVisitor)
    }
}

impl Serialize for ProviderChain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.0.len() == 1 {
            serializer.serialize_str(&self.0[0])
        } else {
            self.0.serialize(serializer)
        }
    }
}

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# doppel configuration file
# Located at: ~/.config/doppel/config.toml
#
# This file contains non-sensitive configuration.
# Secrets (API keys) are loaded from environment variables:
#   - ANTHROPIC_API_KEY
#   - GEMINI_API_KEY
#   - TELEGRAM_BOT_TOKEN

# Provider fallback chain, in priority order. A provider without a configured
# API key is skipped at startup.
# Single provider: chain = "anthropic"
# Fallback chain:  chain = ["anthropic", "gemini"]
chain = ["anthropic", "gemini"]

[providers.anthropic]
model = "claude-3-opus-20240229"

[providers.gemini]
model = "gemini-pro"

[broker]
# Upper bound for one provider attempt; the next provider is tried after it.
per_attempt_timeout_ms = 30000

[watch]
# Tick cadence while the surface reads cleanly.
poll_interval_ms = 2000
# Tick cadence after a surface read error.
error_backoff_ms = 5000

[telegram]
enabled = false

[persona]
enabled = false
# display_name = "Alice"
# profile_path = "/home/alice/.config/doppel/persona.toml"

[logging]
level = "info"
"#;

/// Settings loaded from TOML configuration file.
///
/// These are non-sensitive configuration values that can be safely
/// stored in files and version controlled (excluding secrets).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Provider fallback chain, in priority order.
    ///
    /// Accepts a single string (`"anthropic"`) or a list
    /// (`["anthropic", "gemini"]`).
    #[serde(default)]
    pub chain: ProviderChain,

    /// Per-provider configuration keyed by provider name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Response broker configuration
    #[serde(default)]
    pub broker: BrokerSettings,

    /// Watch loop configuration
    #[serde(default)]
    pub watch: WatchSettings,

    /// Telegram surface configuration
    #[serde(default)]
    pub telegram: TelegramSettings,

    /// Persona configuration
    #[serde(default)]
    pub persona: PersonaSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Per-provider configuration entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Model identifier
    pub model: String,
}

/// Response broker settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerSettings {
    /// Upper bound for one provider attempt, in milliseconds.
    #[serde(default = "default_per_attempt_timeout_ms")]
    pub per_attempt_timeout_ms: u64,
}

/// Watch loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchSettings {
    /// Tick cadence while the surface reads cleanly, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tick cadence after a surface read error, in milliseconds.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

/// Telegram surface settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramSettings {
    /// Whether the Telegram surface is enabled
    #[serde(default)]
    pub enabled: bool,
}

/// Persona settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PersonaSettings {
    /// Whether replies are styled after a learned persona
    #[serde(default)]
    pub enabled: bool,

    /// Name the persona goes by (used by `doppel-cli learn`)
    pub display_name: Option<String>,

    /// Profile file path (defaults to persona.toml next to the config)
    pub profile_path: Option<String>,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_per_attempt_timeout_ms() -> u64 {
    30000
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_error_backoff_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            per_attempt_timeout_ms: default_per_attempt_timeout_ms(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    /// The file is located at `~/.config/doppel/config.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        // Create default config if it doesn't exist
        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/doppel/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("DOPPEL_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("doppel");

        Ok(config_dir.join("config.toml"))
    }

    /// Create the default configuration file.
    fn create_default_config(path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Model identifier configured for `kind`, if any.
    pub fn model_for(&self, kind: ProviderKind) -> Option<&str> {
        self.providers.get(kind.as_str()).map(|p| p.model.as_str())
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.broker.per_attempt_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    /// Error backoff as a [`Duration`].
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.watch.error_backoff_ms)
    }

    /// Persona profile path, defaulting to persona.toml next to the config.
    pub fn persona_profile_path(&self) -> Result<PathBuf, SettingsError> {
        if let Some(path) = &self.persona.profile_path {
            return Ok(PathBuf::from(path));
        }
        let config_path = Self::config_path()?;
        let dir = config_path
            .parent()
            .ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(dir.join("persona.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert!(settings.chain.is_empty());
        assert!(settings.providers.is_empty());

        assert_eq!(settings.broker.per_attempt_timeout_ms, 30000);
        assert_eq!(settings.watch.poll_interval_ms, 2000);
        assert_eq!(settings.watch.error_backoff_ms, 5000);

        assert!(!settings.telegram.enabled);
        assert!(!settings.persona.enabled);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_default_config_toml_parses() {
        let settings = Settings::from_toml(DEFAULT_CONFIG_TOML).unwrap();

        assert_eq!(settings.chain.len(), 2);
        assert_eq!(
            settings.chain.kinds().unwrap(),
            vec![ProviderKind::Anthropic, ProviderKind::Gemini]
        );
        assert_eq!(
            settings.model_for(ProviderKind::Anthropic),
            Some("claude-3-opus-20240229")
        );
        assert_eq!(settings.model_for(ProviderKind::Gemini), Some("gemini-pro"));
    }

    #[test]
    fn test_chain_accepts_single_string() {
        let settings = Settings::from_toml(r#"chain = "anthropic""#).unwrap();
        assert_eq!(settings.chain.len(), 1);
        assert_eq!(settings.chain.first(), Some("anthropic"));
    }

    #[test]
    fn test_chain_accepts_list() {
        let settings = Settings::from_toml(r#"chain = ["gemini", "anthropic"]"#).unwrap();
        assert_eq!(
            settings.chain.kinds().unwrap(),
            vec![ProviderKind::Gemini, ProviderKind::Anthropic]
        );
    }

    #[test]
    fn test_chain_rejects_unknown_provider() {
        let settings = Settings::from_toml(r#"chain = ["anthropic", "eliza"]"#).unwrap();
        assert!(settings.chain.kinds().is_err());
    }

    #[test]
    fn test_chain_serializes_single_as_string() {
        let mut settings = Settings::default();
        settings.chain = ProviderChain::single("anthropic");
        let toml = settings.to_toml().unwrap();
        assert!(toml.contains(r#"chain = "anthropic""#));
    }

    #[test]
    fn test_timing_overrides() {
        let toml = r#"
chain = "anthropic"

[broker]
per_attempt_timeout_ms = 1500

[watch]
poll_interval_ms = 250
error_backoff_ms = 900
"#;
        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.per_attempt_timeout(), Duration::from_millis(1500));
        assert_eq!(settings.poll_interval(), Duration::from_millis(250));
        assert_eq!(settings.error_backoff(), Duration::from_millis(900));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.chain = ProviderChain::many(vec!["gemini".into(), "anthropic".into()]);
        settings.telegram.enabled = true;
        settings.save_to_path(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let reloaded = Settings::from_toml(&content).unwrap();
        assert_eq!(reloaded.chain, settings.chain);
        assert!(reloaded.telegram.enabled);
    }
}
