//! Secrets configuration loaded from environment variables only.
//!
//! This module handles sensitive configuration like API keys that should
//! never be stored in files. All secrets are read from environment variables.

use std::env;

use crate::message::ProviderKind;

/// Secrets loaded exclusively from environment variables.
///
/// These are sensitive values that should never be written to disk
/// or committed to version control.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Anthropic API key (env: ANTHROPIC_API_KEY)
    pub anthropic_api_key: Option<String>,

    /// Gemini API key (env: GEMINI_API_KEY)
    pub gemini_api_key: Option<String>,

    /// Telegram bot token (env: TELEGRAM_BOT_TOKEN)
    pub telegram_bot_token: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("No provider API key configured. Set ANTHROPIC_API_KEY or GEMINI_API_KEY")]
    NoProviderConfigured,
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// This function also loads .env file if present (for development),
    /// but production should rely on actual environment variables.
    pub fn from_env() -> Result<Self, SecretsError> {
        let _ = dotenvy::dotenv();

        Self::from_env_inner()
    }

    /// Internal method to load from environment without loading .env
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        let secrets = Self {
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
        };

        // Validate that at least one provider is configured
        if secrets.anthropic_api_key.is_none() && secrets.gemini_api_key.is_none() {
            return Err(SecretsError::NoProviderConfigured);
        }

        Ok(secrets)
    }

    /// Check if a specific provider has a key
    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Anthropic => self.anthropic_api_key.is_some(),
            ProviderKind::Gemini => self.gemini_api_key.is_some(),
        }
    }

    /// Get the key for a provider
    pub fn provider_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
        }
    }

    /// Get the available providers
    pub fn available_providers(&self) -> Vec<ProviderKind> {
        let mut providers = Vec::new();
        if self.anthropic_api_key.is_some() {
            providers.push(ProviderKind::Anthropic);
        }
        if self.gemini_api_key.is_some() {
            providers.push(ProviderKind::Gemini);
        }
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests that modify environment variables don't run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            env::remove_var("ANTHROPIC_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("TELEGRAM_BOT_TOKEN");
        }
    }

    #[test]
    fn test_load_anthropic_only() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("ANTHROPIC_API_KEY", "sk-test");
        }

        let secrets = Secrets::from_env_inner().unwrap();
        assert_eq!(secrets.anthropic_api_key, Some("sk-test".to_string()));
        assert!(secrets.gemini_api_key.is_none());
        assert!(secrets.has_provider(ProviderKind::Anthropic));
        assert!(!secrets.has_provider(ProviderKind::Gemini));
    }

    #[test]
    fn test_load_gemini_only() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("GEMINI_API_KEY", "AIza-test");
        }

        let secrets = Secrets::from_env_inner().unwrap();
        assert_eq!(secrets.gemini_api_key, Some("AIza-test".to_string()));
        assert!(secrets.anthropic_api_key.is_none());
        assert!(secrets.has_provider(ProviderKind::Gemini));
    }

    #[test]
    fn test_load_both_providers() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("ANTHROPIC_API_KEY", "sk-ant");
            env::set_var("GEMINI_API_KEY", "AIza");
            env::set_var("TELEGRAM_BOT_TOKEN", "123456:ABC");
        }

        let secrets = Secrets::from_env_inner().unwrap();
        assert!(secrets.anthropic_api_key.is_some());
        assert!(secrets.gemini_api_key.is_some());
        assert_eq!(secrets.telegram_bot_token, Some("123456:ABC".to_string()));

        let providers = secrets.available_providers();
        assert_eq!(
            providers,
            vec![ProviderKind::Anthropic, ProviderKind::Gemini]
        );
    }

    #[test]
    fn test_no_provider_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        let result = Secrets::from_env_inner();
        assert!(matches!(
            result.unwrap_err(),
            SecretsError::NoProviderConfigured
        ));
    }
}
