pub mod anthropic;
pub mod gemini;
pub mod provider;

use std::sync::Arc;

use doppel_core::{Config, ConfigError, ProviderKind};

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use provider::{ProviderError, TextProvider};

/// Build provider clients for the configured chain, in priority order.
///
/// Providers without an API key were already filtered out of the usable
/// chain; each remaining entry gets a client with its configured model.
pub fn build_chain(config: &Config) -> Result<Vec<Arc<dyn TextProvider>>, ConfigError> {
    let mut providers: Vec<Arc<dyn TextProvider>> = Vec::new();
    for kind in config.usable_chain()? {
        let Some(api_key) = config.provider_key(kind) else {
            continue;
        };
        let model = config.model_for(kind);
        match kind {
            ProviderKind::Anthropic => {
                providers.push(Arc::new(AnthropicClient::new(api_key, model)));
            }
            ProviderKind::Gemini => {
                providers.push(Arc::new(GeminiClient::new(api_key, model)));
            }
        }
        tracing::info!("{} client created with model: {}", kind, model);
    }
    Ok(providers)
}
