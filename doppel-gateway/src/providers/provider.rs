//! Provider trait for abstracting different text-generation backends.

/// Provider error taxonomy.
///
/// Every concrete client translates its native failure modes into these
/// variants at the boundary; the broker only ever sees this taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Attempt timed out")]
    Timeout,
    #[error("Authentication failed: {message}")]
    Auth { message: String },
    #[error("Rate limited: {message}")]
    RateLimited { message: String },
    #[error("Provider returned no usable text")]
    EmptyResponse,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Map a non-success HTTP status into the taxonomy.
pub(crate) fn classify_status(status: u16, message: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth { message },
        429 => ProviderError::RateLimited { message },
        _ => ProviderError::Api { status, message },
    }
}

/// Provider trait for different text-generation backends.
///
/// Implementations are stateless after construction and safe to share
/// across watch loops.
#[async_trait::async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Current model
    fn model(&self) -> &str;

    /// Turn a prompt into reply text.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}
