//! Ordered provider fallthrough for reply generation.
//!
//! The broker tries each configured provider in priority order, bounds every
//! attempt with a timeout, and returns the first non-empty reply. It never
//! fabricates content: when the whole chain fails the caller gets a typed
//! terminal error and decides what (if anything) to send.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::prompt::build_prompt;
use crate::providers::provider::{ProviderError, TextProvider};
use doppel_core::{InboundMessage, PersonaProfile, ReplyDraft};

/// Errors surfaced to the watch loop when generation fails outright
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("No providers configured")]
    NoProviders,

    #[error("All providers exhausted; last error: {last}")]
    AllProvidersExhausted { last: ProviderError },
}

/// Reply generation over an ordered provider chain.
///
/// Holds no mutable state; one instance is shared by every watch loop and
/// `respond` may be called concurrently without synchronization.
pub struct ResponseBroker {
    providers: Vec<Arc<dyn TextProvider>>,
    per_attempt_timeout: Duration,
    persona: Option<PersonaProfile>,
}

impl ResponseBroker {
    /// Create a broker over `providers` in priority order.
    pub fn new(providers: Vec<Arc<dyn TextProvider>>, per_attempt_timeout: Duration) -> Self {
        Self {
            providers,
            per_attempt_timeout,
            persona: None,
        }
    }

    /// Style replies after a learned persona.
    pub fn with_persona(mut self, persona: Option<PersonaProfile>) -> Self {
        self.persona = persona;
        self
    }

    /// Provider names in priority order, for startup logging.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Generate a reply for `message`.
    ///
    /// Providers are tried strictly in order, each at most once and each
    /// bounded by the per-attempt timeout. The first provider to return
    /// non-empty text wins; the rest are never invoked.
    pub async fn respond(&self, message: &InboundMessage) -> Result<ReplyDraft, BrokerError> {
        if self.providers.is_empty() {
            return Err(BrokerError::NoProviders);
        }

        let prompt = build_prompt(message, self.persona.as_ref());
        let mut last_error = ProviderError::EmptyResponse;

        for provider in &self.providers {
            let attempt = tokio::time::timeout(self.per_attempt_timeout, provider.generate(&prompt));
            let error = match attempt.await {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    debug!(
                        "[{}] reply generated by {} ({})",
                        message.conversation,
                        provider.name(),
                        provider.model()
                    );
                    return Ok(ReplyDraft {
                        conversation: message.conversation.clone(),
                        text,
                        provider: provider.name().to_string(),
                    });
                }
                Ok(Ok(_)) => ProviderError::EmptyResponse,
                Ok(Err(err)) => err,
                Err(_) => ProviderError::Timeout,
            };

            warn!(
                "[{}] provider {} failed, falling through: {}",
                message.conversation,
                provider.name(),
                error
            );
            last_error = error;
        }

        Err(BrokerError::AllProvidersExhausted { last: last_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    enum Behavior {
        Reply(&'static str),
        Fail,
        Empty,
        Hang,
    }

    #[derive(Clone)]
    struct FakeProvider {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(name: &'static str, behavior: Behavior) -> Self {
            Self {
                name,
                behavior,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TextProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Reply(text) => Ok(text.to_string()),
                Behavior::Fail => Err(ProviderError::Api {
                    status: 500,
                    message: "server error".to_string(),
                }),
                Behavior::Empty => Ok("   ".to_string()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("too late".to_string())
                }
            }
        }
    }

    fn message() -> InboundMessage {
        InboundMessage::new("c1", "Bob", "hi")
    }

    fn broker_over(providers: Vec<&FakeProvider>) -> ResponseBroker {
        let providers: Vec<Arc<dyn TextProvider>> = providers
            .into_iter()
            .map(|p| Arc::new(p.clone()) as Arc<dyn TextProvider>)
            .collect();
        ResponseBroker::new(providers, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let a = FakeProvider::new("a", Behavior::Reply("hello from a"));
        let b = FakeProvider::new("b", Behavior::Reply("hello from b"));
        let broker = broker_over(vec![&a, &b]);

        let draft = broker.respond(&message()).await.unwrap();
        assert_eq!(draft.text, "hello from a");
        assert_eq!(draft.provider, "a");
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn failure_falls_through_in_order() {
        let a = FakeProvider::new("a", Behavior::Fail);
        let b = FakeProvider::new("b", Behavior::Reply("hello"));
        let broker = broker_over(vec![&a, &b]);

        let draft = broker.respond(&message()).await.unwrap();
        assert_eq!(draft.provider, "b");
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_reply_falls_through() {
        let a = FakeProvider::new("a", Behavior::Empty);
        let b = FakeProvider::new("b", Behavior::Reply("hello"));
        let broker = broker_over(vec![&a, &b]);

        let draft = broker.respond(&message()).await.unwrap();
        assert_eq!(draft.provider, "b");
    }

    #[tokio::test]
    async fn exhausted_chain_invokes_each_provider_once() {
        let a = FakeProvider::new("a", Behavior::Fail);
        let b = FakeProvider::new("b", Behavior::Fail);
        let broker = broker_over(vec![&a, &b]);

        let err = broker.respond(&message()).await.unwrap_err();
        assert!(matches!(
            err,
            BrokerError::AllProvidersExhausted {
                last: ProviderError::Api { status: 500, .. }
            }
        ));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_through_to_next_provider() {
        let a = FakeProvider::new("a", Behavior::Hang);
        let b = FakeProvider::new("b", Behavior::Reply("hello"));
        let broker = broker_over(vec![&a, &b]);

        let draft = broker.respond(&message()).await.unwrap();
        assert_eq!(draft.text, "hello");
        assert_eq!(draft.provider, "b");
        assert_eq!(a.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_chain_is_rejected() {
        let broker = ResponseBroker::new(Vec::new(), Duration::from_secs(5));
        let err = broker.respond(&message()).await.unwrap_err();
        assert!(matches!(err, BrokerError::NoProviders));
    }
}
