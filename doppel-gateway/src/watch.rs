//! Polling watch loop: read, diff, dispatch.
//!
//! One loop per surface. Each tick reads the surface's visible-message
//! snapshot, diffs it against the loop's own seen-state, and drives at most
//! one in-flight reply per conversation. The surface read is the only
//! cancellable suspension point; an in-flight dispatch is allowed to finish
//! naturally on shutdown so a half-generated reply is never resent later.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::broker::ResponseBroker;
use crate::surface::Surface;
use doppel_core::{ConversationId, DispatchEvent, DispatchOutcome, InboundMessage};

/// A long-lived polling loop bound to one conversation surface.
///
/// Owns its seen-state exclusively: the map is created here, mutated only
/// after a dispatch completes, and dies with the loop.
pub struct WatchLoop {
    surface: Arc<dyn Surface>,
    broker: Arc<ResponseBroker>,
    seen: HashMap<ConversationId, String>,
    poll_interval: Duration,
    error_backoff: Duration,
    events: broadcast::Sender<DispatchEvent>,
    shutdown: watch::Receiver<bool>,
}

impl WatchLoop {
    pub fn new(
        surface: Arc<dyn Surface>,
        broker: Arc<ResponseBroker>,
        poll_interval: Duration,
        error_backoff: Duration,
        events: broadcast::Sender<DispatchEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            surface,
            broker,
            seen: HashMap::new(),
            poll_interval,
            error_backoff,
            events,
            shutdown,
        }
    }

    /// Run until shutdown is signalled.
    ///
    /// A surface read error never terminates the loop; it is logged and the
    /// next tick runs after the error backoff instead of the poll interval.
    pub async fn run(mut self) {
        info!("watch loop started for surface '{}'", self.surface.name());

        loop {
            if self.stop_requested() {
                break;
            }

            let mut shutdown = self.shutdown.clone();
            let snapshot = tokio::select! {
                _ = wait_for_stop(&mut shutdown) => break,
                result = self.surface.read_new_messages() => result,
            };

            let delay = match snapshot {
                Ok(candidates) => {
                    for candidate in candidates {
                        if self.is_new(&candidate) {
                            self.dispatch(candidate).await;
                        }
                        if self.stop_requested() {
                            break;
                        }
                    }
                    self.poll_interval
                }
                Err(err) => {
                    warn!(
                        "surface '{}' read failed, backing off: {}",
                        self.surface.name(),
                        err
                    );
                    self.error_backoff
                }
            };

            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                _ = wait_for_stop(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("watch loop stopped for surface '{}'", self.surface.name());
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// A candidate is new iff its text differs from the last answered text
    /// for its conversation (or no entry exists yet).
    fn is_new(&self, candidate: &InboundMessage) -> bool {
        self.seen.get(&candidate.conversation) != Some(&candidate.text)
    }

    /// Generate and deliver a reply for one new message, then mark the
    /// conversation answered.
    ///
    /// The seen-state entry is written for every completed dispatch,
    /// including failures: a permanently failing message must not be
    /// re-attempted on every tick, and a generated-but-undelivered reply
    /// must not be regenerated (double-reply risk). This happens before the
    /// next candidate or tick is examined, so a stale duplicate read cannot
    /// trigger a second dispatch.
    async fn dispatch(&mut self, candidate: InboundMessage) {
        let event = match self.broker.respond(&candidate).await {
            Ok(draft) => {
                match self
                    .surface
                    .send_message(&draft.conversation, &draft.text)
                    .await
                {
                    Ok(()) => DispatchEvent {
                        conversation: candidate.conversation.clone(),
                        inbound_text: candidate.text.clone(),
                        reply_text: Some(draft.text),
                        provider: Some(draft.provider),
                        outcome: DispatchOutcome::Replied,
                    },
                    Err(err) => {
                        warn!(
                            "[{}] reply delivery failed on '{}': {}",
                            candidate.conversation,
                            self.surface.name(),
                            err
                        );
                        DispatchEvent {
                            conversation: candidate.conversation.clone(),
                            inbound_text: candidate.text.clone(),
                            reply_text: Some(draft.text),
                            provider: Some(draft.provider),
                            outcome: DispatchOutcome::DeliveryFailed,
                        }
                    }
                }
            }
            Err(err) => {
                warn!(
                    "[{}] reply generation failed: {}",
                    candidate.conversation, err
                );
                DispatchEvent {
                    conversation: candidate.conversation.clone(),
                    inbound_text: candidate.text.clone(),
                    reply_text: None,
                    provider: None,
                    outcome: DispatchOutcome::GenerationFailed,
                }
            }
        };

        self.seen.insert(candidate.conversation, candidate.text);
        let _ = self.events.send(event);
    }
}

/// Completes once shutdown is signalled (or the sender is gone).
async fn wait_for_stop(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
