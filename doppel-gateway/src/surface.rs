//! Surface adapter contract.
//!
//! A surface is one watched chat platform/session. The core depends only on
//! this capability pair; DOM scraping, bot-API long-poll, or webhook fan-in
//! normalized to polling all plug in behind the same two methods.

use doppel_core::{ConversationId, InboundMessage};

/// Errors from a surface adapter.
///
/// Read and send failures are distinct because the remediation differs:
/// a read failure backs off and retries, a send failure is reported as a
/// delivery failure for a reply that was already generated.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Surface read failed: {message}")]
    Read { message: String },

    #[error("Surface send failed: {message}")]
    Send { message: String },
}

impl SurfaceError {
    pub fn read(err: impl std::fmt::Display) -> Self {
        Self::Read {
            message: err.to_string(),
        }
    }

    pub fn send(err: impl std::fmt::Display) -> Self {
        Self::Send {
            message: err.to_string(),
        }
    }
}

/// One watched chat platform/session.
#[async_trait::async_trait]
pub trait Surface: Send + Sync {
    /// Surface name, for logging.
    fn name(&self) -> &str;

    /// Read the current visible-message snapshot: at most one candidate per
    /// conversation, each carrying whatever the surface marks as unread/new.
    ///
    /// This is the only read that may block on the platform. The watch loop
    /// cancels it by dropping the future, so implementations must not hold
    /// state that becomes inconsistent when dropped mid-call.
    async fn read_new_messages(&self) -> Result<Vec<InboundMessage>, SurfaceError>;

    /// Send a reply into a conversation.
    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), SurfaceError>;
}
