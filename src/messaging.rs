use anyhow::Result;
use async_trait::async_trait;

/// Identity of a message the courier has delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Platform-agnostic incoming message.
///
/// Telegram-specific fields stay in the transport adapter.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub sender_username: Option<String>,
    /// IETF language tag reported by the platform, if any.
    pub language_code: Option<String>,
    pub text: String,
    /// Identity of the message this one replies to, within the same chat.
    pub reply_to: Option<i32>,
}

impl IncomingMessage {
    pub fn language(&self) -> &str {
        self.language_code.as_deref().unwrap_or_default()
    }
}

/// Outbound side of the relay.
///
/// Telegram is the only production implementation; tests substitute an
/// in-process recorder.
#[async_trait]
pub trait Courier: Send + Sync {
    /// Send `text` to `chat_id`, optionally as a reply to `reply_to`, and
    /// return the identity of the message that was created.
    async fn send(&self, chat_id: i64, text: &str, reply_to: Option<i32>) -> Result<SentMessage>;
}
