mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use anyhow::Result;
use async_trait::async_trait;

/// Reverse-route store: maps a relayed message back to the message it was
/// forwarded from, so a reply to the copy can be threaded to the original.
///
/// Keys are `(chat_id, message_id)` of the relayed copy. At most one value
/// per key; last write wins; entries are never evicted.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Store the association `(from_chat, from_msg) -> (to_chat, to_msg)`.
    async fn set(&self, from_chat: i64, from_msg: i32, to_chat: i64, to_msg: i32) -> Result<()>;

    /// Look up the origin of a relayed message. `None` means the message
    /// was never tracked or predates this store.
    async fn get(&self, from_chat: i64, from_msg: i32) -> Result<Option<(i64, i32)>>;
}
