use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::RouteStore;

/// In-process route store: a plain map behind a single mutex.
///
/// Entries are never removed, so the map grows for the lifetime of the
/// process. Acceptable for a low-traffic personal bot; anything busier
/// should use the sqlite backend or put a bound on this.
#[derive(Default)]
pub struct MemoryStorage {
    routes: Mutex<HashMap<(i64, i32), (i64, i32)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteStore for MemoryStorage {
    async fn set(&self, from_chat: i64, from_msg: i32, to_chat: i64, to_msg: i32) -> Result<()> {
        let mut routes = self.routes.lock().await;
        routes.insert((from_chat, from_msg), (to_chat, to_msg));
        Ok(())
    }

    async fn get(&self, from_chat: i64, from_msg: i32) -> Result<Option<(i64, i32)>> {
        let routes = self.routes.lock().await;
        Ok(routes.get(&(from_chat, from_msg)).copied())
    }
}
