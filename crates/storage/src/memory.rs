use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::SessionId;
use tokio::sync::RwLock;

use crate::SessionStore;

/// Process-local session store. Entries live until the process exits.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<(SessionId, String), serde_json::Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: SessionId, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(session_id, key.to_string()))
            .cloned())
    }

    async fn put(&self, session_id: SessionId, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries
            .write()
            .await
            .insert((session_id, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, session_id: SessionId, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .await
            .remove(&(session_id, key.to_string()))
            .is_some())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
