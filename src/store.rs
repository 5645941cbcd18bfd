use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::FastSession;

/// Where completed fasts live between controller calls. Implementations
/// receive and return the history newest first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save_history(&self, history: &[FastSession]) -> Result<()>;
    async fn load_history(&self) -> Result<Vec<FastSession>>;
}

/// Process-local store; everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryHistoryStore {
    sessions: Mutex<Vec<FastSession>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn save_history(&self, history: &[FastSession]) -> Result<()> {
        *self.sessions.lock().await = history.to_vec();
        Ok(())
    }

    async fn load_history(&self) -> Result<Vec<FastSession>> {
        Ok(self.sessions.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_starts_empty() {
        let store = MemoryHistoryStore::new();
        assert!(store.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_keeps_order() {
        let store = MemoryHistoryStore::new();
        let history = vec![
            FastSession::completed(5_000, 9_000),
            FastSession::completed(1_000, 2_000),
        ];
        store.save_history(&history).await.unwrap();
        assert_eq!(store.load_history().await.unwrap(), history);

        store.save_history(&[]).await.unwrap();
        assert!(store.load_history().await.unwrap().is_empty());
    }
}
