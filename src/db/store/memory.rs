use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Database, DocumentStore, Snapshot, StoreError};

/// Process-local store. Used by tests and by `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save_atomic(
        &self,
        expected_revision: u64,
        document: &Database,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        if state.revision != expected_revision {
            return Err(StoreError::RevisionMismatch {
                expected: expected_revision,
                found: state.revision,
            });
        }
        state.revision += 1;
        state.document = document.clone();
        Ok(state.revision)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
