//! Persistence for the single document holding every user and request.
//!
//! Backends only need to load the document and save it with a
//! compare-and-swap on its revision. [`SharedStore`] builds the atomic
//! read-modify-write on top of that.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::db::models::requests::ServiceRequest;
use crate::db::models::user::UserRecord;
use crate::error::ServiceError;

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Everything the service persists.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub requests: Vec<ServiceRequest>,
    /// Highest user id ever issued. Ids of deleted accounts are never reused,
    /// since requests keep pointing at their requester's id.
    #[serde(default)]
    pub last_user_id: i32,
}

impl Database {
    pub fn allocate_user_id(&mut self) -> i32 {
        let highest = self.users.iter().map(|u| u.id).max().unwrap_or(0);
        self.last_user_id = self.last_user_id.max(highest) + 1;
        self.last_user_id
    }
}

/// A loaded document and the revision it was read at.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub revision: u64,
    pub document: Database,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store revision mismatch: expected {expected}, found {found}")]
    RevisionMismatch { expected: u64, found: u64 },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable storage for the [`Database`] document.
///
/// A missing document loads as revision 0 and empty. `save_atomic` must
/// refuse with [`StoreError::RevisionMismatch`] when the stored revision is
/// not `expected_revision`, and must never leave a partially written
/// document behind.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self) -> Result<Snapshot, StoreError>;

    /// Returns the new revision.
    async fn save_atomic(&self, expected_revision: u64, document: &Database)
        -> Result<u64, StoreError>;

    fn backend(&self) -> &'static str;

    async fn close(&self) {}
}

/// Shared handle used by the repositories.
///
/// Writers are serialized in-process; the revision check catches writers in
/// other processes. Every backend call is bounded by `timeout`.
pub struct SharedStore {
    inner: Arc<dyn DocumentStore>,
    write_lock: Mutex<()>,
    timeout: Duration,
}

impl SharedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self {
            inner,
            write_lock: Mutex::new(()),
            timeout,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    pub async fn read(&self) -> Result<Database, ServiceError> {
        let snapshot = self.bounded(self.inner.load()).await?;
        Ok(snapshot.document)
    }

    /// Loads, applies `apply`, and saves. Nothing is written when `apply`
    /// fails.
    pub async fn update<T, F>(&self, apply: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Database) -> Result<T, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;

        let Snapshot {
            revision,
            mut document,
        } = self.bounded(self.inner.load()).await?;

        let output = apply(&mut document)?;

        let saved = self
            .bounded(self.inner.save_atomic(revision, &document))
            .await?;
        debug!(backend = self.backend(), revision = saved, "store updated");
        Ok(output)
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.bounded(self.inner.load()).await.map(|_| ())
    }

    pub async fn close(&self) {
        self.inner.close().await;
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ServiceError> {
        let result = match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };
        result.map_err(|e| {
            error!(backend = self.backend(), "store operation failed: {e}");
            ServiceError::from(e)
        })
    }
}
