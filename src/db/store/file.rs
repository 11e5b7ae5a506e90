use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{Database, DocumentStore, Snapshot, StoreError};

/// JSON document on local disk.
///
/// Saves go to a temporary file in the same directory which is synced and
/// then renamed over the target, so readers see either the old or the new
/// document and never a torn one.
pub struct FileStore {
    path: PathBuf,
    save_lock: Mutex<()>,
}

#[derive(Deserialize)]
struct OnDisk {
    #[serde(default)]
    revision: u64,
    #[serde(flatten)]
    document: Database,
}

#[derive(Serialize)]
struct OnDiskRef<'a> {
    revision: u64,
    #[serde(flatten)]
    document: &'a Database,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Snapshot, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => return Err(e.into()),
        };
        let on_disk: OnDisk = serde_json::from_str(&raw)?;
        Ok(Snapshot {
            revision: on_disk.revision,
            document: on_disk.document,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "db.json".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        self.read().await
    }

    async fn save_atomic(
        &self,
        expected_revision: u64,
        document: &Database,
    ) -> Result<u64, StoreError> {
        let _guard = self.save_lock.lock().await;

        let current = self.read().await?.revision;
        if current != expected_revision {
            return Err(StoreError::RevisionMismatch {
                expected: expected_revision,
                found: current,
            });
        }

        let revision = expected_revision + 1;
        let body = serde_json::to_vec_pretty(&OnDiskRef { revision, document })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        let written = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            fs::rename(&temp, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        if revision == 1 {
            info!(path = %self.path.display(), "created store document");
        }
        Ok(revision)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
