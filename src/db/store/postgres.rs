use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::{Database, DocumentStore, Snapshot, StoreError};
use crate::db::pool::get_db_pool;

const DOCUMENT_NAME: &str = "service_orders";

/// Stores the document as one row; the `revision` column carries the
/// compare-and-swap.
pub struct PgDocumentStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    revision: i64,
    body: String,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = get_db_pool(database_url).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                revision BIGINT NOT NULL,
                body TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("documents table ready");
        Ok(())
    }

    async fn current_revision(&self) -> Result<u64, StoreError> {
        let revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM documents WHERE name = $1")
                .bind(DOCUMENT_NAME)
                .fetch_optional(&self.pool)
                .await?;
        Ok(revision.unwrap_or(0) as u64)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT revision, body FROM documents WHERE name = $1",
        )
        .bind(DOCUMENT_NAME)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Snapshot {
                revision: row.revision as u64,
                document: serde_json::from_str(&row.body)?,
            }),
            None => Ok(Snapshot::default()),
        }
    }

    async fn save_atomic(
        &self,
        expected_revision: u64,
        document: &Database,
    ) -> Result<u64, StoreError> {
        let body = serde_json::to_string(document)?;

        let result = if expected_revision == 0 {
            sqlx::query(
                r#"
                INSERT INTO documents (name, revision, body)
                VALUES ($1, 1, $2)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(DOCUMENT_NAME)
            .bind(&body)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE documents
                SET revision = revision + 1, body = $3, updated_at = NOW()
                WHERE name = $1 AND revision = $2
                "#,
            )
            .bind(DOCUMENT_NAME)
            .bind(expected_revision as i64)
            .bind(&body)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::RevisionMismatch {
                expected: expected_revision,
                found: self.current_revision().await?,
            });
        }
        Ok(expected_revision + 1)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        info!("🛠️ Closing database pool...");
        self.pool.close().await;
        info!("✅ Database pool closed.");
    }
}
