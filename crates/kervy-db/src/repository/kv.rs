//! # Key-Value Repository
//!
//! SQLite-backed [`LocalStorage`]. Each key is one row of `local_storage`;
//! `set` is an upsert so a crash leaves either the old or the new value.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::storage::LocalStorage;

/// Repository for the `local_storage` table.
#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    pool: SqlitePool,
}

impl KeyValueRepository {
    /// Creates a new KeyValueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        KeyValueRepository { pool }
    }

    /// Lists stored keys in alphabetical order.
    pub async fn keys(&self) -> DbResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM local_storage ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

#[async_trait]
impl LocalStorage for KeyValueRepository {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM local_storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing local storage key");

        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        debug!(key = %key, "Removing local storage key");

        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> KeyValueRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.local_storage()
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let repo = repo().await;
        assert_eq!(repo.get("Products").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let repo = repo().await;

        repo.set("Products", r#"[{"a":1}]"#).await.unwrap();
        repo.set("Products", r#"[{"a":1},{"a":2}]"#).await.unwrap();

        assert_eq!(
            repo.get("Products").await.unwrap().as_deref(),
            Some(r#"[{"a":1},{"a":2}]"#)
        );
        assert_eq!(repo.keys().await.unwrap(), vec!["Products".to_string()]);
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = repo().await;

        repo.set("Categories", "[]").await.unwrap();
        repo.set("Products", "[]").await.unwrap();
        repo.remove("Categories").await.unwrap();

        assert_eq!(repo.get("Categories").await.unwrap(), None);
        assert_eq!(repo.keys().await.unwrap(), vec!["Products".to_string()]);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kervy.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.local_storage().set("Categories", "[1]").await.unwrap();
        db.close().await;

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(
            db.local_storage().get("Categories").await.unwrap().as_deref(),
            Some("[1]")
        );
    }
}
