pub mod blocklist;
pub mod catalog_config;

use crate::errors::{MixError, MixResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use blocklist::SqliteBlockList;
pub use catalog_config::SqliteCatalogConfigStore;

pub struct DatabaseManager {
    pub pool: Pool<Sqlite>,
}

impl DatabaseManager {
    pub async fn open(db_path: &Path) -> MixResult<Self> {
        if let Some(dir) = db_path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        log::info!("Connecting to database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await
            .map_err(|e| MixError::Database(format!("Failed to connect to database: {}", e)))?;

        Self::apply_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection that never
    /// expires, otherwise the data would vanish with it.
    pub async fn in_memory() -> MixResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;

        Self::apply_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn apply_schema(pool: &Pool<Sqlite>) -> MixResult<()> {
        let schema = include_str!("schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(pool).await.map_err(|e| {
                    MixError::Database(format!(
                        "Failed to execute schema statement '{}': {}",
                        stmt, e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_creates_tables() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"cooldown_history"));
        assert!(names.contains(&"catalog_slots"));
        assert!(names.contains(&"blocked_tracks"));
    }

    #[tokio::test]
    async fn test_in_memory_keeps_rows_between_queries() {
        let db = DatabaseManager::in_memory().await.unwrap();
        sqlx::query("INSERT INTO blocked_tracks (track_id, blocked_at) VALUES ('t1', 0)")
            .execute(&db.pool)
            .await
            .unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blocked_tracks")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_open_file_database_is_reusable() {
        let dir = std::env::temp_dir().join(format!("mixsmith-db-{}", std::process::id()));
        let path = dir.join("test.db");
        {
            let db = DatabaseManager::open(&path).await.unwrap();
            db.pool.close().await;
        }
        let db = DatabaseManager::open(&path).await.unwrap();
        db.pool.close().await;
        let _ = fs::remove_dir_all(dir);
    }
}
