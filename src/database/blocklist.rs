use crate::catalog::BlockList;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;

/// Blocked track ids kept in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteBlockList {
    pool: Pool<Sqlite>,
}

impl SqliteBlockList {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn block(&self, track_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO blocked_tracks (track_id, blocked_at) VALUES (?, ?)")
            .bind(track_id)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        log::info!("Blocked track {}", track_id);
        Ok(())
    }

    pub async fn unblock(&self, track_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM blocked_tracks WHERE track_id = ?")
            .bind(track_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BlockList for SqliteBlockList {
    async fn blocked_ids(&self) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT track_id FROM blocked_tracks")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn is_blocked(&self, track_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM blocked_tracks WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
