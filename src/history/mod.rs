//! Cooldown history: which tracks were served recently.
//!
//! Every id handed out by a run is stamped with the current time. While the
//! stamp is younger than the window the track is restricted. Expired rows
//! are deleted in the same transaction as every write, so the table only
//! ever holds ids from the current window.

pub mod models;

use crate::errors::MixResult;
use chrono::Utc;
use models::CooldownEntry;
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct CooldownStore {
    pool: Pool<Sqlite>,
    window_ms: i64,
}

impl CooldownStore {
    pub fn new(pool: Pool<Sqlite>, window_ms: i64) -> Self {
        Self { pool, window_ms }
    }

    pub async fn is_restricted(&self, track_id: &str) -> MixResult<bool> {
        self.is_restricted_at(track_id, Utc::now().timestamp_millis())
            .await
    }

    pub async fn is_restricted_at(&self, track_id: &str, now_ms: i64) -> MixResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT last_used_at FROM cooldown_history WHERE track_id = ?")
                .bind(track_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some_and(|(used_at,)| now_ms - used_at < self.window_ms))
    }

    /// Snapshot of every restricted id, taken once per run.
    pub async fn restricted_ids(&self) -> MixResult<HashSet<String>> {
        self.restricted_ids_at(Utc::now().timestamp_millis()).await
    }

    pub async fn restricted_ids_at(&self, now_ms: i64) -> MixResult<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT track_id FROM cooldown_history WHERE last_used_at > ?")
                .bind(now_ms - self.window_ms)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn mark_used(&self, track_ids: &[String]) -> MixResult<()> {
        self.mark_used_at(track_ids, Utc::now().timestamp_millis())
            .await
    }

    /// Stamp `track_ids` with `now_ms` and prune expired rows in one write.
    pub async fn mark_used_at(&self, track_ids: &[String], now_ms: i64) -> MixResult<()> {
        let mut tx = self.pool.begin().await?;

        for track_id in track_ids {
            sqlx::query(
                r#"
                INSERT INTO cooldown_history (track_id, last_used_at) VALUES (?, ?)
                ON CONFLICT(track_id) DO UPDATE SET last_used_at = excluded.last_used_at
                "#,
            )
            .bind(track_id)
            .bind(now_ms)
            .execute(&mut *tx)
            .await?;
        }

        let pruned = sqlx::query("DELETE FROM cooldown_history WHERE last_used_at <= ?")
            .bind(now_ms - self.window_ms)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        log::debug!(
            "Cooldown stamped {} track(s), pruned {} expired",
            track_ids.len(),
            pruned
        );
        Ok(())
    }

    pub async fn entries(&self) -> MixResult<Vec<CooldownEntry>> {
        let entries = sqlx::query_as::<_, CooldownEntry>(
            "SELECT track_id, last_used_at FROM cooldown_history ORDER BY last_used_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn clear(&self) -> MixResult<()> {
        sqlx::query("DELETE FROM cooldown_history")
            .execute(&self.pool)
            .await?;
        log::info!("Cooldown history cleared");
        Ok(())
    }
}
