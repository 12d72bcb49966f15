//! SQLite-backed catalog slot links.
//!
//! Stored rows overlay the defaults from the engine config, so a fresh
//! database starts with every default slot present but unlinked.

use crate::catalog::{CatalogConfig, CatalogConfigStore, CatalogPatch, CatalogSlot, SlotKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

const SETTING_RAP_SOURCES: &str = "rap_sources";
const SETTING_SIMILAR_ARTISTS: &str = "similar_artists";

#[derive(Debug, Clone)]
pub struct SqliteCatalogConfigStore {
    pool: Pool<Sqlite>,
    defaults: CatalogConfig,
}

impl SqliteCatalogConfigStore {
    pub fn new(pool: Pool<Sqlite>, defaults: CatalogConfig) -> Self {
        Self { pool, defaults }
    }

    async fn read_setting(&self, key: &str) -> Result<Option<Vec<String>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value_json FROM catalog_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(
                serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt catalog setting '{}'", key))?,
            )),
            None => Ok(None),
        }
    }

    async fn write_setting(&self, key: &str, values: &[String]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog_settings (key, value_json) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(values)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_rap_sources(&self, slot_keys: &[String]) -> Result<()> {
        self.write_setting(SETTING_RAP_SOURCES, slot_keys).await
    }

    pub async fn set_similar_artists(&self, names: &[String]) -> Result<()> {
        self.write_setting(SETTING_SIMILAR_ARTISTS, names).await
    }
}

#[async_trait]
impl CatalogConfigStore for SqliteCatalogConfigStore {
    async fn load(&self) -> Result<CatalogConfig> {
        let mut config = self.defaults.clone();

        let rows: Vec<(String, String, String, Option<String>)> =
            sqlx::query_as("SELECT slot_key, label, kind, catalog_id FROM catalog_slots")
                .fetch_all(&self.pool)
                .await?;

        for (key, label, kind, catalog_id) in rows {
            let kind: SlotKind = match kind.parse() {
                Ok(kind) => kind,
                Err(e) => {
                    log::warn!("Skipping catalog slot '{}': {}", key, e);
                    continue;
                }
            };
            config.slots.insert(
                key,
                CatalogSlot {
                    label,
                    kind,
                    id: catalog_id,
                },
            );
        }

        if let Some(sources) = self.read_setting(SETTING_RAP_SOURCES).await? {
            config.rap_sources = sources;
        }
        if let Some(artists) = self.read_setting(SETTING_SIMILAR_ARTISTS).await? {
            config.similar_artists = artists;
        }

        Ok(config)
    }

    async fn patch(&self, patch: &CatalogPatch) -> Result<CatalogConfig> {
        let mut current = self.load().await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for link in &patch.links {
            let label = current
                .slot(&link.key)
                .map(|s| s.label.clone())
                .unwrap_or_else(|| link.key.clone());

            sqlx::query(
                r#"
                INSERT INTO catalog_slots (slot_key, label, kind, catalog_id, linked_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(slot_key) DO UPDATE SET
                    kind = excluded.kind,
                    catalog_id = excluded.catalog_id,
                    linked_at = excluded.linked_at
                "#,
            )
            .bind(&link.key)
            .bind(&label)
            .bind(link.kind.to_string())
            .bind(&link.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::info!("Persisted {} catalog link(s)", patch.links.len());
        current.apply(patch);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_catalog;
    use crate::database::DatabaseManager;

    async fn store() -> SqliteCatalogConfigStore {
        let db = DatabaseManager::in_memory().await.unwrap();
        SqliteCatalogConfigStore::new(db.pool.clone(), default_catalog())
    }

    #[tokio::test]
    async fn test_fresh_store_returns_defaults() {
        let store = store().await;
        let config = store.load().await.unwrap();
        assert_eq!(config, default_catalog());
    }

    #[tokio::test]
    async fn test_patch_persists_links() {
        let store = store().await;
        let mut patch = CatalogPatch::default();
        patch.link("acoustic_playlist", "pl-acoustic", SlotKind::Playlist);
        patch.link("primary_artist", "ar-nas", SlotKind::Artist);

        let updated = store.patch(&patch).await.unwrap();
        assert_eq!(
            updated.linked("acoustic_playlist"),
            Some(("pl-acoustic", SlotKind::Playlist))
        );

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, updated);
        assert_eq!(
            reloaded.slot("primary_artist").map(|s| s.label.as_str()),
            Some("Nas")
        );
    }

    #[tokio::test]
    async fn test_patch_can_switch_kind() {
        let store = store().await;
        let mut patch = CatalogPatch::default();
        patch.link("genre_playlist", "al-1", SlotKind::Album);
        store.patch(&patch).await.unwrap();

        let config = store.load().await.unwrap();
        assert_eq!(config.linked("genre_playlist"), Some(("al-1", SlotKind::Album)));
    }

    #[tokio::test]
    async fn test_settings_override_defaults() {
        let store = store().await;
        store
            .set_similar_artists(&["Jay-Z".to_string()])
            .await
            .unwrap();
        let config = store.load().await.unwrap();
        assert_eq!(config.similar_artists, vec!["Jay-Z".to_string()]);
        assert_eq!(config.rap_sources, default_catalog().rap_sources);

        store
            .set_rap_sources(&["rap_90s".to_string()])
            .await
            .unwrap();
        let config = store.load().await.unwrap();
        assert_eq!(config.rap_sources, vec!["rap_90s".to_string()]);
        assert_eq!(config.similar_artists, vec!["Jay-Z".to_string()]);
    }
}
