//! Links unlinked catalog slots to real catalog ids.
//!
//! Playlists are matched by normalized name against the user's library,
//! artists through search. Album slots have to be linked by hand. Slots that
//! already carry an id are never touched, and every new link from one run
//! goes out in a single patch.

use crate::catalog::{
    ArtistSummary, CatalogApi, CatalogConfig, CatalogConfigStore, CatalogPatch, SlotKind,
};
use crate::errors::MixResult;
use crate::mix::cache::ArtistIdCache;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

const ARTIST_SEARCH_LIMIT: usize = 10;

/// Lowercase, trimmed, inner whitespace collapsed, quotes and backticks removed.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}'))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact case-insensitive match first, otherwise the top result.
pub fn best_artist_match<'a>(name: &str, results: &'a [ArtistSummary]) -> Option<&'a ArtistSummary> {
    let wanted = name.trim().to_lowercase();
    results
        .iter()
        .find(|a| a.name.trim().to_lowercase() == wanted)
        .or_else(|| results.first())
}

pub struct CatalogResolver {
    api: Arc<dyn CatalogApi>,
    store: Arc<dyn CatalogConfigStore>,
    artist_ids: Arc<ArtistIdCache>,
}

impl CatalogResolver {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        store: Arc<dyn CatalogConfigStore>,
        artist_ids: Arc<ArtistIdCache>,
    ) -> Self {
        Self {
            api,
            store,
            artist_ids,
        }
    }

    /// Artist id by name: cache first, then search. Misses and search
    /// failures are logged and yield `None`.
    pub async fn resolve_artist(&self, name: &str) -> Option<String> {
        if let Some(id) = self.artist_ids.get(name) {
            log::debug!("Artist cache hit for '{}'", name);
            return Some(id);
        }

        let results = match self.api.search_artists(name, ARTIST_SEARCH_LIMIT).await {
            Ok(results) => results,
            Err(e) => {
                log::warn!("Artist search for '{}' failed: {:#}", name, e);
                return None;
            }
        };

        match best_artist_match(name, &results) {
            Some(artist) => {
                if !artist.name.eq_ignore_ascii_case(name.trim()) {
                    log::info!(
                        "No exact match for artist '{}', using '{}'",
                        name,
                        artist.name
                    );
                }
                self.artist_ids.insert(name, &artist.id);
                Some(artist.id.clone())
            }
            None => {
                log::warn!("No artist found for '{}'", name);
                None
            }
        }
    }

    /// Link every unlinked playlist and artist slot that can be found.
    pub async fn resolve_all(&self) -> MixResult<CatalogConfig> {
        let config = self.store.load().await?;
        let unlinked: Vec<(String, String, SlotKind)> = config
            .unlinked_keys()
            .into_iter()
            .filter_map(|key| {
                let slot = config.slot(&key)?;
                Some((key.clone(), slot.label.clone(), slot.kind))
            })
            .collect();

        if unlinked.is_empty() {
            log::debug!("All catalog slots are linked");
            return Ok(config);
        }

        let mut patch = CatalogPatch::default();

        let playlists: Vec<&(String, String, SlotKind)> = unlinked
            .iter()
            .filter(|(_, _, kind)| *kind == SlotKind::Playlist)
            .collect();
        if !playlists.is_empty() {
            match self.api.user_playlists().await {
                Ok(library) => {
                    let mut by_name: HashMap<String, &str> = HashMap::new();
                    for playlist in &library {
                        by_name
                            .entry(normalize_name(&playlist.name))
                            .or_insert(playlist.id.as_str());
                    }
                    for (key, label, _) in playlists {
                        match by_name.get(&normalize_name(label)) {
                            Some(id) => patch.link(key, id, SlotKind::Playlist),
                            None => log::info!("No playlist named '{}' in library", label),
                        }
                    }
                }
                Err(e) => log::warn!("Could not list playlists for linking: {:#}", e),
            }
        }

        let artists: Vec<&(String, String, SlotKind)> = unlinked
            .iter()
            .filter(|(_, _, kind)| *kind == SlotKind::Artist)
            .collect();
        let resolved = join_all(artists.iter().map(|(_, label, _)| self.resolve_artist(label))).await;
        for ((key, _, _), id) in artists.into_iter().zip(resolved) {
            if let Some(id) = id {
                patch.link(key, &id, SlotKind::Artist);
            }
        }

        for (key, label, kind) in &unlinked {
            if *kind == SlotKind::Album {
                log::info!("Album slot '{}' ({}) must be linked manually", key, label);
            }
        }

        if patch.is_empty() {
            log::info!("Resolver found no new links");
            return Ok(config);
        }

        log::info!("Linking {} catalog slot(s)", patch.links.len());
        Ok(self.store.patch(&patch).await?)
    }
}
