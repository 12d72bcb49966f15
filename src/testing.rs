//! In-memory collaborators and track builders shared by the unit tests.

use crate::catalog::{
    AlbumRef, AlbumSummary, AlbumTracks, ArtistRef, ArtistSummary, CandidateTrack, CatalogApi,
    CatalogConfig, CatalogConfigStore, CatalogPatch, PlaylistSummary, Seeds,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn track(id: &str) -> CandidateTrack {
    CandidateTrack {
        id: Some(id.to_string()),
        uri: format!("spotify:track:{}", id),
        name: format!("Track {}", id),
        artists: vec![ArtistRef {
            id: Some("artist".to_string()),
            name: "Some Artist".to_string(),
        }],
        album: None,
        duration_ms: 200_000,
        explicit: false,
        is_playable: Some(true),
        is_local: false,
    }
}

pub fn album_ref(id: &str, name: &str, year: i32) -> AlbumRef {
    AlbumRef {
        id: Some(id.to_string()),
        name: name.to_string(),
        release_date: Some(format!("{}-01-01", year)),
        image_url: None,
    }
}

pub fn track_on(id: &str, album: &str, year: i32) -> CandidateTrack {
    CandidateTrack {
        album: Some(album_ref(album, album, year)),
        ..track(id)
    }
}

/// `prefix0`, `prefix1`, … with no album attached.
pub fn numbered(prefix: &str, n: usize) -> Vec<CandidateTrack> {
    (0..n).map(|i| track(&format!("{}{}", prefix, i))).collect()
}

pub fn album_summary(id: &str, name: &str, release_date: &str, group: &str) -> AlbumSummary {
    AlbumSummary {
        id: id.to_string(),
        name: name.to_string(),
        release_date: Some(release_date.to_string()),
        album_group: group.to_string(),
        image_url: None,
    }
}

#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub playlists: HashMap<String, Vec<CandidateTrack>>,
    pub failing_playlists: HashSet<String>,
    pub albums: HashMap<String, AlbumTracks>,
    pub top_tracks: HashMap<String, Vec<CandidateTrack>>,
    pub artist_albums: HashMap<String, Vec<AlbumSummary>>,
    pub liked: Vec<CandidateTrack>,
    pub library: Vec<PlaylistSummary>,
    pub artists: Vec<ArtistSummary>,
    pub recommended: Vec<CandidateTrack>,
    pub fail_search: bool,
    pub recommendation_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub album_listing_calls: AtomicUsize,
}

impl FakeCatalog {
    /// Album whose tracks, like the real endpoint, carry no album metadata.
    pub fn add_album(&mut self, id: &str, name: &str, year: i32, track_count: usize) {
        let tracks = (0..track_count)
            .map(|i| track(&format!("{}-t{}", id, i)))
            .collect();
        self.albums.insert(
            id.to_string(),
            AlbumTracks {
                album: album_ref(id, name, year),
                tracks,
            },
        );
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendation_calls.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    fn id(&self) -> &str {
        "fake"
    }

    async fn liked_tracks(&self, limit: usize) -> Result<Vec<CandidateTrack>> {
        Ok(self.liked.iter().take(limit).cloned().collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str, limit: usize) -> Result<Vec<CandidateTrack>> {
        if self.failing_playlists.contains(playlist_id) {
            return Err(anyhow!("HTTP 503 for playlist {}", playlist_id));
        }
        self.playlists
            .get(playlist_id)
            .map(|tracks| tracks.iter().take(limit).cloned().collect())
            .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))
    }

    async fn album_tracks(&self, album_id: &str, limit: usize) -> Result<AlbumTracks> {
        let album = self
            .albums
            .get(album_id)
            .ok_or_else(|| anyhow!("album {} not found", album_id))?;
        Ok(AlbumTracks {
            album: album.album.clone(),
            tracks: album.tracks.iter().take(limit).cloned().collect(),
        })
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<CandidateTrack>> {
        self.top_tracks
            .get(artist_id)
            .cloned()
            .ok_or_else(|| anyhow!("artist {} not found", artist_id))
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        include_singles: bool,
    ) -> Result<Vec<AlbumSummary>> {
        self.album_listing_calls.fetch_add(1, Ordering::SeqCst);
        let albums = self.artist_albums.get(artist_id).cloned().unwrap_or_default();
        Ok(albums
            .into_iter()
            .filter(|a| a.album_group == "album" || (include_singles && a.album_group == "single"))
            .collect())
    }

    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        Ok(self.library.clone())
    }

    async fn search_artists(&self, query: &str, limit: usize) -> Result<Vec<ArtistSummary>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(anyhow!("search unavailable"));
        }
        let needle = query.to_lowercase();
        Ok(self
            .artists
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recommendations(&self, _seeds: &Seeds, limit: usize) -> Result<Vec<CandidateTrack>> {
        self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.recommended.iter().take(limit).cloned().collect())
    }
}

/// Catalog config held in memory, counting writes.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    config: Mutex<CatalogConfig>,
    patches: AtomicUsize,
}

impl MemoryCatalogStore {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config: Mutex::new(config),
            patches: AtomicUsize::new(0),
        }
    }

    pub fn patch_count(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> CatalogConfig {
        self.config.lock().clone()
    }
}

#[async_trait]
impl CatalogConfigStore for MemoryCatalogStore {
    async fn load(&self) -> Result<CatalogConfig> {
        Ok(self.snapshot())
    }

    async fn patch(&self, patch: &CatalogPatch) -> Result<CatalogConfig> {
        self.patches.fetch_add(1, Ordering::SeqCst);
        let mut config = self.config.lock();
        config.apply(patch);
        Ok(config.clone())
    }
}
