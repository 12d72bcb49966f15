use crate::catalog::types::{
    AlbumSummary, AlbumTracks, ArtistSummary, CandidateTrack, CatalogConfig, CatalogPatch,
    PlaylistSummary, Seeds,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// How many saved tracks are scanned to build the liked-id set.
const LIKED_ID_SCAN_LIMIT: usize = 2000;

/// Read access to the music catalog and the user's library.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Unique identifier (e.g., "spotify")
    fn id(&self) -> &str;

    /// Saved tracks, newest first
    async fn liked_tracks(&self, limit: usize) -> Result<Vec<CandidateTrack>>;

    /// Ids of the user's saved tracks.
    /// Default implementation scans `liked_tracks`.
    async fn liked_track_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .liked_tracks(LIKED_ID_SCAN_LIMIT)
            .await?
            .into_iter()
            .filter_map(|t| t.id)
            .collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str, limit: usize)
        -> Result<Vec<CandidateTrack>>;

    /// Tracks of an album. The returned tracks may lack album metadata;
    /// callers attach `AlbumTracks::album`.
    async fn album_tracks(&self, album_id: &str, limit: usize) -> Result<AlbumTracks>;

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<CandidateTrack>>;

    async fn artist_albums(
        &self,
        artist_id: &str,
        include_singles: bool,
    ) -> Result<Vec<AlbumSummary>>;

    /// Every playlist in the user's library
    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>>;

    async fn search_artists(&self, query: &str, limit: usize) -> Result<Vec<ArtistSummary>>;

    /// Novel tracks seeded by up to five artist/track ids
    async fn recommendations(&self, seeds: &Seeds, limit: usize) -> Result<Vec<CandidateTrack>>;
}

/// User-curated permanent exclusions. The engine only reads it.
#[async_trait]
pub trait BlockList: Send + Sync {
    async fn blocked_ids(&self) -> Result<HashSet<String>>;

    async fn is_blocked(&self, track_id: &str) -> Result<bool> {
        Ok(self.blocked_ids().await?.contains(track_id))
    }
}

#[async_trait]
impl BlockList for HashSet<String> {
    async fn blocked_ids(&self) -> Result<HashSet<String>> {
        Ok(self.clone())
    }

    async fn is_blocked(&self, track_id: &str) -> Result<bool> {
        Ok(self.contains(track_id))
    }
}

/// Persisted slot → catalog id mapping.
#[async_trait]
pub trait CatalogConfigStore: Send + Sync {
    async fn load(&self) -> Result<CatalogConfig>;

    /// Write every link in the patch atomically and return the updated config.
    async fn patch(&self, patch: &CatalogPatch) -> Result<CatalogConfig>;
}
