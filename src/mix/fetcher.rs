//! Source fetching and the shared eligibility filter.
//!
//! Every pool passes through [`TrackFilter`] before any selection happens.
//! Hard exclusions (local, unplayable, blocked, explicit when disallowed)
//! are dropped. Tracks still in cooldown are kept aside in
//! [`FilteredPool::cooled`] so fallback can reach them as a last resort.

use crate::catalog::{CandidateTrack, CatalogApi, CatalogConfig, Seeds, SlotKind};
use crate::mix::deep_cuts;
use crate::models::ArtistMode;
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    blocked: HashSet<String>,
    restricted: HashSet<String>,
    allow_explicit: bool,
}

impl TrackFilter {
    pub fn new(blocked: HashSet<String>, restricted: HashSet<String>, allow_explicit: bool) -> Self {
        Self {
            blocked,
            restricted,
            allow_explicit,
        }
    }

    /// Permanent exclusions for this run.
    pub fn rejects(&self, track: &CandidateTrack) -> bool {
        let Some(id) = track.id.as_deref() else {
            return true;
        };
        track.is_local
            || track.is_playable == Some(false)
            || (track.explicit && !self.allow_explicit)
            || self.blocked.contains(id)
    }

    pub fn is_cooling(&self, track: &CandidateTrack) -> bool {
        track
            .id
            .as_deref()
            .is_some_and(|id| self.restricted.contains(id))
    }

    pub fn split(&self, raw: Vec<CandidateTrack>) -> FilteredPool {
        let mut pool = FilteredPool::default();
        for track in raw {
            if self.rejects(&track) {
                continue;
            }
            let cooling = self.is_cooling(&track);
            pool.push(track, cooling);
        }
        pool
    }
}

/// A source's tracks after filtering, deduplicated by id.
#[derive(Debug, Clone, Default)]
pub struct FilteredPool {
    pub eligible: Vec<CandidateTrack>,
    pub cooled: Vec<CandidateTrack>,
    ids: HashSet<String>,
}

impl FilteredPool {
    pub fn from_eligible(tracks: Vec<CandidateTrack>) -> Self {
        let mut pool = Self::default();
        for track in tracks {
            pool.push(track, false);
        }
        pool
    }

    fn push(&mut self, track: CandidateTrack, cooling: bool) {
        let Some(id) = track.id.clone() else {
            return;
        };
        if !self.ids.insert(id) {
            return;
        }
        if cooling {
            self.cooled.push(track);
        } else {
            self.eligible.push(track);
        }
    }

    pub fn merge(&mut self, other: FilteredPool) {
        for track in other.eligible {
            self.push(track, false);
        }
        for track in other.cooled {
            self.push(track, true);
        }
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.ids.contains(track_id)
    }

    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty() && self.cooled.is_empty()
    }

    pub fn eligible_ids(&self) -> impl Iterator<Item = &str> {
        self.eligible.iter().filter_map(|t| t.id.as_deref())
    }
}

/// Merged pool for a group of sources plus any per-source failures.
#[derive(Debug, Default)]
pub struct SourcePool {
    pub pool: FilteredPool,
    /// "label: error" for each source that failed
    pub failures: Vec<String>,
}

impl SourcePool {
    fn failed(label: &str, error: anyhow::Error) -> Self {
        log::warn!("Source '{}' failed: {:#}", label, error);
        Self {
            pool: FilteredPool::default(),
            failures: vec![format!("{}: {:#}", label, error)],
        }
    }

    pub fn merge(&mut self, other: SourcePool) {
        self.pool.merge(other.pool);
        self.failures.extend(other.failures);
    }
}

pub struct SourcePoolFetcher<'a> {
    api: &'a dyn CatalogApi,
    filter: &'a TrackFilter,
    limit: usize,
}

impl<'a> SourcePoolFetcher<'a> {
    pub fn new(api: &'a dyn CatalogApi, filter: &'a TrackFilter, limit: usize) -> Self {
        Self { api, filter, limit }
    }

    /// Fetch and filter one linked source.
    pub async fn fetch_source(
        &self,
        id: &str,
        kind: SlotKind,
        mode: ArtistMode,
        seed: u64,
    ) -> anyhow::Result<FilteredPool> {
        let raw = match kind {
            SlotKind::Playlist => self.api.playlist_tracks(id, self.limit).await?,
            SlotKind::Album => {
                let listing = self.api.album_tracks(id, self.limit).await?;
                let album = listing.album;
                listing
                    .tracks
                    .into_iter()
                    .map(|t| t.with_album(&album))
                    .collect()
            }
            SlotKind::Artist => match mode {
                ArtistMode::TopTracks => self.api.artist_top_tracks(id).await?,
                ArtistMode::DeepCuts => {
                    let crawled = deep_cuts::crawl_artist_catalog(self.api, id).await?;
                    let mut pool = self.filter.split(crawled);
                    let mut rng = StdRng::seed_from_u64(seed);
                    pool.eligible = deep_cuts::select_deep_cuts(
                        std::mem::take(&mut pool.eligible),
                        self.limit,
                        &mut rng,
                    );
                    pool.cooled =
                        deep_cuts::within_album_cap(std::mem::take(&mut pool.cooled), &pool.eligible);
                    return Ok(pool);
                }
            },
        };
        log::debug!("Fetched {} raw tracks from {} {}", raw.len(), kind, id);
        Ok(self.filter.split(raw))
    }

    /// Fetch every linked slot in `keys` concurrently and merge the results.
    /// Unlinked slots are skipped.
    pub async fn fetch_slots(
        &self,
        catalog: &CatalogConfig,
        keys: &[String],
        mode: ArtistMode,
        seed: u64,
    ) -> SourcePool {
        let linked: Vec<(&str, &str, SlotKind)> = keys
            .iter()
            .filter_map(|key| match catalog.linked(key) {
                Some((id, kind)) => Some((key.as_str(), id, kind)),
                None => {
                    log::debug!("Slot '{}' is not linked, skipping", key);
                    None
                }
            })
            .collect();

        let results = join_all(linked.iter().enumerate().map(|(i, (_, id, kind))| {
            self.fetch_source(id, *kind, mode, seed.wrapping_add(i as u64))
        }))
        .await;

        let mut merged = SourcePool::default();
        for ((key, _, _), result) in linked.iter().zip(results) {
            let label = catalog.slot(key).map(|s| s.label.as_str()).unwrap_or(*key);
            match result {
                Ok(pool) => merged.pool.merge(pool),
                Err(e) => merged.merge(SourcePool::failed(label, e)),
            }
        }
        merged
    }

    pub async fn fetch_liked(&self) -> SourcePool {
        match self.api.liked_tracks(self.limit).await {
            Ok(raw) => SourcePool {
                pool: self.filter.split(raw),
                failures: Vec::new(),
            },
            Err(e) => SourcePool::failed("Liked Songs", e),
        }
    }

    pub async fn fetch_artist_top(&self, name: &str, artist_id: &str) -> SourcePool {
        match self.api.artist_top_tracks(artist_id).await {
            Ok(raw) => SourcePool {
                pool: self.filter.split(raw),
                failures: Vec::new(),
            },
            Err(e) => SourcePool::failed(name, e),
        }
    }

    pub async fn fetch_recommendations(&self, seeds: &Seeds) -> SourcePool {
        if seeds.is_empty() {
            log::debug!("No seeds for recommendations, skipping");
            return SourcePool::default();
        }
        match self.api.recommendations(seeds, self.limit).await {
            Ok(raw) => SourcePool {
                pool: self.filter.split(raw),
                failures: Vec::new(),
            },
            Err(e) => SourcePool::failed("Recommendations", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSlot;
    use crate::mix::deep_cuts::MAX_TRACKS_PER_ALBUM;
    use crate::testing::{album_summary, track, FakeCatalog};
    use std::collections::HashMap;

    fn filter(blocked: &[&str], restricted: &[&str], allow_explicit: bool) -> TrackFilter {
        TrackFilter::new(
            blocked.iter().map(|s| s.to_string()).collect(),
            restricted.iter().map(|s| s.to_string()).collect(),
            allow_explicit,
        )
    }

    #[test]
    fn test_filter_drops_hard_exclusions() {
        let mut local = track("local");
        local.is_local = true;
        let mut unplayable = track("gone");
        unplayable.is_playable = Some(false);
        let mut explicit = track("x");
        explicit.explicit = true;
        let mut no_id = track("none");
        no_id.id = None;

        let raw = vec![
            track("keep"),
            local,
            unplayable,
            explicit.clone(),
            no_id,
            track("blocked"),
        ];
        let pool = filter(&["blocked"], &[], false).split(raw.clone());
        let ids: Vec<&str> = pool.eligible_ids().collect();
        assert_eq!(ids, vec!["keep"]);

        let pool = filter(&["blocked"], &[], true).split(raw);
        assert!(pool.contains("x"));
    }

    #[test]
    fn test_filter_sets_cooling_tracks_aside() {
        let pool = filter(&[], &["warm"], true).split(vec![track("warm"), track("fresh")]);
        assert_eq!(pool.eligible.len(), 1);
        assert_eq!(pool.cooled.len(), 1);
        assert_eq!(pool.cooled[0].id.as_deref(), Some("warm"));
    }

    #[test]
    fn test_merge_dedupes_by_id() {
        let mut a = FilteredPool::from_eligible(vec![track("1"), track("2")]);
        let b = FilteredPool::from_eligible(vec![track("2"), track("3")]);
        a.merge(b);
        assert_eq!(a.eligible.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_slots_records_failures_and_keeps_rest() {
        let mut fake = FakeCatalog::default();
        fake.playlists
            .insert("pl-ok".into(), vec![track("a"), track("b")]);
        fake.failing_playlists.insert("pl-bad".into());

        let mut catalog = CatalogConfig::default();
        let slot = |label: &str, id: Option<&str>| CatalogSlot {
            label: label.into(),
            kind: SlotKind::Playlist,
            id: id.map(str::to_string),
        };
        catalog.slots.insert("ok".into(), slot("Good", Some("pl-ok")));
        catalog.slots.insert("bad".into(), slot("Broken", Some("pl-bad")));
        catalog.slots.insert("none".into(), slot("Unlinked", None));

        let f = TrackFilter::default();
        let fetcher = SourcePoolFetcher::new(&fake, &f, 50);
        let keys = vec!["ok".to_string(), "bad".to_string(), "none".to_string()];
        let result = fetcher
            .fetch_slots(&catalog, &keys, ArtistMode::TopTracks, 1)
            .await;

        assert_eq!(result.pool.eligible.len(), 2);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].starts_with("Broken"));
    }

    #[tokio::test]
    async fn test_album_source_attaches_album_metadata() {
        let mut fake = FakeCatalog::default();
        fake.add_album("illmatic", "Illmatic", 1994, 3);

        let f = TrackFilter::default();
        let fetcher = SourcePoolFetcher::new(&fake, &f, 50);
        let pool = fetcher
            .fetch_source("illmatic", SlotKind::Album, ArtistMode::TopTracks, 0)
            .await
            .unwrap();
        assert_eq!(pool.eligible.len(), 3);
        assert!(pool.eligible.iter().all(|t| t.release_year() == Some(1994)));
    }

    #[tokio::test]
    async fn test_deep_cuts_source_caps_albums_and_keeps_cooled_aside() {
        let mut fake = FakeCatalog::default();
        let albums = (0..4)
            .map(|i| {
                let id = format!("lp{}", i);
                fake.add_album(&id, &format!("Record {}", i), 1994 + i, 6);
                album_summary(&id, &format!("Record {}", i), &format!("{}-01-01", 1994 + i), "album")
            })
            .collect();
        fake.artist_albums.insert("nas".into(), albums);

        let mut restricted: Vec<String> = (0..6).map(|i| format!("lp0-t{}", i)).collect();
        restricted.push("lp1-t0".into());
        let restricted: Vec<&str> = restricted.iter().map(String::as_str).collect();
        let f = filter(&[], &restricted, true);
        let fetcher = SourcePoolFetcher::new(&fake, &f, 50);

        let pool = fetcher
            .fetch_source("nas", SlotKind::Artist, ArtistMode::DeepCuts, 7)
            .await
            .unwrap();

        assert_eq!(pool.eligible.len(), 9);
        let mut per_album: HashMap<&str, usize> = HashMap::new();
        for t in &pool.eligible {
            *per_album.entry(t.album_key().unwrap()).or_insert(0) += 1;
        }
        assert!(per_album.values().all(|&n| n == MAX_TRACKS_PER_ALBUM));
        assert!(!per_album.contains_key("lp0"));
        for pair in pool.eligible.windows(2) {
            assert_ne!(pair[0].album_key(), pair[1].album_key());
        }

        // lp0 is fully cooling; lp1's cooling track has no budget left
        assert_eq!(pool.cooled.len(), MAX_TRACKS_PER_ALBUM);
        assert!(pool.cooled.iter().all(|t| t.album_key() == Some("lp0")));
    }

    #[tokio::test]
    async fn test_empty_seeds_skip_recommendations() {
        let fake = FakeCatalog::default();
        let f = TrackFilter::default();
        let fetcher = SourcePoolFetcher::new(&fake, &f, 50);
        let result = fetcher.fetch_recommendations(&Seeds::default()).await;
        assert!(result.pool.is_empty());
        assert_eq!(fake.recommendation_count(), 0);
    }
}
