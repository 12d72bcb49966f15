use crate::models::Track;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maximum number of seeds the recommendation endpoint accepts.
pub const MAX_SEEDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: Option<String>,
    pub name: String,
    /// "YYYY", "YYYY-MM" or "YYYY-MM-DD"
    pub release_date: Option<String>,
    pub image_url: Option<String>,
}

impl AlbumRef {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

/// A track as fetched from the catalog, before it is mapped to [`Track`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrack {
    /// Missing for local files
    pub id: Option<String>,
    pub uri: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub duration_ms: u64,
    pub explicit: bool,
    /// Only reported when the request carried a market
    pub is_playable: Option<bool>,
    pub is_local: bool,
}

impl CandidateTrack {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("")
    }

    pub fn release_year(&self) -> Option<i32> {
        self.album.as_ref().and_then(AlbumRef::release_year)
    }

    /// Key used to group tracks by record: album id, else album name.
    pub fn album_key(&self) -> Option<&str> {
        let album = self.album.as_ref()?;
        album.id.as_deref().or(Some(album.name.as_str()))
    }

    /// Album endpoints omit the album on each track; attach it from the parent.
    pub fn with_album(mut self, album: &AlbumRef) -> Self {
        if self.album.is_none() {
            self.album = Some(album.clone());
        }
        self
    }

    pub fn to_track(&self) -> Option<Track> {
        let id = self.id.clone()?;
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Some(Track {
            id,
            uri: self.uri.clone(),
            title: self.name.clone(),
            artist,
            album: self.album.as_ref().map(|a| a.name.clone()),
            image_url: self.album.as_ref().and_then(|a| a.image_url.clone()),
            duration_ms: (self.duration_ms > 0).then_some(self.duration_ms),
            is_new: None,
            status: Default::default(),
        })
    }
}

/// Tracks of one album together with the album they belong to.
#[derive(Debug, Clone)]
pub struct AlbumTracks {
    pub album: AlbumRef,
    pub tracks: Vec<CandidateTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub release_date: Option<String>,
    /// "album", "single", "compilation" or "appears_on"
    pub album_group: String,
    pub image_url: Option<String>,
}

impl AlbumSummary {
    pub fn to_album_ref(&self) -> AlbumRef {
        AlbumRef {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            release_date: self.release_date.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub track_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
}

/// Seed ids for a recommendation query, at most [`MAX_SEEDS`] in total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seeds {
    pub artists: Vec<String>,
    pub tracks: Vec<String>,
}

impl Seeds {
    pub fn new(artists: Vec<String>, tracks: Vec<String>) -> Self {
        let mut artists = artists;
        artists.truncate(MAX_SEEDS);
        let mut tracks = tracks;
        tracks.truncate(MAX_SEEDS - artists.len());
        Self { artists, tracks }
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.tracks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Playlist,
    Album,
    Artist,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Playlist => write!(f, "playlist"),
            SlotKind::Album => write!(f, "album"),
            SlotKind::Artist => write!(f, "artist"),
        }
    }
}

impl FromStr for SlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "playlist" => Ok(SlotKind::Playlist),
            "album" => Ok(SlotKind::Album),
            "artist" => Ok(SlotKind::Artist),
            _ => Err(format!(
                "Invalid slot kind: '{}'. Valid: playlist, album, artist",
                s
            )),
        }
    }
}

/// One logical source, e.g. "90s Acoustic" → a playlist id once linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSlot {
    /// Human-readable name, also what the resolver searches for
    pub label: String,
    pub kind: SlotKind,
    /// `None` means unlinked
    pub id: Option<String>,
}

impl CatalogSlot {
    pub fn unlinked(label: &str, kind: SlotKind) -> Self {
        Self {
            label: label.to_string(),
            kind,
            id: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub slots: BTreeMap<String, CatalogSlot>,
    /// Slot keys feeding rap radio
    #[serde(default)]
    pub rap_sources: Vec<String>,
    /// Artist names used by artist radio
    #[serde(default)]
    pub similar_artists: Vec<String>,
}

impl CatalogConfig {
    pub fn slot(&self, key: &str) -> Option<&CatalogSlot> {
        self.slots.get(key)
    }

    /// Linked id and kind for a slot, `None` when absent or unlinked.
    pub fn linked(&self, key: &str) -> Option<(&str, SlotKind)> {
        let slot = self.slots.get(key)?;
        if !slot.is_linked() {
            return None;
        }
        slot.id.as_deref().map(|id| (id, slot.kind))
    }

    pub fn unlinked_keys(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.is_linked())
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn apply(&mut self, patch: &CatalogPatch) {
        for link in &patch.links {
            match self.slots.get_mut(&link.key) {
                Some(slot) => {
                    slot.id = Some(link.id.clone());
                    slot.kind = link.kind;
                }
                None => {
                    self.slots.insert(
                        link.key.clone(),
                        CatalogSlot {
                            label: link.key.clone(),
                            kind: link.kind,
                            id: Some(link.id.clone()),
                        },
                    );
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLink {
    pub key: String,
    pub id: String,
    pub kind: SlotKind,
}

/// A batch of slot links written in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPatch {
    pub links: Vec<SlotLink>,
}

impl CatalogPatch {
    pub fn link(&mut self, key: &str, id: &str, kind: SlotKind) {
        self.links.push(SlotLink {
            key: key.to_string(),
            id: id.to_string(),
            kind,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(album: Option<AlbumRef>) -> CandidateTrack {
        CandidateTrack {
            id: Some("t1".into()),
            uri: "spotify:track:t1".into(),
            name: "N.Y. State of Mind".into(),
            artists: vec![ArtistRef {
                id: Some("a1".into()),
                name: "Nas".into(),
            }],
            album,
            duration_ms: 294_000,
            explicit: true,
            is_playable: Some(true),
            is_local: false,
        }
    }

    fn illmatic() -> AlbumRef {
        AlbumRef {
            id: Some("al1".into()),
            name: "Illmatic".into(),
            release_date: Some("1994-04-19".into()),
            image_url: Some("https://img/illmatic".into()),
        }
    }

    #[test]
    fn test_release_year_parses_prefix() {
        assert_eq!(illmatic().release_year(), Some(1994));
        let year_only = AlbumRef {
            release_date: Some("2001".into()),
            ..illmatic()
        };
        assert_eq!(year_only.release_year(), Some(2001));
        let missing = AlbumRef {
            release_date: None,
            ..illmatic()
        };
        assert_eq!(missing.release_year(), None);
    }

    #[test]
    fn test_with_album_only_fills_missing() {
        let attached = candidate(None).with_album(&illmatic());
        assert_eq!(attached.album_key(), Some("al1"));

        let other = AlbumRef {
            id: Some("al2".into()),
            ..illmatic()
        };
        let kept = attached.with_album(&other);
        assert_eq!(kept.album_key(), Some("al1"));
    }

    #[test]
    fn test_to_track_maps_fields() {
        let track = candidate(Some(illmatic())).to_track().unwrap();
        assert_eq!(track.id, "t1");
        assert_eq!(track.artist, "Nas");
        assert_eq!(track.album.as_deref(), Some("Illmatic"));
        assert_eq!(track.image_url.as_deref(), Some("https://img/illmatic"));
        assert_eq!(track.duration_ms, Some(294_000));

        let local = CandidateTrack {
            id: None,
            ..candidate(None)
        };
        assert!(local.to_track().is_none());
    }

    #[test]
    fn test_seeds_capped_at_five() {
        let seeds = Seeds::new(
            vec!["a1".into(), "a2".into()],
            (0..10).map(|i| format!("t{}", i)).collect(),
        );
        assert_eq!(seeds.artists.len() + seeds.tracks.len(), MAX_SEEDS);
        assert_eq!(seeds.tracks.len(), 3);
    }

    #[test]
    fn test_apply_patch_links_slots() {
        let mut config = CatalogConfig::default();
        config.slots.insert(
            "acoustic_playlist".into(),
            CatalogSlot::unlinked("90s Acoustic", SlotKind::Playlist),
        );
        assert_eq!(config.unlinked_keys(), vec!["acoustic_playlist".to_string()]);

        let mut patch = CatalogPatch::default();
        patch.link("acoustic_playlist", "pl1", SlotKind::Playlist);
        config.apply(&patch);

        assert_eq!(
            config.linked("acoustic_playlist"),
            Some(("pl1", SlotKind::Playlist))
        );
        assert!(config.unlinked_keys().is_empty());
    }

    #[test]
    fn test_blank_id_counts_as_unlinked() {
        let slot = CatalogSlot {
            label: "x".into(),
            kind: SlotKind::Album,
            id: Some("  ".into()),
        };
        assert!(!slot.is_linked());
    }
}
