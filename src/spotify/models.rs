//! Wire records for the Spotify Web API endpoints we call.
//!
//! Only the fields the engine needs are modelled. Everything is converted
//! into `catalog` types right after a response is parsed.

use crate::catalog::{
    AlbumRef, AlbumSummary, ArtistRef, ArtistSummary, CandidateTrack, PlaylistSummary,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageObject {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedAlbum {
    pub id: Option<String>,
    pub name: String,
    pub release_date: Option<String>,
    pub album_group: Option<String>,
    pub album_type: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    #[serde(default)]
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    pub album: Option<SimplifiedAlbum>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    pub is_playable: Option<bool>,
    #[serde(default)]
    pub is_local: bool,
}

/// `GET /me/tracks` item
#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrack {
    pub track: TrackObject,
}

/// `GET /playlists/{id}/tracks` item; `track` is null for removed entries
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
    #[serde(default)]
    pub is_local: bool,
}

/// `GET /albums/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    pub id: String,
    pub name: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageObject>,
    pub tracks: Paging<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    pub tracks: Vec<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRef {
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    pub tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FullArtist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistSearchResponse {
    pub artists: Paging<FullArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsResponse {
    pub tracks: Vec<TrackObject>,
}

fn first_image(images: &[ImageObject]) -> Option<String> {
    images.first().map(|i| i.url.clone())
}

impl From<SimplifiedAlbum> for AlbumRef {
    fn from(album: SimplifiedAlbum) -> Self {
        AlbumRef {
            image_url: first_image(&album.images),
            id: album.id,
            name: album.name,
            release_date: album.release_date,
        }
    }
}

impl From<TrackObject> for CandidateTrack {
    fn from(track: TrackObject) -> Self {
        CandidateTrack {
            id: track.id,
            uri: track.uri,
            name: track.name,
            artists: track
                .artists
                .into_iter()
                .map(|a| ArtistRef {
                    id: a.id,
                    name: a.name,
                })
                .collect(),
            album: track.album.map(AlbumRef::from),
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            is_playable: track.is_playable,
            is_local: track.is_local,
        }
    }
}

impl PlaylistItem {
    pub fn into_candidate(self) -> Option<CandidateTrack> {
        let is_local = self.is_local;
        self.track.map(|t| {
            let mut candidate = CandidateTrack::from(t);
            candidate.is_local |= is_local;
            candidate
        })
    }
}

impl AlbumObject {
    pub fn album_ref(&self) -> AlbumRef {
        AlbumRef {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            release_date: self.release_date.clone(),
            image_url: first_image(&self.images),
        }
    }
}

impl SimplifiedAlbum {
    pub fn into_summary(self) -> Option<AlbumSummary> {
        let group = self
            .album_group
            .clone()
            .or_else(|| self.album_type.clone())
            .unwrap_or_else(|| "album".to_string());
        Some(AlbumSummary {
            image_url: first_image(&self.images),
            id: self.id?,
            name: self.name,
            release_date: self.release_date,
            album_group: group,
        })
    }
}

impl From<SimplifiedPlaylist> for PlaylistSummary {
    fn from(p: SimplifiedPlaylist) -> Self {
        PlaylistSummary {
            id: p.id,
            name: p.name,
            track_count: p.tracks.map(|t| t.total).unwrap_or(0),
        }
    }
}

impl From<FullArtist> for ArtistSummary {
    fn from(a: FullArtist) -> Self {
        ArtistSummary {
            id: a.id,
            name: a.name,
        }
    }
}
