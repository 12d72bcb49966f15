use super::error::SpotifyError;
use super::models::*;
use super::retry::RetryPolicy;
use crate::catalog::{
    AlbumSummary, AlbumTracks, ArtistSummary, CandidateTrack, CatalogApi, PlaylistSummary, Seeds,
    SlotKind,
};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

const LIKED_PAGE_SIZE: usize = 50;
const PLAYLIST_PAGE_SIZE: usize = 100;
const ALBUM_PAGE_SIZE: usize = 50;

/// Source of bearer tokens. Acquiring and refreshing them lives elsewhere.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> anyhow::Result<String>;
}

/// A token obtained out of band, e.g. from an environment variable.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
    market: String,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(tokens: Arc<dyn AccessTokenSource>, market: &str) -> Result<Self, SpotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            tokens,
            base_url: API_BASE_URL.to_string(),
            market: market.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Extract a catalog id and its kind from a URI, an open.spotify.com URL
    /// or a bare 22-character id (assumed to be of `default_kind`).
    pub fn parse_catalog_ref(
        input: &str,
        default_kind: SlotKind,
    ) -> Result<(String, SlotKind), SpotifyError> {
        let trimmed = input.trim();

        for kind in [SlotKind::Playlist, SlotKind::Album, SlotKind::Artist] {
            let uri_prefix = format!("spotify:{}:", kind);
            if let Some(id) = trimmed.strip_prefix(&uri_prefix) {
                return Ok((id.to_string(), kind));
            }

            let url_marker = format!("open.spotify.com/{}/", kind);
            if let Some((_, id_part)) = trimmed.split_once(&url_marker) {
                let id = id_part.split(['?', '/']).next().unwrap_or(id_part);
                return Ok((id.to_string(), kind));
            }
        }

        if trimmed.contains("spotify.link/") {
            return Err(SpotifyError::InvalidUrl(
                "Share links are not supported. Please use the full URL.".to_string(),
            ));
        }

        if trimmed.len() == 22 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok((trimmed.to_string(), default_kind));
        }

        Err(SpotifyError::InvalidUrl(format!(
            "Could not extract a catalog id from: {}",
            input
        )))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        operation: &str,
    ) -> Result<T, SpotifyError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| SpotifyError::Token(e.to_string()))?;

        let mut attempt = 0;
        loop {
            let sent = self
                .client
                .get(url)
                .bearer_auth(&token)
                .query(params)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt, None);
                    log::warn!(
                        "{} transport error (attempt {}): {}, retrying in {:?}",
                        operation,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status.is_success() {
                let text = response.text().await?;
                return serde_json::from_str(&text).map_err(|e| {
                    SpotifyError::Parse(format!("{} response: {}", operation, e))
                });
            }

            if RetryPolicy::is_retryable(status.as_u16()) && self.retry.should_retry(attempt) {
                let hint = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                let delay = self.retry.delay_for(attempt, hint);
                log::warn!(
                    "{} returned {} (attempt {}), retrying in {:?}",
                    operation,
                    status,
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED => SpotifyError::Unauthorized,
                StatusCode::NOT_FOUND => SpotifyError::NotFound(operation.to_string()),
                StatusCode::TOO_MANY_REQUESTS => SpotifyError::RateLimited,
                _ => SpotifyError::Api {
                    status: status.as_u16(),
                    message: body,
                },
            });
        }
    }

    /// Follow `next` links until `limit` items are collected or pages run out.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&str, String)>,
        page_size: usize,
        limit: usize,
        operation: &str,
    ) -> Result<Vec<T>, SpotifyError> {
        params.push(("limit", page_size.min(limit.max(1)).to_string()));

        let first: Paging<T> = self.get_json(&self.url(path), &params, operation).await?;
        let mut items = first.items;
        let mut next = first.next;

        while items.len() < limit {
            let Some(next_url) = next.take() else { break };
            let page: Paging<T> = self.get_json(&next_url, &[], operation).await?;
            if page.items.is_empty() {
                break;
            }
            items.extend(page.items);
            next = page.next;
        }

        items.truncate(limit);
        log::debug!("{}: fetched {} item(s)", operation, items.len());
        Ok(items)
    }

    fn market_param(&self) -> Vec<(&'static str, String)> {
        vec![("market", self.market.clone())]
    }
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    fn id(&self) -> &str {
        "spotify"
    }

    async fn liked_tracks(&self, limit: usize) -> anyhow::Result<Vec<CandidateTrack>> {
        let saved: Vec<SavedTrack> = self
            .get_paged("/me/tracks", self.market_param(), LIKED_PAGE_SIZE, limit, "liked tracks")
            .await?;
        Ok(saved.into_iter().map(|s| s.track.into()).collect())
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<CandidateTrack>> {
        let mut params = self.market_param();
        params.push(("additional_types", "track".to_string()));

        let items: Vec<PlaylistItem> = self
            .get_paged(
                &format!("/playlists/{}/tracks", playlist_id),
                params,
                PLAYLIST_PAGE_SIZE,
                limit,
                "playlist tracks",
            )
            .await?;
        Ok(items
            .into_iter()
            .filter_map(PlaylistItem::into_candidate)
            .collect())
    }

    async fn album_tracks(&self, album_id: &str, limit: usize) -> anyhow::Result<AlbumTracks> {
        let album: AlbumObject = self
            .get_json(
                &self.url(&format!("/albums/{}", album_id)),
                &self.market_param(),
                "album",
            )
            .await?;
        let album_ref = album.album_ref();

        let mut tracks: Vec<CandidateTrack> =
            album.tracks.items.into_iter().map(Into::into).collect();
        let mut next = album.tracks.next;

        while tracks.len() < limit {
            let Some(next_url) = next.take() else { break };
            let page: Paging<TrackObject> = self.get_json(&next_url, &[], "album tracks").await?;
            if page.items.is_empty() {
                break;
            }
            tracks.extend(page.items.into_iter().map(CandidateTrack::from));
            next = page.next;
        }
        tracks.truncate(limit);

        log::debug!("album {}: fetched {} track(s)", album_id, tracks.len());
        Ok(AlbumTracks {
            album: album_ref,
            tracks,
        })
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> anyhow::Result<Vec<CandidateTrack>> {
        let response: TopTracksResponse = self
            .get_json(
                &self.url(&format!("/artists/{}/top-tracks", artist_id)),
                &self.market_param(),
                "artist top tracks",
            )
            .await?;
        Ok(response.tracks.into_iter().map(Into::into).collect())
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        include_singles: bool,
    ) -> anyhow::Result<Vec<AlbumSummary>> {
        let groups = if include_singles { "album,single" } else { "album" };
        let mut params = self.market_param();
        params.push(("include_groups", groups.to_string()));

        let albums: Vec<SimplifiedAlbum> = self
            .get_paged(
                &format!("/artists/{}/albums", artist_id),
                params,
                ALBUM_PAGE_SIZE,
                usize::MAX,
                "artist albums",
            )
            .await?;
        Ok(albums
            .into_iter()
            .filter_map(SimplifiedAlbum::into_summary)
            .collect())
    }

    async fn user_playlists(&self) -> anyhow::Result<Vec<PlaylistSummary>> {
        let playlists: Vec<SimplifiedPlaylist> = self
            .get_paged("/me/playlists", Vec::new(), 50, usize::MAX, "user playlists")
            .await?;
        Ok(playlists.into_iter().map(Into::into).collect())
    }

    async fn search_artists(&self, query: &str, limit: usize) -> anyhow::Result<Vec<ArtistSummary>> {
        let params = [
            ("q", query.to_string()),
            ("type", "artist".to_string()),
            ("limit", limit.clamp(1, 50).to_string()),
        ];
        let response: ArtistSearchResponse = self
            .get_json(&self.url("/search"), &params, "artist search")
            .await?;
        Ok(response.artists.items.into_iter().map(Into::into).collect())
    }

    async fn recommendations(
        &self,
        seeds: &Seeds,
        limit: usize,
    ) -> anyhow::Result<Vec<CandidateTrack>> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let mut params = self.market_param();
        params.push(("limit", limit.clamp(1, 100).to_string()));
        if !seeds.artists.is_empty() {
            params.push(("seed_artists", seeds.artists.join(",")));
        }
        if !seeds.tracks.is_empty() {
            params.push(("seed_tracks", seeds.tracks.join(",")));
        }

        let response: RecommendationsResponse = self
            .get_json(&self.url("/recommendations"), &params, "recommendations")
            .await?;
        Ok(response.tracks.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri() {
        let (id, kind) = SpotifyClient::parse_catalog_ref(
            "spotify:album:4wExFfncaUIqSgoxnqa3Eh",
            SlotKind::Playlist,
        )
        .unwrap();
        assert_eq!(id, "4wExFfncaUIqSgoxnqa3Eh");
        assert_eq!(kind, SlotKind::Album);
    }

    #[test]
    fn test_parse_url_with_query() {
        let (id, kind) = SpotifyClient::parse_catalog_ref(
            "https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd?si=abc",
            SlotKind::Album,
        )
        .unwrap();
        assert_eq!(id, "37i9dQZF1DX0XUsuxWHRQd");
        assert_eq!(kind, SlotKind::Playlist);
    }

    #[test]
    fn test_parse_bare_id_uses_default_kind() {
        let (id, kind) =
            SpotifyClient::parse_catalog_ref("20qISvAhX20dpIbOOzGK3q", SlotKind::Artist).unwrap();
        assert_eq!(id, "20qISvAhX20dpIbOOzGK3q");
        assert_eq!(kind, SlotKind::Artist);
    }

    #[test]
    fn test_parse_rejects_share_links_and_junk() {
        assert!(matches!(
            SpotifyClient::parse_catalog_ref("https://spotify.link/abc", SlotKind::Playlist),
            Err(SpotifyError::InvalidUrl(_))
        ));
        assert!(SpotifyClient::parse_catalog_ref("not an id", SlotKind::Playlist).is_err());
    }

    #[tokio::test]
    async fn test_static_token() {
        let token = StaticToken("abc".to_string());
        assert_eq!(token.access_token().await.unwrap(), "abc");
    }
}
