//! Album-walking selection for an artist's less obvious tracks.
//!
//! The crawl lists the artist's albums, collapses reissues of the same
//! record, and pulls every album's tracks concurrently. Selection then caps
//! each album at [`MAX_TRACKS_PER_ALBUM`] and never places two tracks from
//! one album next to each other.

use crate::catalog::{AlbumSummary, CandidateTrack, CatalogApi};
use futures_util::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

pub const MAX_TRACKS_PER_ALBUM: usize = 3;

/// Singles are only crawled when the artist has fewer albums than this.
pub const MIN_ALBUMS_BEFORE_SINGLES: usize = 3;

/// Per-album track request size for the crawl.
pub const ALBUM_TRACK_LIMIT: usize = 50;

const EDITION_KEYWORDS: &[&str] = &[
    "deluxe",
    "remastered",
    "remaster",
    "expanded",
    "anniversary",
    "edition",
    "version",
    "bonus",
    "special",
    "collector's",
    "collectors",
    "reissue",
    "super",
];

fn is_edition_word(word: &str) -> bool {
    let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
    if EDITION_KEYWORDS.contains(&word) {
        return true;
    }
    // "20th", "25th"
    let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(&word[digits.len()..], "st" | "nd" | "rd" | "th")
}

/// Lowercase album name with bracketed parts and edition suffixes removed,
/// used to spot reissues. Words in the title proper are left alone.
pub fn normalize_album_name(name: &str) -> String {
    let lower = name.to_lowercase();

    let mut base = String::with_capacity(lower.len());
    let mut depth = 0usize;
    for c in lower.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => base.push(c),
            _ => {}
        }
    }

    // "Illmatic - 20th Anniversary Edition"
    if let Some((head, tail)) = base.split_once(" - ") {
        if tail.split_whitespace().any(is_edition_word) {
            base = head.to_string();
        }
    }

    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c == ':' || c.is_whitespace())
        .to_string()
}

/// Keep one album per normalized name, preferring the latest release.
pub fn dedupe_editions(albums: Vec<AlbumSummary>) -> Vec<AlbumSummary> {
    let mut by_name: HashMap<String, AlbumSummary> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for album in albums {
        let key = normalize_album_name(&album.name);
        match by_name.get(&key) {
            Some(existing) if existing.release_date >= album.release_date => {}
            Some(_) => {
                by_name.insert(key, album);
            }
            None => {
                order.push(key.clone());
                by_name.insert(key, album);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_name.remove(&key))
        .collect()
}

/// Every track on the artist's (deduplicated) records.
///
/// Album listing failures propagate; a failing album is skipped.
pub async fn crawl_artist_catalog(
    api: &dyn CatalogApi,
    artist_id: &str,
) -> anyhow::Result<Vec<CandidateTrack>> {
    let mut albums = dedupe_editions(api.artist_albums(artist_id, false).await?);
    if albums.len() < MIN_ALBUMS_BEFORE_SINGLES {
        log::debug!(
            "Artist {} has {} album(s), including singles",
            artist_id,
            albums.len()
        );
        albums = dedupe_editions(api.artist_albums(artist_id, true).await?);
    }

    let results = join_all(
        albums
            .iter()
            .map(|album| api.album_tracks(&album.id, ALBUM_TRACK_LIMIT)),
    )
    .await;

    let mut tracks = Vec::new();
    for (album, result) in albums.iter().zip(results) {
        match result {
            Ok(listing) => {
                let album_ref = if listing.album.id.is_some() {
                    listing.album
                } else {
                    album.to_album_ref()
                };
                tracks.extend(listing.tracks.into_iter().map(|t| t.with_album(&album_ref)));
            }
            Err(e) => log::warn!("Skipping album '{}' ({}): {:#}", album.name, album.id, e),
        }
    }

    log::debug!(
        "Crawled {} tracks over {} albums for artist {}",
        tracks.len(),
        albums.len(),
        artist_id
    );
    Ok(tracks)
}

/// Pick up to `target` tracks honouring the per-album cap and the
/// no-adjacent-album rule. Tracks without an album are unconstrained.
/// Each step takes the eligible track whose album has the most budget left.
pub fn select_deep_cuts<R: Rng + ?Sized>(
    tracks: Vec<CandidateTrack>,
    target: usize,
    rng: &mut R,
) -> Vec<CandidateTrack> {
    let mut seen = HashSet::new();
    let mut remaining: Vec<CandidateTrack> = tracks
        .into_iter()
        .filter(|t| t.id.as_ref().is_some_and(|id| seen.insert(id.clone())))
        .collect();
    remaining.shuffle(rng);

    let mut left_on_album: HashMap<String, usize> = HashMap::new();
    for key in remaining.iter().filter_map(CandidateTrack::album_key) {
        *left_on_album.entry(key.to_string()).or_insert(0) += 1;
    }
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut last_album: Option<String> = None;
    let mut selected = Vec::with_capacity(target.min(remaining.len()));

    while selected.len() < target {
        let budget = |key: &str| {
            let cap = MAX_TRACKS_PER_ALBUM - used.get(key).copied().unwrap_or(0);
            cap.min(left_on_album.get(key).copied().unwrap_or(0))
        };

        let pick = remaining
            .iter()
            .enumerate()
            .filter_map(|(i, t)| match t.album_key() {
                Some(key) if last_album.as_deref() == Some(key) => None,
                Some(key) => Some((i, budget(key))),
                None => Some((i, 1)),
            })
            .filter(|(_, budget)| *budget > 0)
            .max_by_key(|(i, budget)| (*budget, std::cmp::Reverse(*i)))
            .map(|(i, _)| i);

        let Some(index) = pick else {
            break;
        };
        let track = remaining.remove(index);
        last_album = track.album_key().map(str::to_string);
        if let Some(key) = &last_album {
            *used.entry(key.clone()).or_insert(0) += 1;
            if let Some(left) = left_on_album.get_mut(key) {
                *left -= 1;
            }
        }
        selected.push(track);
    }

    selected
}

/// Cooling tracks that still fit under the per-album cap once `selected`
/// is counted.
pub fn within_album_cap(
    cooled: Vec<CandidateTrack>,
    selected: &[CandidateTrack],
) -> Vec<CandidateTrack> {
    let mut used: HashMap<String, usize> = HashMap::new();
    for key in selected.iter().filter_map(CandidateTrack::album_key) {
        *used.entry(key.to_string()).or_insert(0) += 1;
    }
    cooled
        .into_iter()
        .filter(|t| match t.album_key() {
            Some(key) => {
                let count = used.entry(key.to_string()).or_insert(0);
                *count += 1;
                *count <= MAX_TRACKS_PER_ALBUM
            }
            None => true,
        })
        .collect()
}

/// Reorder so no two neighbours share an album wherever the mix allows it.
///
/// Each step takes the track whose album has the most tracks left, skipping
/// the album just placed; ties keep the incoming order. Albumless tracks fit
/// anywhere.
pub fn spread_albums(tracks: Vec<CandidateTrack>) -> Vec<CandidateTrack> {
    let mut left_on_album: HashMap<String, usize> = HashMap::new();
    for key in tracks.iter().filter_map(CandidateTrack::album_key) {
        *left_on_album.entry(key.to_string()).or_insert(0) += 1;
    }

    let mut remaining = tracks;
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut last_album: Option<String> = None;

    while !remaining.is_empty() {
        let pick = remaining
            .iter()
            .enumerate()
            .filter(|(_, t)| match (t.album_key(), last_album.as_deref()) {
                (Some(key), Some(last)) => key != last,
                _ => true,
            })
            .max_by_key(|(i, t)| {
                let left = t
                    .album_key()
                    .and_then(|key| left_on_album.get(key).copied())
                    .unwrap_or(0);
                (left, std::cmp::Reverse(*i))
            })
            .map(|(i, _)| i)
            // only the last album is left
            .unwrap_or(0);

        let track = remaining.remove(pick);
        last_album = track.album_key().map(str::to_string);
        if let Some(left) = last_album.as_deref().and_then(|key| left_on_album.get_mut(key)) {
            *left -= 1;
        }
        ordered.push(track);
    }

    ordered
}
