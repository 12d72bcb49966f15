//! Golden-era rap radio: several rap sources merged, filtered to standard
//! Latin-script entries released 1990–2009, then split between tracks the
//! user already likes and deep cuts.

use crate::catalog::CandidateTrack;
use crate::mix::fetcher::FilteredPool;
use crate::mix::selector::fill_from;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

pub const YEAR_WINDOW: RangeInclusive<i32> = 1990..=2009;
pub const FAMILIAR_RATIO: f64 = 0.8;

/// Latin-1 plus Latin Extended-A, or the General Punctuation block.
pub fn is_standard_latin_char(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{017F}' | '\u{2000}'..='\u{206F}')
}

pub fn is_standard_latin(text: &str) -> bool {
    text.chars().all(is_standard_latin_char)
}

pub fn passes_rap_filters(track: &CandidateTrack) -> bool {
    is_standard_latin(&track.name)
        && is_standard_latin(track.primary_artist())
        && track
            .release_year()
            .is_some_and(|year| YEAR_WINDOW.contains(&year))
}

pub fn familiar_target(total: usize) -> usize {
    ((total as f64 * FAMILIAR_RATIO).round() as usize).min(total)
}

#[derive(Debug, Clone, Default)]
pub struct RapSelection {
    pub tracks: Vec<CandidateTrack>,
    pub familiar: usize,
    pub deep: usize,
    pub padded: usize,
    pub warning: Option<String>,
}

impl RapSelection {
    pub fn summary(&self) -> String {
        format!(
            "Familiar {} · Deep cuts {} · Padded {}",
            self.familiar, self.deep, self.padded
        )
    }
}

/// Choose `target` tracks from the merged, predicate-filtered rap pool.
/// In-window tracks still in cooldown are the last padding resort.
pub fn select_rap_radio<R: Rng + ?Sized>(
    merged: FilteredPool,
    liked_ids: &HashSet<String>,
    target: usize,
    rng: &mut R,
) -> RapSelection {
    let (mut familiar, mut deep): (Vec<CandidateTrack>, Vec<CandidateTrack>) = merged
        .eligible
        .iter()
        .filter(|t| passes_rap_filters(t))
        .cloned()
        .partition(|t| t.id.as_deref().is_some_and(|id| liked_ids.contains(id)));
    let cooled: Vec<CandidateTrack> = merged
        .cooled
        .iter()
        .filter(|t| passes_rap_filters(t))
        .cloned()
        .collect();

    if familiar.is_empty() && deep.is_empty() && cooled.is_empty() {
        return sample_unfiltered(merged, target, rng);
    }

    familiar.shuffle(rng);
    deep.shuffle(rng);
    log::debug!(
        "Rap pool after filters: {} familiar, {} deep, {} cooling",
        familiar.len(),
        deep.len(),
        cooled.len()
    );

    let familiar_quota = familiar_target(target);
    let deep_quota = target - familiar_quota;

    let familiar_taken = familiar_quota.min(familiar.len());
    let deep_taken = deep_quota.min(deep.len());
    let mut leftovers: Vec<CandidateTrack> = familiar.split_off(familiar_taken);
    leftovers.extend(deep.split_off(deep_taken));

    let mut tracks: Vec<CandidateTrack> = familiar;
    tracks.extend(deep);
    let mut seen: HashSet<String> = tracks.iter().filter_map(|t| t.id.clone()).collect();

    let fresh = fill_from(&mut tracks, &mut seen, leftovers, target, rng);
    let repeats = fill_from(&mut tracks, &mut seen, cooled, target, rng);
    let padded = fresh + repeats;
    tracks.shuffle(rng);

    let mut warning = if tracks.len() < target {
        Some(format!(
            "Only {} of {} rap tracks matched the {}–{} filters",
            tracks.len(),
            target,
            YEAR_WINDOW.start(),
            YEAR_WINDOW.end()
        ))
    } else if padded > 0 {
        let short = if familiar_taken < familiar_quota {
            "familiar"
        } else {
            "deep cut"
        };
        Some(format!(
            "Not enough {} tracks; padded {} from the rest of the rap pool",
            short, padded
        ))
    } else {
        None
    };
    if repeats > 0 {
        if let Some(w) = warning.as_mut() {
            w.push_str(&format!(
                ", including {} played in the last few days",
                repeats
            ));
        }
    }

    RapSelection {
        tracks,
        familiar: familiar_taken,
        deep: deep_taken,
        padded,
        warning,
    }
}

/// No track survived the language and year filters.
fn sample_unfiltered<R: Rng + ?Sized>(
    merged: FilteredPool,
    target: usize,
    rng: &mut R,
) -> RapSelection {
    log::warn!("No rap source track passed the year/language filters, sampling the merged pool");

    let mut tracks = Vec::with_capacity(target);
    let mut seen = HashSet::new();
    let fresh = fill_from(&mut tracks, &mut seen, merged.eligible, target, rng);
    let cooled = fill_from(&mut tracks, &mut seen, merged.cooled, target, rng);

    RapSelection {
        tracks,
        familiar: 0,
        deep: 0,
        padded: fresh + cooled,
        warning: Some(format!(
            "No rap source track from {}–{} was found, so this is a random sample of all rap sources",
            YEAR_WINDOW.start(),
            YEAR_WINDOW.end()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::fetcher::TrackFilter;
    use crate::testing::track_on;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn era_pool(prefix: &str, n: usize, year: i32) -> Vec<CandidateTrack> {
        (0..n)
            .map(|i| track_on(&format!("{}{}", prefix, i), &format!("{}-album", prefix), year))
            .collect()
    }

    fn liked(ids: impl IntoIterator<Item = String>) -> HashSet<String> {
        ids.into_iter().collect()
    }

    #[test]
    fn test_latin_heuristic() {
        assert!(is_standard_latin("N.Y. State of Mind"));
        assert!(is_standard_latin("Beyoncé – Déjà Vu"));
        assert!(is_standard_latin("Łódź"));
        assert!(!is_standard_latin("東京"));
        assert!(!is_standard_latin("Привет"));
    }

    #[test]
    fn test_year_window_is_inclusive() {
        assert!(passes_rap_filters(&track_on("a", "x", 1990)));
        assert!(passes_rap_filters(&track_on("b", "x", 2009)));
        assert!(!passes_rap_filters(&track_on("c", "x", 1989)));
        assert!(!passes_rap_filters(&track_on("d", "x", 2010)));
    }

    #[test]
    fn test_familiar_deep_split() {
        let familiar = era_pool("f", 40, 1994);
        let deep = era_pool("d", 40, 1998);
        let liked_ids = liked(familiar.iter().filter_map(|t| t.id.clone()));
        let mut all = familiar;
        all.extend(deep);

        let mut rng = StdRng::seed_from_u64(9);
        let selection =
            select_rap_radio(FilteredPool::from_eligible(all), &liked_ids, 35, &mut rng);

        assert_eq!(selection.tracks.len(), 35);
        assert_eq!(selection.familiar, 28);
        assert_eq!(selection.deep, 7);
        assert_eq!(selection.padded, 0);
        assert!(selection.warning.is_none());
        let familiar_in_result = selection
            .tracks
            .iter()
            .filter(|t| liked_ids.contains(t.id.as_deref().unwrap()))
            .count();
        assert_eq!(familiar_in_result, 28);
    }

    #[test]
    fn test_short_familiar_pads_with_deep_cuts() {
        let familiar = era_pool("f", 5, 1995);
        let liked_ids = liked(familiar.iter().filter_map(|t| t.id.clone()));
        let mut all = familiar;
        all.extend(era_pool("d", 50, 2001));

        let mut rng = StdRng::seed_from_u64(10);
        let selection =
            select_rap_radio(FilteredPool::from_eligible(all), &liked_ids, 20, &mut rng);

        assert_eq!(selection.tracks.len(), 20);
        assert_eq!(selection.familiar, 5);
        assert_eq!(selection.deep, 4);
        assert_eq!(selection.padded, 11);
        assert!(selection.warning.unwrap().contains("familiar"));
    }

    #[test]
    fn test_out_of_window_pool_falls_back_to_sample() {
        let all = era_pool("new", 60, 2015);
        let mut rng = StdRng::seed_from_u64(12);
        let selection =
            select_rap_radio(FilteredPool::from_eligible(all), &HashSet::new(), 35, &mut rng);

        assert_eq!(selection.tracks.len(), 35);
        assert!(selection.warning.as_deref().unwrap().contains("random sample"));
        let unique: HashSet<_> = selection.tracks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(unique.len(), 35);
    }

    #[test]
    fn test_cooling_era_tracks_beat_the_random_sample() {
        let classics = era_pool("old", 40, 1996);
        let restricted: HashSet<String> = classics.iter().filter_map(|t| t.id.clone()).collect();
        let mut all = classics;
        all.extend(era_pool("new", 40, 2018));
        let merged = TrackFilter::new(HashSet::new(), restricted, true).split(all);
        assert!(merged.eligible.iter().all(|t| !passes_rap_filters(t)));

        let mut rng = StdRng::seed_from_u64(13);
        let selection = select_rap_radio(merged, &HashSet::new(), 20, &mut rng);

        assert_eq!(selection.tracks.len(), 20);
        assert!(selection.tracks.iter().all(passes_rap_filters));
        assert_eq!(selection.padded, 20);
        let warning = selection.warning.unwrap();
        assert!(!warning.contains("random sample"));
        assert!(warning.contains("20 played in the last few days"));
    }

    #[test]
    fn test_missing_release_year_is_filtered() {
        let mut undated = track_on("u", "x", 1995);
        if let Some(album) = undated.album.as_mut() {
            album.release_date = None;
        }
        assert!(!passes_rap_filters(&undated));
    }
}
