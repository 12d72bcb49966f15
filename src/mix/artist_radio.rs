//! Artist radio: one primary artist plus a roster of similar artists.
//!
//! The merged list is shuffled and then spread so neighbouring tracks come
//! from different albums, which keeps a deep-cuts primary pool intact.

use crate::catalog::CandidateTrack;
use crate::mix::fetcher::FilteredPool;
use crate::mix::deep_cuts::spread_albums;
use crate::mix::recipe::CANONICAL_LENGTH;
use crate::mix::selector::fill_from;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

/// Most tracks the primary artist gets at canonical length.
pub const PRIMARY_CAP: usize = 18;

pub fn primary_quota(total: usize) -> usize {
    let scaled = (PRIMARY_CAP as f64 * total as f64 / CANONICAL_LENGTH as f64).round() as usize;
    scaled.min(PRIMARY_CAP).min(total)
}

#[derive(Debug, Clone, Default)]
pub struct ArtistSelection {
    pub tracks: Vec<CandidateTrack>,
    pub primary: usize,
    pub similar: usize,
    pub padded: usize,
    pub warning: Option<String>,
}

impl ArtistSelection {
    pub fn summary(&self, artist_name: &str) -> String {
        format!(
            "{} {} · Similar {} · Padded {}",
            artist_name, self.primary, self.similar, self.padded
        )
    }
}

/// Pass over the pools taking one unseen track from each until `quota`
/// tracks are taken or every pool is dry. Untaken tracks stay in the pools.
pub fn round_robin(
    pools: &mut [VecDeque<CandidateTrack>],
    quota: usize,
    seen: &mut HashSet<String>,
) -> Vec<CandidateTrack> {
    let mut taken = Vec::with_capacity(quota);
    loop {
        let mut progressed = false;
        for pool in pools.iter_mut() {
            if taken.len() >= quota {
                return taken;
            }
            while let Some(track) = pool.pop_front() {
                let Some(id) = track.id.clone() else {
                    continue;
                };
                if seen.insert(id) {
                    taken.push(track);
                    progressed = true;
                    break;
                }
            }
        }
        if !progressed {
            return taken;
        }
    }
}

pub fn assemble<R: Rng + ?Sized>(
    primary: FilteredPool,
    similar: Vec<FilteredPool>,
    total: usize,
    rng: &mut R,
) -> ArtistSelection {
    let primary_target = primary_quota(total);
    let similar_target = total - primary_target;

    let mut seen = HashSet::new();
    let mut cooled = primary.cooled;

    let mut primary_pool: Vec<CandidateTrack> = primary.eligible;
    primary_pool.shuffle(rng);
    let mut primary_queue = [VecDeque::from(primary_pool)];
    let mut tracks = round_robin(&mut primary_queue, primary_target, &mut seen);
    let primary_count = tracks.len();

    let mut similar_queues: Vec<VecDeque<CandidateTrack>> = similar
        .into_iter()
        .map(|pool| {
            cooled.extend(pool.cooled);
            let mut eligible = pool.eligible;
            eligible.shuffle(rng);
            VecDeque::from(eligible)
        })
        .collect();
    let similar_tracks = round_robin(&mut similar_queues, similar_target, &mut seen);
    let similar_count = similar_tracks.len();
    tracks.extend(similar_tracks);

    let leftovers: Vec<CandidateTrack> = primary_queue
        .into_iter()
        .chain(similar_queues)
        .flatten()
        .collect();
    let mut padded = fill_from(&mut tracks, &mut seen, leftovers, total, rng);
    padded += fill_from(&mut tracks, &mut seen, cooled, total, rng);
    tracks.shuffle(rng);
    let tracks = spread_albums(tracks);

    let warning = if tracks.len() < total {
        Some(format!(
            "Only found {} of {} tracks for this artist and similar artists",
            tracks.len(),
            total
        ))
    } else if padded > 0 {
        Some(format!(
            "{} track(s) were padded because the artist or similar artists ran short",
            padded
        ))
    } else {
        None
    };

    ArtistSelection {
        tracks,
        primary: primary_count,
        similar: similar_count,
        padded,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{track, track_on};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(prefix: &str, n: usize) -> FilteredPool {
        FilteredPool::from_eligible((0..n).map(|i| track(&format!("{}{}", prefix, i))).collect())
    }

    #[test]
    fn test_primary_quota_caps_and_scales() {
        assert_eq!(primary_quota(35), 18);
        assert_eq!(primary_quota(100), 18);
        assert_eq!(primary_quota(20), 10);
        assert_eq!(primary_quota(1), 1);
    }

    #[test]
    fn test_assemble_splits_primary_and_similar() {
        let similar = vec![pool("s", 10), pool("t", 10), pool("u", 10)];
        let mut rng = StdRng::seed_from_u64(21);
        let selection = assemble(pool("p", 30), similar, 35, &mut rng);

        assert_eq!(selection.tracks.len(), 35);
        assert_eq!(selection.primary, 18);
        assert_eq!(selection.similar, 17);
        assert_eq!(selection.padded, 0);
        assert!(selection.warning.is_none());
    }

    #[test]
    fn test_similar_round_robin_spreads_artists() {
        let mut pools: Vec<VecDeque<CandidateTrack>> = ["a", "b", "c"]
            .iter()
            .map(|p| pool(p, 5).eligible.into())
            .collect();
        let mut seen = HashSet::new();
        let taken = round_robin(&mut pools, 6, &mut seen);
        let firsts: Vec<char> = taken
            .iter()
            .filter_map(|t| t.id.as_deref().and_then(|id| id.chars().next()))
            .collect();
        assert_eq!(firsts, vec!['a', 'b', 'c', 'a', 'b', 'c']);
        assert!(pools.iter().all(|p| p.len() == 3));
    }

    #[test]
    fn test_no_similar_artists_pads_from_primary() {
        let mut rng = StdRng::seed_from_u64(22);
        let selection = assemble(pool("p", 40), Vec::new(), 35, &mut rng);
        assert_eq!(selection.tracks.len(), 35);
        assert_eq!(selection.primary, 18);
        assert_eq!(selection.padded, 17);
        assert!(selection.warning.is_some());
    }

    #[test]
    fn test_merged_list_never_repeats_an_album_back_to_back() {
        let primary: Vec<CandidateTrack> = (0..6)
            .flat_map(|a| (0..3).map(move |i| track_on(&format!("p{}-{}", a, i), &format!("lp{}", a), 1996)))
            .collect();
        let similar: Vec<CandidateTrack> = (0..20)
            .map(|i| track_on(&format!("s{}", i), "hits", 2001))
            .collect();

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = assemble(
                FilteredPool::from_eligible(primary.clone()),
                vec![FilteredPool::from_eligible(similar.clone())],
                30,
                &mut rng,
            );
            assert_eq!(selection.tracks.len(), 30);
            for pair in selection.tracks.windows(2) {
                assert_ne!(pair[0].album_key(), pair[1].album_key());
            }
        }
    }

    #[test]
    fn test_short_everything_warns() {
        let mut rng = StdRng::seed_from_u64(23);
        let selection = assemble(pool("p", 5), vec![pool("s", 3)], 35, &mut rng);
        assert_eq!(selection.tracks.len(), 8);
        assert!(selection.warning.unwrap().contains("8 of 35"));
    }
}
