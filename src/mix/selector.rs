//! Balanced interleave of category pools into one list.
//!
//! Pools are visited round-robin in the order given. Each pass takes at most
//! one new track per pool until that pool's quota is met or it runs dry.
//! When the round-robin stalls short of the target the rest is filled from
//! leftover eligible tracks, then from tracks still in cooldown.

use crate::catalog::CandidateTrack;
use crate::mix::fetcher::FilteredPool;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct CategoryPool {
    pub label: String,
    pub quota: usize,
    pub pool: FilteredPool,
}

impl CategoryPool {
    pub fn new(label: &str, quota: usize, pool: FilteredPool) -> Self {
        Self {
            label: label.to_string(),
            quota,
            pool,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub tracks: Vec<CandidateTrack>,
    /// Tracks taken per pool during the round-robin, in pool order
    pub counts: Vec<(String, usize)>,
    /// Filled from leftover eligible tracks
    pub fallback: usize,
    /// Filled from tracks still in cooldown
    pub fallback_cooled: usize,
}

impl Selection {
    pub fn fallback_total(&self) -> usize {
        self.fallback + self.fallback_cooled
    }

    /// "Acoustic 7 · Artist 7 · … · Fallback 0"
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .counts
            .iter()
            .map(|(label, n)| format!("{} {}", label, n))
            .collect();
        parts.push(format!("Fallback {}", self.fallback_total()));
        parts.join(" · ")
    }

    pub fn warning(&self) -> Option<String> {
        fallback_warning(self.fallback, self.fallback_cooled)
    }
}

pub fn fallback_warning(fallback: usize, cooled: usize) -> Option<String> {
    match (fallback, cooled) {
        (0, 0) => None,
        (n, 0) => Some(format!(
            "{} track(s) were filled from other sources because some sources ran short",
            n
        )),
        (n, c) => Some(format!(
            "{} track(s) were filled from other sources because some sources ran short, \
             including {} played in the last few days",
            n + c,
            c
        )),
    }
}

/// Append tracks from `candidates` that are not yet in `seen`, up to `target`.
pub fn fill_from<R: Rng + ?Sized>(
    selected: &mut Vec<CandidateTrack>,
    seen: &mut HashSet<String>,
    mut candidates: Vec<CandidateTrack>,
    target: usize,
    rng: &mut R,
) -> usize {
    candidates.shuffle(rng);
    let mut added = 0;
    for track in candidates {
        if selected.len() >= target {
            break;
        }
        if let Some(id) = track.id.as_deref() {
            if seen.insert(id.to_string()) {
                selected.push(track);
                added += 1;
            }
        }
    }
    added
}

pub fn interleave<R: Rng + ?Sized>(
    pools: Vec<CategoryPool>,
    target: usize,
    rng: &mut R,
) -> Selection {
    let mut queues: Vec<VecDeque<CandidateTrack>> = Vec::with_capacity(pools.len());
    let mut cooled: Vec<CandidateTrack> = Vec::new();
    let mut quotas = Vec::with_capacity(pools.len());
    let mut counts: Vec<(String, usize)> = Vec::with_capacity(pools.len());

    for pool in pools {
        let mut eligible = pool.pool.eligible;
        eligible.shuffle(rng);
        queues.push(eligible.into());
        cooled.extend(pool.pool.cooled);
        quotas.push(pool.quota);
        counts.push((pool.label, 0));
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut tracks: Vec<CandidateTrack> = Vec::with_capacity(target);

    'passes: loop {
        let mut progressed = false;
        for (i, queue) in queues.iter_mut().enumerate() {
            if tracks.len() >= target {
                break 'passes;
            }
            if counts[i].1 >= quotas[i] {
                continue;
            }
            while let Some(track) = queue.pop_front() {
                let Some(id) = track.id.clone() else {
                    continue;
                };
                if seen.insert(id) {
                    tracks.push(track);
                    counts[i].1 += 1;
                    progressed = true;
                    break;
                }
            }
        }
        if !progressed {
            break;
        }
    }

    let mut selection = Selection {
        tracks,
        counts,
        fallback: 0,
        fallback_cooled: 0,
    };

    if selection.tracks.len() < target {
        let leftovers: Vec<CandidateTrack> = queues.into_iter().flatten().collect();
        selection.fallback = fill_from(&mut selection.tracks, &mut seen, leftovers, target, rng);
    }
    if selection.tracks.len() < target {
        selection.fallback_cooled =
            fill_from(&mut selection.tracks, &mut seen, cooled, target, rng);
    }

    if selection.fallback_total() > 0 {
        log::info!(
            "Fallback filled {} track(s) ({} from cooldown)",
            selection.fallback_total(),
            selection.fallback_cooled
        );
    }
    selection
}
