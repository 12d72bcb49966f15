//! In-memory artist name → id cache.
//!
//! Keyed by lowercase artist name so "Nas" and "nas" share one search.
//! Lives for the process unless [`ArtistIdCache::reset`] is called.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ArtistIdCache {
    entries: Mutex<HashMap<String, String>>,
}

fn cache_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ArtistIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.lock().get(&cache_key(name)).cloned()
    }

    pub fn insert(&self, name: &str, artist_id: &str) {
        self.entries
            .lock()
            .insert(cache_key(name), artist_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        log::debug!("Clearing {} cached artist ids", entries.len());
        entries.clear();
    }
}
