//! Weighted multi-source mix composition.
//!
//! A mix is assembled from several catalog sources (liked songs, linked
//! playlists, an artist's catalog, curated rap sources) under a per-mix
//! recipe, while skipping blocked, recently served and unplayable tracks.

pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod history;
pub mod mix;
pub mod models;
pub mod spotify;

#[cfg(test)]
mod testing;

pub use errors::{MixError, MixResult};
pub use mix::MixEngine;
