//! Mix composition.
//!
//! The engine turns a recipe into per-category quotas, fetches every source
//! concurrently, filters the pools and interleaves them. Rap radio and
//! artist radio have their own selection paths.

pub mod artist_radio;
pub mod cache;
pub mod deep_cuts;
pub mod engine;
pub mod fetcher;
pub mod rap_radio;
pub mod recipe;
pub mod resolver;
pub mod selector;

pub use cache::ArtistIdCache;
pub use engine::MixEngine;
pub use recipe::{compute_recipe, Recipe, SourceCategory};
pub use resolver::CatalogResolver;
