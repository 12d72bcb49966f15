//! Catalog-facing seams: the types the engine consumes and the traits
//! external collaborators implement.

pub mod traits;
pub mod types;

pub use traits::{BlockList, CatalogApi, CatalogConfigStore};
pub use types::*;
