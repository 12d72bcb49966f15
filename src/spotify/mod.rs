pub mod client;
pub mod error;
pub mod models;
pub mod retry;

pub use client::{AccessTokenSource, SpotifyClient, StaticToken};
pub use error::SpotifyError;
pub use retry::RetryPolicy;
