//! ClickUp API access.
//!
//! `ClickupClient` talks HTTP through a `Transport`; `CachedClickupClient`
//! puts the on-disk cache in front of it and runs time-tracking edits.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use cached_client::CachedClickupClient;
pub use error::ClickupError;
