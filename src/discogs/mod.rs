pub mod client;
pub mod models;

pub use client::{normalize_query, DiscogsClient, DiscogsError};
pub use models::{DiscogsTrack, ReleaseDetails, SearchResult};

use async_trait::async_trait;
use std::path::Path;

/// Catalog operations the matching workflow depends on.
///
/// Failures never surface here: a failed search is an empty list, a failed
/// detail lookup is `None`, a failed image download is `false`.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search(&self, query: &str) -> Vec<SearchResult>;

    async fn release_details(&self, id: u64) -> Option<ReleaseDetails>;

    async fn download_image(&self, uri: &str, destination: &Path) -> bool;
}
