//! Read-side boundary to the key-value store.
//!
//! Handlers fetch candidate batches through [`ContentStore`] and hand them to
//! the ranking services once they are resident in memory. The ranking code
//! never talks to the store itself.

mod memory;

pub use memory::{InMemoryStore, Seed};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{CommunityStats, ContentItem, InteractionRecord, Page};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("invalid pagination key: {0}")]
    InvalidCursor(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// One page of a community's posts in storage order (newest first).
    async fn community_posts(
        &self,
        community: &str,
        limit: usize,
        cursor: Option<String>,
    ) -> StoreResult<Page<ContentItem>>;

    /// Up to `limit` active posts across all communities.
    async fn active_posts(&self, limit: usize) -> StoreResult<Vec<ContentItem>>;

    /// Posts created at or after `since`. Rows whose timestamp cannot be
    /// read are included so the ranking layer can report them.
    async fn posts_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<ContentItem>>;

    /// Posts by id, in the order requested. Unknown ids are skipped.
    async fn posts_by_ids(&self, ids: &[String]) -> StoreResult<Vec<ContentItem>>;

    /// Most recent interactions of a user, newest first, at most `limit`.
    async fn user_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<InteractionRecord>>;

    async fn joined_communities(&self, user_id: &str) -> StoreResult<Vec<String>>;

    async fn communities(&self, limit: usize) -> StoreResult<Vec<CommunityStats>>;
}
