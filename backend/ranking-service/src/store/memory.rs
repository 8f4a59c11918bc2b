use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::{ContentStore, StoreError, StoreResult};
use crate::models::{CommunityStats, ContentItem, InteractionRecord, Page};

/// Seed file layout: the store's rows grouped by entity type.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub posts: Vec<ContentItem>,
    #[serde(default)]
    pub communities: Vec<CommunityStats>,
    #[serde(default)]
    pub interactions: Vec<InteractionRecord>,
    /// user id -> joined community names
    #[serde(default)]
    pub memberships: BTreeMap<String, Vec<String>>,
}

/// In-process store partitioned like the key-value table: posts by
/// community, interactions and memberships by user.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    posts: DashMap<String, Vec<ContentItem>>,
    interactions: DashMap<String, Vec<InteractionRecord>>,
    memberships: DashMap<String, Vec<String>>,
    communities: DashMap<String, CommunityStats>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        for post in seed.posts {
            store.insert_post(post);
        }
        for community in seed.communities {
            store.upsert_community(community);
        }
        for interaction in seed.interactions {
            store.record_interaction(interaction);
        }
        for (user_id, communities) in seed.memberships {
            for community in communities {
                store.join_community(&user_id, community);
            }
        }
        store
    }

    pub fn load_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))?;

        info!(
            path = %path.display(),
            posts = seed.posts.len(),
            communities = seed.communities.len(),
            interactions = seed.interactions.len(),
            "Loaded store seed"
        );

        Ok(Self::from_seed(seed))
    }

    /// Appends to the community partition; later inserts are newer.
    pub fn insert_post(&self, post: ContentItem) {
        self.posts
            .entry(post.community.clone())
            .or_default()
            .push(post);
    }

    pub fn record_interaction(&self, interaction: InteractionRecord) {
        self.interactions
            .entry(interaction.user_id.clone())
            .or_default()
            .push(interaction);
    }

    pub fn join_community(&self, user_id: &str, community: impl Into<String>) {
        let community = community.into();
        let mut joined = self.memberships.entry(user_id.to_string()).or_default();
        if !joined.contains(&community) {
            joined.push(community);
        }
    }

    pub fn upsert_community(&self, community: CommunityStats) {
        self.communities.insert(community.name.clone(), community);
    }

    /// Every post, partitions in name order, each partition newest first.
    fn scan_posts(&self) -> Vec<ContentItem> {
        let mut partitions: Vec<(String, Vec<ContentItem>)> = self
            .posts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        partitions.sort_by(|a, b| a.0.cmp(&b.0));

        partitions
            .into_iter()
            .flat_map(|(_, posts)| posts.into_iter().rev())
            .collect()
    }
}

fn parse_cursor(cursor: Option<String>) -> StoreResult<usize> {
    match cursor {
        None => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| StoreError::InvalidCursor(raw.clone())),
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn community_posts(
        &self,
        community: &str,
        limit: usize,
        cursor: Option<String>,
    ) -> StoreResult<Page<ContentItem>> {
        let offset = parse_cursor(cursor)?;
        let partition: Vec<ContentItem> = self
            .posts
            .get(community)
            .map(|posts| posts.iter().rev().cloned().collect())
            .unwrap_or_default();

        let items: Vec<ContentItem> = partition.iter().skip(offset).take(limit).cloned().collect();
        let next = offset + items.len();
        let last_key = (next < partition.len()).then(|| next.to_string());

        Ok(Page { items, last_key })
    }

    async fn active_posts(&self, limit: usize) -> StoreResult<Vec<ContentItem>> {
        let mut posts: Vec<ContentItem> = self
            .scan_posts()
            .into_iter()
            .filter(ContentItem::is_active)
            .collect();
        // Newest first; unreadable timestamps sink to the end.
        posts.sort_by(|a, b| b.created_at.parse().cmp(&a.created_at.parse()));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn posts_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<ContentItem>> {
        Ok(self
            .scan_posts()
            .into_iter()
            .filter(|post| post.created_at.parse().map_or(true, |at| at >= since))
            .collect())
    }

    async fn posts_by_ids(&self, ids: &[String]) -> StoreResult<Vec<ContentItem>> {
        let mut by_id: BTreeMap<String, ContentItem> = self
            .scan_posts()
            .into_iter()
            .filter(|post| ids.contains(&post.post_id))
            .map(|post| (post.post_id.clone(), post))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn user_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<InteractionRecord>> {
        Ok(self
            .interactions
            .get(user_id)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn joined_communities(&self, user_id: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .memberships
            .get(user_id)
            .map(|joined| joined.clone())
            .unwrap_or_default())
    }

    async fn communities(&self, limit: usize) -> StoreResult<Vec<CommunityStats>> {
        let mut communities: Vec<CommunityStats> = self
            .communities
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        communities.sort_by(|a, b| a.name.cmp(&b.name));
        communities.truncate(limit);
        Ok(communities)
    }
}
