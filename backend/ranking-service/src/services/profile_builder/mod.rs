// ============================================
// Profile Builder
// ============================================
//
// Derives per-request viewer signals from interaction history:
// - InterestProfile: interaction counts per interest key (community or tag)
// - seen set: posts the viewer already touched
// - SimilaritySignals: tags/communities of posts the viewer upvoted
//
// Nothing here is cached or persisted. Histories arrive truncated by the
// store (a few hundred records), so the profile is best-effort by nature.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::models::{ContentItem, InteractionRecord, InterestProfile};

pub struct ProfileBuilder;

impl ProfileBuilder {
    /// Count interactions per interest key.
    ///
    /// A record contributes 1 to its community and 1 to each distinct tag it
    /// carries, all in the same keyspace. A record whose tag repeats its
    /// community name therefore adds 2 to that key. Duplicate records are
    /// counted as many times as they are supplied. The result depends only on
    /// the multiset of records, never on their order.
    pub fn build(interactions: &[InteractionRecord]) -> InterestProfile {
        let weights = interactions.iter().fold(
            BTreeMap::new(),
            |mut weights: BTreeMap<String, u64>, record| {
                let distinct_tags: BTreeSet<&String> = record.tags.iter().collect();
                for key in record.community.iter().chain(distinct_tags) {
                    *weights.entry(key.clone()).or_insert(0) += 1;
                }
                weights
            },
        );

        debug!(
            interactions = interactions.len(),
            interests = weights.len(),
            "Built interest profile"
        );

        InterestProfile::from_weights(weights)
    }
}

/// Posts the viewer has voted on, commented on or viewed.
pub fn seen_item_ids(interactions: &[InteractionRecord]) -> HashSet<String> {
    interactions
        .iter()
        .map(|record| record.post_id.clone())
        .collect()
}

/// Posts the viewer upvoted, in history order without duplicates.
pub fn upvoted_item_ids(interactions: &[InteractionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    interactions
        .iter()
        .filter(|record| record.is_upvote())
        .filter(|record| seen.insert(record.post_id.as_str()))
        .map(|record| record.post_id.clone())
        .collect()
}

/// Content-based recommendation input: what the viewer's upvoted posts are about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimilaritySignals {
    tags: Vec<String>,
    communities: Vec<String>,
}

impl SimilaritySignals {
    /// Distinct values, first occurrence wins.
    pub fn new(tags: Vec<String>, communities: Vec<String>) -> Self {
        Self {
            tags: dedup_in_order(tags),
            communities: dedup_in_order(communities),
        }
    }

    pub fn from_upvoted(posts: &[ContentItem]) -> Self {
        let tags = posts.iter().flat_map(|post| post.tags.iter().cloned()).collect();
        let communities = posts.iter().map(|post| post.community.clone()).collect();
        Self::new(tags, communities)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_community(&self, community: &str) -> bool {
        self.communities.iter().any(|c| c == community)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn communities(&self) -> &[String] {
        &self.communities
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.communities.is_empty()
    }
}

fn dedup_in_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
