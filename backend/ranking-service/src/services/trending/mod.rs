use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{ContentItem, RankedResult};
use crate::services::ranking::{PersonalizationContext, RankingPipeline, SortMode, Timeframe};
use crate::services::scoring;

/// Tag frequency over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendingTopic {
    pub tag: String,
    pub count: u64,
}

/// Trending posts inside `timeframe`.
pub fn trending_posts(
    posts: &[ContentItem],
    timeframe: Timeframe,
    limit: usize,
    now: DateTime<Utc>,
) -> RankedResult {
    RankingPipeline::new().rank(
        posts,
        SortMode::Trending(timeframe),
        limit,
        now,
        &PersonalizationContext::anonymous(),
    )
}

/// Most used tags among active posts younger than `timeframe`.
/// Ties are broken alphabetically.
pub fn trending_topics(
    posts: &[ContentItem],
    timeframe: Timeframe,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<TrendingTopic> {
    let window = timeframe.hours() as f64;

    let counts = posts
        .iter()
        .filter(|post| post.is_active())
        .filter(|post| scoring::age_hours(&post.post_id, &post.created_at, now).hours < window)
        .flat_map(|post| post.tags.iter())
        .fold(BTreeMap::<&str, u64>::new(), |mut counts, tag| {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
            counts
        });

    let mut topics: Vec<TrendingTopic> = counts
        .into_iter()
        .map(|(tag, count)| TrendingTopic {
            tag: tag.to_string(),
            count,
        })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count));
    topics.truncate(limit);

    debug!(
        timeframe = timeframe.as_str(),
        posts = posts.len(),
        topics = topics.len(),
        "Trending topics computed"
    );

    topics
}
