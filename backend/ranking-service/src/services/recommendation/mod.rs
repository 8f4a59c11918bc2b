// ============================================
// Content-Based Recommendations
// ============================================
//
// Upvoted posts -> tags/communities -> similarity score over fresh candidates.
// Users without upvotes get the Top-ranked active posts instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{Algorithm, ContentItem, RankedResult};
use crate::services::profile_builder::SimilaritySignals;
use crate::services::ranking::{
    aged_items, rank_scored, PersonalizationContext, RankingPipeline, SortMode,
};
use crate::services::scoring;

/// Why a recommendation list looks the way it does. Echoed as `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    Personalized,
    TrendingForNewUser,
}

impl RecommendationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationReason::Personalized => "personalized",
            RecommendationReason::TrendingForNewUser => "trending_for_new_user",
        }
    }
}

/// Score unseen active candidates by similarity to what the viewer upvoted.
pub fn recommend_posts(
    candidates: &[ContentItem],
    upvoted: &HashSet<String>,
    signals: &SimilaritySignals,
    limit: usize,
    now: DateTime<Utc>,
) -> RankedResult {
    let mut issues = Vec::new();

    let eligible: Vec<&ContentItem> = candidates
        .iter()
        .filter(|item| item.is_active() && !upvoted.contains(&item.post_id))
        .collect();

    let aged = aged_items(eligible, now, &mut issues);
    let scored = aged
        .into_iter()
        .map(|(item, age)| {
            if let Some(issue) = scoring::negative_score_issue(item) {
                issues.push(issue);
            }
            (item.clone(), scoring::similarity(item, age, signals))
        })
        .collect();

    let items = rank_scored(scored, limit);

    for issue in &issues {
        warn!(issue = %issue, "Data quality issue while scoring recommendations");
    }
    debug!(
        candidates = candidates.len(),
        upvoted = upvoted.len(),
        signal_tags = signals.tags().len(),
        output_count = items.len(),
        "Content recommendations completed"
    );

    RankedResult {
        items,
        algorithm: Algorithm::ContentSimilarity,
        fallback: None,
        issues,
    }
}

/// Cold start: no upvotes to learn from, so rank by net votes.
pub fn trending_for_new_user(
    candidates: &[ContentItem],
    limit: usize,
    now: DateTime<Utc>,
) -> RankedResult {
    RankingPipeline::new().rank(
        candidates,
        SortMode::Top,
        limit,
        now,
        &PersonalizationContext::anonymous(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataQualityIssue;
    use crate::models::ItemStatus;
    use chrono::Duration;

    fn post(id: &str, community: &str, tags: &[&str], score: i64, hours_ago: i64) -> ContentItem {
        let mut item = ContentItem::new(id, community, Utc::now() - Duration::hours(hours_ago));
        item.tags = tags.iter().map(|t| t.to_string()).collect();
        item.score = score;
        item
    }

    fn ids(result: &RankedResult) -> Vec<&str> {
        result
            .items
            .iter()
            .map(|ranked| ranked.item.post_id.as_str())
            .collect()
    }

    #[test]
    fn test_recommend_posts_orders_by_similarity() {
        let now = Utc::now();
        let signals = SimilaritySignals::new(vec!["async".to_string()], vec!["rust".to_string()]);
        let mut deleted = post("deleted", "rust", &["async"], 100, 1);
        deleted.status = ItemStatus::Deleted;
        let candidates = vec![
            post("unrelated", "golang", &[], 3, 48),
            post("liked", "rust", &["async"], 10, 1),
            post("same-community", "rust", &[], 0, 48),
            post("same-tag", "python", &["async"], 1, 1),
            deleted,
        ];
        let upvoted: HashSet<String> = ["liked".to_string()].into_iter().collect();

        let result = recommend_posts(&candidates, &upvoted, &signals, 10, now);

        // same-tag: 3 + 2 + ln(2), same-community: 5, unrelated: ln(4)
        assert_eq!(ids(&result), vec!["same-tag", "same-community", "unrelated"]);
        assert_eq!(result.algorithm, Algorithm::ContentSimilarity);
    }

    #[test]
    fn test_recommend_posts_reports_clamped_scores() {
        let now = Utc::now();
        let candidates = vec![post("buried", "rust", &[], -20, 48)];

        let result = recommend_posts(
            &candidates,
            &HashSet::new(),
            &SimilaritySignals::default(),
            10,
            now,
        );

        assert_eq!(result.items[0].rank_score, Some(0.0));
        assert!(matches!(
            result.issues.as_slice(),
            [DataQualityIssue::NegativeScoreClamped { score: -20, .. }]
        ));
    }

    #[test]
    fn test_trending_for_new_user_ranks_by_top() {
        let now = Utc::now();
        let candidates = vec![
            post("low", "rust", &[], 1, 1),
            post("high", "rust", &[], 99, 100),
            post("mid", "rust", &[], 10, 5),
        ];

        let result = trending_for_new_user(&candidates, 2, now);
        assert_eq!(ids(&result), vec!["high", "mid"]);
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(RecommendationReason::Personalized.as_str(), "personalized");
        assert_eq!(
            serde_json::to_value(RecommendationReason::TrendingForNewUser).unwrap(),
            "trending_for_new_user"
        );
    }
}
