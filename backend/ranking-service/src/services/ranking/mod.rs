//! Ranking Pipeline
//!
//! Turns a store batch into an ordered, truncated feed for one sort mode.
//!
//! # Workflow
//! 1. Drop every item whose status is not `active`
//! 2. Compute each item's age once against the caller's `now`
//! 3. Score with the mode's formula from [`crate::services::scoring`]
//! 4. Stable sort descending (ties keep input order), truncate to `limit`
//!
//! The personalized mode resolves its inputs into an explicit
//! [`Personalization`] first; missing inputs select the Hot fallback and the
//! result says why.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{DataQualityIssue, FallbackReason};
use crate::models::{Algorithm, ContentItem, InterestProfile, RankedItem, RankedResult};
use crate::services::scoring::{self, PersonalSignals};

/// Lookback window for trending content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl Timeframe {
    pub fn hours(&self) -> i64 {
        match self {
            Timeframe::Hour => 1,
            Timeframe::Day => 24,
            Timeframe::Week => 168,
            Timeframe::Month => 720,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(self.hours())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    New,
    Hot,
    Top,
    Controversial,
    Trending(Timeframe),
    Personalized,
}

impl SortMode {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            SortMode::New => Algorithm::New,
            SortMode::Hot => Algorithm::Hot,
            SortMode::Top => Algorithm::Top,
            SortMode::Controversial => Algorithm::Controversial,
            SortMode::Trending(_) => Algorithm::Trending,
            SortMode::Personalized => Algorithm::CollaborativeFilteringWithHotRanking,
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    /// `trending` without an explicit window means the last day.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "new" => Ok(SortMode::New),
            "hot" => Ok(SortMode::Hot),
            "top" => Ok(SortMode::Top),
            "controversial" => Ok(SortMode::Controversial),
            "trending" => Ok(SortMode::Trending(Timeframe::default())),
            "personalized" => Ok(SortMode::Personalized),
            other => Err(format!("unknown sort mode: {other}")),
        }
    }
}

/// Viewer inputs for the personalized mode, as far as the handler could
/// gather them. Any `None` selects the Hot fallback.
#[derive(Debug, Clone, Default)]
pub struct PersonalizationContext {
    /// Viewer id; their own posts are left out of the fallback feed.
    pub viewer: Option<String>,
    pub profile: Option<InterestProfile>,
    pub joined: Option<HashSet<String>>,
    pub seen: Option<HashSet<String>>,
}

impl PersonalizationContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn complete(
        viewer: impl Into<String>,
        profile: InterestProfile,
        joined: HashSet<String>,
        seen: HashSet<String>,
    ) -> Self {
        Self {
            viewer: Some(viewer.into()),
            profile: Some(profile),
            joined: Some(joined),
            seen: Some(seen),
        }
    }

    pub fn resolve(&self) -> Personalization<'_> {
        match (&self.profile, &self.joined, &self.seen) {
            (Some(profile), Some(joined), Some(seen)) => {
                Personalization::Personalized(PersonalSignals {
                    profile,
                    joined,
                    seen,
                })
            }
            (None, _, _) => Personalization::Fallback {
                reason: FallbackReason::MissingProfile,
            },
            (_, None, _) => Personalization::Fallback {
                reason: FallbackReason::MissingJoinedCommunities,
            },
            (_, _, None) => Personalization::Fallback {
                reason: FallbackReason::MissingInteractionHistory,
            },
        }
    }

    /// Fallback exclusion: the viewer's own posts and anything already seen.
    fn excludes(&self, item: &ContentItem) -> bool {
        let authored = match (&self.viewer, &item.author_id) {
            (Some(viewer), Some(author)) => viewer == author,
            _ => false,
        };
        let seen = self
            .seen
            .as_ref()
            .map(|seen| seen.contains(&item.post_id))
            .unwrap_or(false);
        authored || seen
    }
}

/// How a personalized request will actually be served.
#[derive(Debug, Clone, Copy)]
pub enum Personalization<'a> {
    Personalized(PersonalSignals<'a>),
    Fallback { reason: FallbackReason },
}

/// Ranking pipeline over content items
pub struct RankingPipeline;

impl Default for RankingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Rank `items` for `mode`, returning at most `limit` entries.
    ///
    /// Never fails: empty input gives an empty result and bad rows are scored
    /// with safe defaults and reported in [`RankedResult::issues`].
    pub fn rank(
        &self,
        items: &[ContentItem],
        mode: SortMode,
        limit: usize,
        now: DateTime<Utc>,
        context: &PersonalizationContext,
    ) -> RankedResult {
        let active: Vec<&ContentItem> = items.iter().filter(|item| item.is_active()).collect();
        let mut issues = Vec::new();
        let mut algorithm = mode.algorithm();
        let mut fallback = None;

        let ranked = match mode {
            SortMode::New => newest_first(active, limit),
            SortMode::Hot => {
                let aged = aged_items(active, now, &mut issues);
                rank_scored(score_hot(aged), limit)
            }
            SortMode::Top => rank_scored(
                active
                    .into_iter()
                    .map(|item| (item.clone(), scoring::top(item)))
                    .collect(),
                limit,
            ),
            SortMode::Controversial => rank_scored(
                active
                    .into_iter()
                    .map(|item| {
                        (
                            item.clone(),
                            scoring::controversial(item.upvotes, item.downvotes),
                        )
                    })
                    .collect(),
                limit,
            ),
            SortMode::Trending(timeframe) => {
                let window = timeframe.hours() as f64;
                let scored = aged_items(active, now, &mut issues)
                    .into_iter()
                    .filter(|(_, age)| *age < window)
                    .map(|(item, age)| (item.clone(), scoring::trending(item, age)))
                    .collect();
                rank_scored(scored, limit)
            }
            SortMode::Personalized => match context.resolve() {
                Personalization::Personalized(signals) => {
                    let scored = aged_items(active, now, &mut issues)
                        .into_iter()
                        .map(|(item, age)| {
                            (item.clone(), scoring::personalized_hot(item, age, signals))
                        })
                        .collect();
                    rank_scored(scored, limit)
                }
                Personalization::Fallback { reason } => {
                    algorithm = Algorithm::Hot;
                    fallback = Some(reason);
                    let eligible = active
                        .into_iter()
                        .filter(|item| !context.excludes(item))
                        .collect();
                    let aged = aged_items(eligible, now, &mut issues);
                    rank_scored(score_hot(aged), limit)
                }
            },
        };

        for issue in &issues {
            warn!(issue = %issue, "Data quality issue while ranking");
        }

        debug!(
            mode = ?mode,
            algorithm = algorithm.as_str(),
            fallback = fallback.map(|reason: FallbackReason| reason.as_str()),
            input_count = items.len(),
            output_count = ranked.len(),
            issue_count = issues.len(),
            "Ranking completed"
        );

        RankedResult {
            items: ranked,
            algorithm,
            fallback,
            issues,
        }
    }
}

/// Pair each item with its age in hours, recording timestamp problems.
pub fn aged_items<'a>(
    items: Vec<&'a ContentItem>,
    now: DateTime<Utc>,
    issues: &mut Vec<DataQualityIssue>,
) -> Vec<(&'a ContentItem, f64)> {
    items
        .into_iter()
        .map(|item| {
            let age = scoring::age_hours(&item.post_id, &item.created_at, now);
            if let Some(issue) = age.issue {
                issues.push(issue);
            }
            (item, age.hours)
        })
        .collect()
}

fn score_hot(aged: Vec<(&ContentItem, f64)>) -> Vec<(ContentItem, f64)> {
    aged.into_iter()
        .map(|(item, age)| (item.clone(), scoring::hot(item.score, age)))
        .collect()
}

/// Stable descending sort on score, truncated to `limit`. Equal scores keep
/// their input order.
pub fn rank_scored<T>(mut scored: Vec<(T, f64)>, limit: usize) -> Vec<RankedItem<T>> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(item, score)| RankedItem {
            item,
            rank_score: Some(score),
        })
        .collect()
}

/// Storage order, flipped when the batch arrived oldest-first.
fn newest_first(mut items: Vec<&ContentItem>, limit: usize) -> Vec<RankedItem<ContentItem>> {
    if is_oldest_first(&items) {
        items.reverse();
    }

    items
        .into_iter()
        .take(limit)
        .map(|item| RankedItem {
            item: item.clone(),
            rank_score: None,
        })
        .collect()
}

/// True when every timestamp parses, none decreases and at least one increases.
fn is_oldest_first(items: &[&ContentItem]) -> bool {
    let parsed: Option<Vec<DateTime<Utc>>> =
        items.iter().map(|item| item.created_at.parse()).collect();
    let Some(times) = parsed else {
        return false;
    };

    times.windows(2).all(|pair| pair[0] <= pair[1])
        && times.first().zip(times.last()).is_some_and(|(first, last)| first < last)
}
