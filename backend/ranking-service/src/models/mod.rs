use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DataQualityIssue, FallbackReason};

/// Creation timestamp exactly as the store hands it over.
///
/// Parsing is deferred to scoring time so that a single malformed row degrades
/// to a data-quality warning instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatedAt(String);

impl CreatedAt {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// RFC 3339 first, then a naive ISO-8601 timestamp interpreted as UTC.
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .map(|at| at.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&self.0, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
    }
}

impl From<DateTime<Utc>> for CreatedAt {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Deleted,
    /// Missing or unrecognised status; never ranked.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A post snapshot as supplied by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(alias = "id")]
    pub post_id: String,
    pub community: String,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Net votes (upvotes - downvotes), maintained by the store. May be negative.
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub downvotes: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub share_count: u64,
    pub created_at: CreatedAt,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl ContentItem {
    /// Active item with zeroed counters.
    pub fn new(
        post_id: impl Into<String>,
        community: impl Into<String>,
        created_at: impl Into<CreatedAt>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            community: community.into(),
            author_id: None,
            title: String::new(),
            score: 0,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            view_count: 0,
            share_count: 0,
            created_at: created_at.into(),
            tags: Vec::new(),
            status: ItemStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Vote,
    Comment,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// One historical action of a user on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub user_id: String,
    pub post_id: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_type: Option<VoteDirection>,
}

impl InteractionRecord {
    pub fn is_upvote(&self) -> bool {
        self.kind == InteractionKind::Vote && self.vote_type == Some(VoteDirection::Up)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub post_count: u64,
    pub created_at: CreatedAt,
}

/// Per-request interest weights keyed by interest: a community name or a
/// tag. Both share one keyspace, so a tag `rust` and the community `rust`
/// count toward the same weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterestProfile {
    weights: BTreeMap<String, u64>,
}

impl InterestProfile {
    pub(crate) fn from_weights(weights: BTreeMap<String, u64>) -> Self {
        Self { weights }
    }

    /// Number of interactions referencing `key`, 0 when unknown.
    pub fn weight(&self, key: &str) -> u64 {
        self.weights.get(key).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Which scoring path produced a result. Echoed to clients as `algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    New,
    Hot,
    Top,
    Controversial,
    Trending,
    CollaborativeFilteringWithHotRanking,
    ContentSimilarity,
    CommunityDiscovery,
    MemberCount,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::New => "new",
            Algorithm::Hot => "hot",
            Algorithm::Top => "top",
            Algorithm::Controversial => "controversial",
            Algorithm::Trending => "trending",
            Algorithm::CollaborativeFilteringWithHotRanking => {
                "collaborative_filtering_with_hot_ranking"
            }
            Algorithm::ContentSimilarity => "content_similarity",
            Algorithm::CommunityDiscovery => "community_discovery",
            Algorithm::MemberCount => "member_count",
        }
    }
}

/// An item paired with the score it was ranked by. Serialises as the item's
/// own fields plus `rankScore`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f64>,
}

/// Ordered output of one ranking call.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult<T = ContentItem> {
    pub items: Vec<RankedItem<T>>,
    pub algorithm: Algorithm,
    /// Set when the requested mode could not run and a documented fallback did.
    pub fallback: Option<FallbackReason>,
    pub issues: Vec<DataQualityIssue>,
}

impl<T> RankedResult<T> {
    pub fn empty(algorithm: Algorithm) -> Self {
        Self {
            items: Vec::new(),
            algorithm,
            fallback: None,
            issues: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn scores(&self) -> Vec<Option<f64>> {
        self.items.iter().map(|ranked| ranked.rank_score).collect()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items.into_iter().map(|ranked| ranked.item).collect()
    }
}

/// One page of a partitioned store query. `last_key` is opaque to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub last_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_created_at_parses_rfc3339_and_naive() {
        let with_offset = CreatedAt::new("2024-05-01T12:00:00.000Z");
        let naive = CreatedAt::new("2024-05-01T12:00:00");
        assert_eq!(with_offset.parse(), naive.parse());
        assert!(with_offset.parse().is_some());

        assert!(CreatedAt::new("yesterday-ish").parse().is_none());
        assert!(CreatedAt::new("").parse().is_none());
    }

    #[test]
    fn test_created_at_round_trips_datetime() {
        let now = Utc::now() - Duration::minutes(5);
        let parsed = CreatedAt::from_datetime(now).parse().unwrap();
        assert!((parsed - now).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn test_content_item_deserializes_store_json() {
        let json = r#"{
            "postId": "p1",
            "community": "rust",
            "userId": "alice",
            "title": "hello",
            "score": -3,
            "upvotes": 2,
            "downvotes": 5,
            "commentCount": 4,
            "createdAt": "2024-05-01T12:00:00.000Z",
            "tags": ["async"],
            "status": "active"
        }"#;

        let item: ContentItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.post_id, "p1");
        assert_eq!(item.author_id.as_deref(), Some("alice"));
        assert_eq!(item.score, -3);
        assert_eq!(item.view_count, 0);
        assert!(item.is_active());
    }

    #[test]
    fn test_unknown_or_missing_status_is_not_active() {
        let odd: ContentItem = serde_json::from_str(
            r#"{"postId":"p","community":"c","createdAt":"x","status":"archived"}"#,
        )
        .unwrap();
        assert_eq!(odd.status, ItemStatus::Unknown);

        let missing: ContentItem =
            serde_json::from_str(r#"{"postId":"p","community":"c","createdAt":"x"}"#).unwrap();
        assert!(!missing.is_active());
    }

    #[test]
    fn test_ranked_item_flattens_fields() {
        let item = ContentItem::new("p1", "rust", Utc::now());
        let ranked = RankedItem {
            item,
            rank_score: Some(1.5),
        };
        let value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(value["postId"], "p1");
        assert_eq!(value["rankScore"], 1.5);

        let unscored = RankedItem {
            item: ContentItem::new("p2", "rust", Utc::now()),
            rank_score: None,
        };
        let value = serde_json::to_value(&unscored).unwrap();
        assert!(value.get("rankScore").is_none());
    }

    #[test]
    fn test_interaction_upvote_detection() {
        let record: InteractionRecord = serde_json::from_str(
            r#"{"userId":"u","postId":"p","type":"vote","voteType":"up"}"#,
        )
        .unwrap();
        assert!(record.is_upvote());

        let view: InteractionRecord =
            serde_json::from_str(r#"{"userId":"u","postId":"p","type":"view"}"#).unwrap();
        assert!(!view.is_upvote());
    }
}
