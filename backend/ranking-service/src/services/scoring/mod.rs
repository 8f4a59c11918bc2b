// ============================================
// Score Functions
// ============================================
//
// Every ranking formula used by the feed lives here and nowhere else.
// All functions are pure; callers compute `now` once per ranking call so
// that relative order is deterministic within that call.
//
//   Hot            = score / (age_h + 2)^1.5
//   Top            = score
//   Controversial  = min(up, down) * (up + down)
//   Trending       = (score + comments*2 + views*0.1) / (age_h + 2)^1.5
//   Personalized   = community(40) + tags(<=30) + engagement(<=20) + recency(<=10), x0.5 if seen
//   Discovery      = posts*2 + members + 10 if younger than a month
//   Similarity     = 3*shared_tags + 5 if community known + ln(1 + score) + 2 if < 24h

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::error::DataQualityIssue;
use crate::models::{CommunityStats, ContentItem, CreatedAt, InterestProfile};
use crate::services::profile_builder::SimilaritySignals;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Offset added to the age so brand-new items do not divide by ~0.
pub const DECAY_OFFSET_HOURS: f64 = 2.0;
/// Exponent of the age penalty shared by Hot and Trending.
pub const DECAY_GRAVITY: f64 = 1.5;

pub const COMMUNITY_INTEREST_WEIGHT: f64 = 40.0;
pub const TAG_INTEREST_CAP: f64 = 30.0;
pub const ENGAGEMENT_CAP: f64 = 20.0;
pub const RECENCY_CAP: f64 = 10.0;
pub const SEEN_PENALTY: f64 = 0.5;

pub const NEW_COMMUNITY_BOOST: f64 = 10.0;
pub const NEW_COMMUNITY_MAX_AGE_HOURS: f64 = 30.0 * 24.0;

pub const SIMILAR_TAG_WEIGHT: f64 = 3.0;
pub const SIMILAR_COMMUNITY_BONUS: f64 = 5.0;
pub const FRESH_BONUS: f64 = 2.0;
pub const FRESH_MAX_AGE_HOURS: f64 = 24.0;

/// Age of an item relative to `now`, plus the data-quality issue that forced a
/// substitute value, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Age {
    pub hours: f64,
    pub issue: Option<DataQualityIssue>,
}

/// Age in fractional hours. Unparsable and future-dated timestamps count as
/// brand new (0h) and report why.
pub fn age_hours(id: &str, created_at: &CreatedAt, now: DateTime<Utc>) -> Age {
    match created_at.parse() {
        None => Age {
            hours: 0.0,
            issue: Some(DataQualityIssue::MalformedTimestamp {
                id: id.to_string(),
                raw: created_at.as_str().to_string(),
            }),
        },
        Some(at) if at > now => Age {
            hours: 0.0,
            issue: Some(DataQualityIssue::FutureTimestamp {
                id: id.to_string(),
                raw: created_at.as_str().to_string(),
            }),
        },
        Some(at) => Age {
            hours: (now - at).num_milliseconds() as f64 / MILLIS_PER_HOUR,
            issue: None,
        },
    }
}

fn time_decay(age_hours: f64) -> f64 {
    (age_hours.max(0.0) + DECAY_OFFSET_HOURS).powf(DECAY_GRAVITY)
}

/// Time-decayed popularity. Negative net scores stay negative and decay
/// toward zero from below, so older downvoted items rank above newer ones.
pub fn hot(net_score: i64, age_hours: f64) -> f64 {
    net_score as f64 / time_decay(age_hours)
}

pub fn top(item: &ContentItem) -> f64 {
    item.score as f64
}

/// Zero whenever one side has no votes.
pub fn controversial(upvotes: u64, downvotes: u64) -> f64 {
    upvotes.min(downvotes) as f64 * (upvotes + downvotes) as f64
}

pub fn trending(item: &ContentItem, age_hours: f64) -> f64 {
    let activity =
        item.score as f64 + item.comment_count as f64 * 2.0 + item.view_count as f64 * 0.1;
    activity / time_decay(age_hours)
}

/// What the personalized score needs to know about the viewer.
#[derive(Debug, Clone, Copy)]
pub struct PersonalSignals<'a> {
    pub profile: &'a InterestProfile,
    pub joined: &'a HashSet<String>,
    pub seen: &'a HashSet<String>,
}

pub fn personalized(item: &ContentItem, age_hours: f64, signals: PersonalSignals<'_>) -> f64 {
    let mut score = 0.0;

    if signals.joined.contains(&item.community) {
        // Joined but never interacted with still counts once.
        let weight = signals.profile.weight(&item.community).max(1);
        score += COMMUNITY_INTEREST_WEIGHT * weight as f64 / 10.0;
    }

    let tag_weight: u64 = item
        .tags
        .iter()
        .map(|tag| signals.profile.weight(tag))
        .sum();
    score += (tag_weight as f64).min(TAG_INTEREST_CAP);

    let engagement = item.upvotes as f64 * 2.0 + item.comment_count as f64 * 3.0
        - item.downvotes as f64;
    score += (engagement / 10.0).min(ENGAGEMENT_CAP);

    score += (RECENCY_CAP - age_hours / 24.0).max(0.0);

    if signals.seen.contains(&item.post_id) {
        score *= SEEN_PENALTY;
    }

    score
}

/// Sort key of the personalized feed. The interest sum (tens) and Hot
/// (fractions) are added without normalisation, so Hot mostly breaks ties.
pub fn personalized_hot(item: &ContentItem, age_hours: f64, signals: PersonalSignals<'_>) -> f64 {
    personalized(item, age_hours, signals) + hot(item.score, age_hours)
}

pub fn community_discovery(community: &CommunityStats, age_hours: f64) -> f64 {
    let activity = community.post_count as f64 * 2.0 + community.member_count as f64;
    if age_hours < NEW_COMMUNITY_MAX_AGE_HOURS {
        activity + NEW_COMMUNITY_BOOST
    } else {
        activity
    }
}

/// Content-based similarity between a post and what the viewer upvoted.
pub fn similarity(item: &ContentItem, age_hours: f64, signals: &SimilaritySignals) -> f64 {
    let shared_tags = item
        .tags
        .iter()
        .filter(|tag| signals.has_tag(tag))
        .count();

    let mut score = shared_tags as f64 * SIMILAR_TAG_WEIGHT;
    if signals.has_community(&item.community) {
        score += SIMILAR_COMMUNITY_BONUS;
    }
    if age_hours < FRESH_MAX_AGE_HOURS {
        score += FRESH_BONUS;
    }

    score + (item.score.max(0) as f64).ln_1p()
}

/// Net scores below -1 would make `ln(1 + score)` undefined.
pub fn negative_score_issue(item: &ContentItem) -> Option<DataQualityIssue> {
    (item.score < -1).then(|| DataQualityIssue::NegativeScoreClamped {
        id: item.post_id.clone(),
        score: item.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile_builder::ProfileBuilder;
    use crate::models::{InteractionKind, InteractionRecord};
    use chrono::Duration;

    fn item_aged(id: &str, now: DateTime<Utc>, hours: i64) -> ContentItem {
        ContentItem::new(id, "rust", now - Duration::hours(hours))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_age_hours_for_valid_timestamp() {
        let now = Utc::now();
        let item = item_aged("p1", now, 48);
        let age = age_hours(&item.post_id, &item.created_at, now);
        assert!(age.issue.is_none());
        assert_close(age.hours, 48.0);
    }

    #[test]
    fn test_age_hours_malformed_and_future_default_to_zero() {
        let now = Utc::now();

        let malformed = age_hours("p1", &CreatedAt::new("not a date"), now);
        assert_eq!(malformed.hours, 0.0);
        assert!(matches!(
            malformed.issue,
            Some(DataQualityIssue::MalformedTimestamp { .. })
        ));

        let future = age_hours("p2", &CreatedAt::from(now + Duration::hours(3)), now);
        assert_eq!(future.hours, 0.0);
        assert!(matches!(
            future.issue,
            Some(DataQualityIssue::FutureTimestamp { .. })
        ));
    }

    #[test]
    fn test_hot_matches_reference_values() {
        // 10 / 3^1.5 and 10 / 50^1.5
        assert_close(hot(10, 1.0), 1.9245);
        assert_close(hot(10, 48.0), 0.0283);
    }

    #[test]
    fn test_hot_is_monotonic_in_age_for_non_negative_scores() {
        for score in [0, 1, 10, 1000] {
            let mut previous = f64::INFINITY;
            for age in [0.0, 0.5, 1.0, 12.0, 48.0, 500.0] {
                let value = hot(score, age);
                assert!(value <= previous);
                previous = value;
            }
        }
    }

    #[test]
    fn test_hot_negative_scores_decay_toward_zero() {
        let fresh = hot(-10, 1.0);
        let stale = hot(-10, 48.0);
        assert!(fresh < 0.0 && stale < 0.0);
        // Sign inverts the ordering: the older downvoted item sits higher.
        assert!(stale > fresh);
    }

    #[test]
    fn test_controversial() {
        assert_eq!(controversial(50, 50), 5000.0);
        assert_eq!(controversial(90, 10), 1000.0);
        assert_eq!(controversial(0, 75), 0.0);
        assert_eq!(controversial(75, 0), 0.0);
    }

    #[test]
    fn test_trending_blends_activity() {
        let now = Utc::now();
        let mut item = item_aged("p1", now, 0);
        item.score = 10;
        item.comment_count = 5;
        item.view_count = 100;
        // (10 + 10 + 10) / 2^1.5
        assert_close(trending(&item, 0.0), 30.0 / 2f64.powf(1.5));
    }

    #[test]
    fn test_personalized_components_and_caps() {
        let now = Utc::now();
        let interactions: Vec<InteractionRecord> = (0..40)
            .map(|i| InteractionRecord {
                user_id: "u1".to_string(),
                post_id: format!("seen{i}"),
                kind: InteractionKind::View,
                community: Some("rust".to_string()),
                tags: vec!["async".to_string()],
                vote_type: None,
            })
            .collect();
        let profile = ProfileBuilder::build(&interactions);
        let joined: HashSet<String> = ["rust".to_string()].into_iter().collect();
        let seen = HashSet::new();
        let signals = PersonalSignals {
            profile: &profile,
            joined: &joined,
            seen: &seen,
        };

        let mut item = item_aged("p1", now, 0);
        item.tags = vec!["async".to_string()];
        item.upvotes = 500;
        // community 40*40/10 = 160, tags capped 30, engagement capped 20, recency 10
        assert_close(personalized(&item, 0.0, signals), 220.0);

        let mut stranger = item_aged("p2", now, 240);
        stranger.community = "golang".to_string();
        assert_close(personalized(&stranger, 240.0, signals), 0.0);
    }

    #[test]
    fn test_personalized_joined_without_history_counts_once() {
        let now = Utc::now();
        let profile = InterestProfile::default();
        let joined: HashSet<String> = ["rust".to_string()].into_iter().collect();
        let seen = HashSet::new();
        let signals = PersonalSignals {
            profile: &profile,
            joined: &joined,
            seen: &seen,
        };

        let item = item_aged("p1", now, 240);
        assert_close(personalized(&item, 240.0, signals), 4.0);
    }

    #[test]
    fn test_personalized_tag_matches_community_interest() {
        let now = Utc::now();
        let profile = ProfileBuilder::build(&[InteractionRecord {
            user_id: "u1".to_string(),
            post_id: "other".to_string(),
            kind: InteractionKind::Comment,
            community: Some("rust".to_string()),
            tags: Vec::new(),
            vote_type: None,
        }]);
        let empty = HashSet::new();
        let signals = PersonalSignals {
            profile: &profile,
            joined: &empty,
            seen: &empty,
        };

        let mut item = item_aged("p1", now, 300);
        item.community = "programming".to_string();
        item.tags = vec!["rust".to_string()];
        // Only the tag term applies: one interaction in community "rust".
        assert_close(personalized(&item, 300.0, signals), 1.0);
    }

    #[test]
    fn test_personalized_penalizes_seen_items() {
        let now = Utc::now();
        let profile = InterestProfile::default();
        let joined = HashSet::new();
        let seen: HashSet<String> = ["p1".to_string()].into_iter().collect();
        let unseen_set = HashSet::new();

        let item = item_aged("p1", now, 0);
        let seen_score = personalized(
            &item,
            0.0,
            PersonalSignals {
                profile: &profile,
                joined: &joined,
                seen: &seen,
            },
        );
        let fresh_score = personalized(
            &item,
            0.0,
            PersonalSignals {
                profile: &profile,
                joined: &joined,
                seen: &unseen_set,
            },
        );
        assert_close(seen_score, fresh_score * 0.5);
    }

    #[test]
    fn test_personalized_hot_adds_hot() {
        let now = Utc::now();
        let profile = InterestProfile::default();
        let empty = HashSet::new();
        let signals = PersonalSignals {
            profile: &profile,
            joined: &empty,
            seen: &empty,
        };
        let mut item = item_aged("p1", now, 1);
        item.score = 10;
        let blended = personalized_hot(&item, 1.0, signals);
        assert_close(blended, personalized(&item, 1.0, signals) + hot(10, 1.0));
    }

    #[test]
    fn test_community_discovery_new_boost_is_a_step() {
        let now = Utc::now();
        let community = CommunityStats {
            name: "rust".to_string(),
            description: None,
            member_count: 7,
            post_count: 3,
            created_at: CreatedAt::from(now),
        };
        assert_eq!(community_discovery(&community, 0.0), 23.0);
        assert_eq!(community_discovery(&community, 719.0), 23.0);
        assert_eq!(community_discovery(&community, 720.0), 13.0);
    }

    #[test]
    fn test_similarity_score() {
        let now = Utc::now();
        let signals = SimilaritySignals::new(
            vec!["async".to_string(), "tokio".to_string()],
            vec!["rust".to_string()],
        );

        let mut item = item_aged("p1", now, 2);
        item.tags = vec!["async".to_string(), "tokio".to_string(), "web".to_string()];
        item.score = 9;
        // 3*2 + 5 + 2 + ln(10)
        assert_close(similarity(&item, 2.0, &signals), 13.0 + 10f64.ln());

        let mut old = item_aged("p2", now, 100);
        old.community = "golang".to_string();
        old.score = -50;
        assert_close(similarity(&old, 100.0, &signals), 0.0);
        assert!(negative_score_issue(&old).is_some());
        assert!(negative_score_issue(&item).is_none());
    }
}
