// Community discovery: suggest communities the viewer has not joined yet.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{Algorithm, CommunityStats, RankedResult};
use crate::services::ranking::rank_scored;
use crate::services::scoring;

/// Rank unjoined communities by activity, boosting ones younger than a month.
pub fn discover_communities(
    communities: &[CommunityStats],
    joined: &HashSet<String>,
    limit: usize,
    now: DateTime<Utc>,
) -> RankedResult<CommunityStats> {
    let mut issues = Vec::new();

    let scored = communities
        .iter()
        .filter(|community| !joined.contains(&community.name))
        .map(|community| {
            let age = scoring::age_hours(&community.name, &community.created_at, now);
            if let Some(issue) = age.issue {
                issues.push(issue);
            }
            (
                community.clone(),
                scoring::community_discovery(community, age.hours),
            )
        })
        .collect();

    let items = rank_scored(scored, limit);

    for issue in &issues {
        warn!(issue = %issue, "Data quality issue while scoring communities");
    }
    debug!(
        candidates = communities.len(),
        joined = joined.len(),
        output_count = items.len(),
        "Community discovery completed"
    );

    RankedResult {
        items,
        algorithm: Algorithm::CommunityDiscovery,
        fallback: None,
        issues,
    }
}

/// Largest unjoined communities first.
pub fn recommend_communities(
    communities: &[CommunityStats],
    joined: &HashSet<String>,
    limit: usize,
) -> RankedResult<CommunityStats> {
    let scored = communities
        .iter()
        .filter(|community| !joined.contains(&community.name))
        .map(|community| (community.clone(), community.member_count as f64))
        .collect();

    RankedResult {
        items: rank_scored(scored, limit),
        algorithm: Algorithm::MemberCount,
        fallback: None,
        issues: Vec::new(),
    }
}
