/// Recommendation API Handlers
///
/// Content recommendations and community discovery
use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use super::RankingState;
use crate::error::{AppError, DataQualityIssue, Result};
use crate::models::{CommunityStats, ContentItem, RankedItem};
use crate::services::discovery;
use crate::services::profile_builder::upvoted_item_ids;
use crate::services::recommendation::{recommend_posts, trending_for_new_user};
use crate::services::{RecommendationReason, SimilaritySignals};

const BASED_ON_TAGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    #[default]
    Posts,
    Communities,
    Users,
}

/// Query parameters for GET /recommendations
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationQuery {
    pub user_id: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: RecommendationType,

    #[serde(default = "default_recommendation_limit")]
    pub limit: usize,
}

/// Query parameters for GET /communities/discover
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverQuery {
    pub user_id: Option<String>,

    #[serde(default = "default_discover_limit")]
    pub limit: usize,
}

fn default_recommendation_limit() -> usize {
    10
}

fn default_discover_limit() -> usize {
    5
}

/// What the content recommendations were derived from
#[derive(Debug, Serialize)]
pub struct BasedOn {
    pub tags: Vec<String>,
    pub communities: Vec<String>,
}

impl From<&SimilaritySignals> for BasedOn {
    fn from(signals: &SimilaritySignals) -> Self {
        Self {
            tags: signals.tags().iter().take(BASED_ON_TAGS).cloned().collect(),
            communities: signals.communities().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecommendationsResponse {
    pub posts: Vec<RankedItem<ContentItem>>,
    pub reason: RecommendationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub based_on: Option<BasedOn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_quality_warnings: Vec<DataQualityIssue>,
}

#[derive(Debug, Serialize)]
pub struct TypedRecommendationsResponse {
    pub recommendations: Vec<RankedItem<CommunityStats>>,
    #[serde(rename = "type")]
    pub kind: RecommendationType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub communities: Vec<RankedItem<CommunityStats>>,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_quality_warnings: Vec<DataQualityIssue>,
}

/// GET /recommendations
///
/// `type=posts` (default): posts similar to what the user upvoted, or the
/// top posts for a user with no upvotes. `type=communities`: largest
/// communities the user has not joined. `type=users` has no recommender and
/// returns an empty list.
#[get("/recommendations")]
pub async fn get_recommendations(
    query: web::Query<RecommendationQuery>,
    state: web::Data<RankingState>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("userId required".to_string()))?;
    let limit = state.limits.clamp(query.limit);

    debug!(user_id = %user_id, kind = ?query.kind, limit, "Recommendation request");

    match query.kind {
        RecommendationType::Posts => post_recommendations(&state, &user_id, limit).await,
        RecommendationType::Communities => {
            let (joined, communities) = futures::try_join!(
                state.fetch("joined_communities", state.store.joined_communities(&user_id)),
                state.fetch(
                    "communities",
                    state.store.communities(state.limits.community_scan)
                ),
            )?;
            let joined: HashSet<String> = joined.into_iter().collect();
            let result = discovery::recommend_communities(&communities, &joined, limit);

            Ok(HttpResponse::Ok().json(TypedRecommendationsResponse {
                recommendations: result.items,
                kind: RecommendationType::Communities,
            }))
        }
        RecommendationType::Users => Ok(HttpResponse::Ok().json(TypedRecommendationsResponse {
            recommendations: Vec::new(),
            kind: RecommendationType::Users,
        })),
    }
}

async fn post_recommendations(
    state: &RankingState,
    user_id: &str,
    limit: usize,
) -> Result<HttpResponse> {
    let limits = &state.limits;
    let interactions = state
        .fetch(
            "user_interactions",
            state.store.user_interactions(user_id, limits.upvote_history),
        )
        .await?;
    let upvoted = upvoted_item_ids(&interactions);

    if upvoted.is_empty() {
        let candidates = state
            .fetch(
                "active_posts",
                state.store.active_posts(limits.similarity_candidates),
            )
            .await?;
        let result = trending_for_new_user(&candidates, limit, Utc::now());

        info!(user_id, count = result.len(), "Cold-start recommendations served");

        return Ok(HttpResponse::Ok().json(PostRecommendationsResponse {
            reason: RecommendationReason::TrendingForNewUser,
            based_on: None,
            data_quality_warnings: result.issues,
            posts: result.items,
        }));
    }

    let profile_ids: Vec<String> = upvoted
        .iter()
        .take(limits.upvoted_profile_posts)
        .cloned()
        .collect();
    let (upvoted_posts, candidates) = futures::try_join!(
        state.fetch("posts_by_ids", state.store.posts_by_ids(&profile_ids)),
        state.fetch(
            "active_posts",
            state.store.active_posts(limits.similarity_candidates)
        ),
    )?;

    let signals = SimilaritySignals::from_upvoted(&upvoted_posts);
    let upvoted: HashSet<String> = upvoted.into_iter().collect();
    let result = recommend_posts(&candidates, &upvoted, &signals, limit, Utc::now());

    info!(
        user_id,
        upvoted = upvoted.len(),
        count = result.len(),
        "Content recommendations served"
    );

    Ok(HttpResponse::Ok().json(PostRecommendationsResponse {
        reason: RecommendationReason::Personalized,
        based_on: Some(BasedOn::from(&signals)),
        data_quality_warnings: result.issues,
        posts: result.items,
    }))
}

/// GET /communities/discover
#[get("/communities/discover")]
pub async fn discover_communities(
    query: web::Query<DiscoverQuery>,
    state: web::Data<RankingState>,
) -> Result<HttpResponse> {
    let limit = state.limits.clamp(query.limit);
    let scan = state.limits.community_scan;

    let (joined, communities) = match query.user_id.as_deref().filter(|id| !id.is_empty()) {
        Some(user_id) => futures::try_join!(
            state.fetch("joined_communities", state.store.joined_communities(user_id)),
            state.fetch("communities", state.store.communities(scan)),
        )?,
        None => (
            Vec::new(),
            state
                .fetch("communities", state.store.communities(scan))
                .await?,
        ),
    };
    let joined: HashSet<String> = joined.into_iter().collect();
    let result = discovery::discover_communities(&communities, &joined, limit, Utc::now());

    Ok(HttpResponse::Ok().json(DiscoverResponse {
        communities: result.items,
        message: "discover new communities",
        data_quality_warnings: result.issues,
    }))
}
