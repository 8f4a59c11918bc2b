/// Feed API Handlers
///
/// Community listings and the personalized home feed
use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use super::RankingState;
use crate::error::{AppError, DataQualityIssue, FallbackReason, Result};
use crate::models::{Algorithm, ContentItem, RankedItem};
use crate::services::profile_builder::{seen_item_ids, ProfileBuilder};
use crate::services::{PersonalizationContext, SortMode};

/// Query parameters for GET /communities/{name}/posts
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPostsQuery {
    /// new, hot, top or controversial (default: new)
    #[serde(default = "default_sort")]
    pub sort: String,

    #[serde(default = "default_page_limit")]
    pub limit: usize,

    /// Cursor returned by the previous page
    pub last_key: Option<String>,
}

/// Query parameters for GET /feed/personalized
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedFeedQuery {
    pub user_id: Option<String>,

    #[serde(default = "default_page_limit")]
    pub limit: usize,
}

fn default_sort() -> String {
    "new".to_string()
}

fn default_page_limit() -> usize {
    25
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPostsResponse {
    pub posts: Vec<RankedItem<ContentItem>>,
    pub last_key: Option<String>,
    pub algorithm: Algorithm,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_quality_warnings: Vec<DataQualityIssue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedFeedResponse {
    pub posts: Vec<RankedItem<ContentItem>>,
    pub count: usize,
    pub algorithm: Algorithm,
    /// Present only when the feed fell back to Hot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_quality_warnings: Vec<DataQualityIssue>,
}

fn community_sort(raw: &str) -> Result<SortMode> {
    match raw.parse::<SortMode>() {
        Ok(mode @ (SortMode::New | SortMode::Hot | SortMode::Top | SortMode::Controversial)) => {
            Ok(mode)
        }
        Ok(_) => Err(AppError::BadRequest(format!(
            "sort {raw} is not available for community listings"
        ))),
        Err(msg) => Err(AppError::BadRequest(msg)),
    }
}

/// GET /communities/{name}/posts
///
/// One store page of a community, re-ordered by the requested sort.
#[get("/communities/{name}/posts")]
pub async fn get_community_posts(
    path: web::Path<String>,
    query: web::Query<CommunityPostsQuery>,
    state: web::Data<RankingState>,
) -> Result<HttpResponse> {
    let community = path.into_inner();
    let query = query.into_inner();
    let mode = community_sort(&query.sort)?;
    let limit = state.limits.clamp(query.limit);

    debug!(
        community = %community,
        sort = %query.sort,
        limit,
        "Community posts request"
    );

    let page = state
        .fetch(
            "community_posts",
            state.store.community_posts(&community, limit, query.last_key),
        )
        .await?;

    let result = state.pipeline.rank(
        &page.items,
        mode,
        limit,
        Utc::now(),
        &PersonalizationContext::anonymous(),
    );

    Ok(HttpResponse::Ok().json(CommunityPostsResponse {
        algorithm: result.algorithm,
        data_quality_warnings: result.issues,
        posts: result.items,
        last_key: page.last_key,
    }))
}

/// GET /feed/personalized
///
/// Interest-weighted feed for `userId`. A user with no interaction history
/// still gets the joined-community boost. Without a user the feed is
/// Hot-ranked and `reason` says why.
#[get("/feed/personalized")]
pub async fn get_personalized_feed(
    query: web::Query<PersonalizedFeedQuery>,
    state: web::Data<RankingState>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let limit = state.limits.clamp(query.limit);
    let user_id = query.user_id.filter(|id| !id.is_empty());
    let candidates_limit = state.limits.personalized_candidates;

    let (context, candidates) = match user_id {
        None => {
            let candidates = state
                .fetch("active_posts", state.store.active_posts(candidates_limit))
                .await?;
            (PersonalizationContext::anonymous(), candidates)
        }
        Some(user_id) => {
            let (interactions, joined, candidates) = futures::try_join!(
                state.fetch(
                    "user_interactions",
                    state
                        .store
                        .user_interactions(&user_id, state.limits.interaction_history),
                ),
                state.fetch("joined_communities", state.store.joined_communities(&user_id)),
                state.fetch("active_posts", state.store.active_posts(candidates_limit)),
            )?;
            let joined: HashSet<String> = joined.into_iter().collect();

            // An empty history still personalizes: joined communities carry a
            // floor weight of 1.
            let context = PersonalizationContext::complete(
                user_id,
                ProfileBuilder::build(&interactions),
                joined,
                seen_item_ids(&interactions),
            );
            (context, candidates)
        }
    };

    let result = state.pipeline.rank(
        &candidates,
        SortMode::Personalized,
        limit,
        Utc::now(),
        &context,
    );

    info!(
        user_id = context.viewer.as_deref().unwrap_or("anonymous"),
        algorithm = result.algorithm.as_str(),
        count = result.len(),
        "Personalized feed served"
    );

    Ok(HttpResponse::Ok().json(PersonalizedFeedResponse {
        count: result.len(),
        algorithm: result.algorithm,
        reason: result.fallback,
        data_quality_warnings: result.issues,
        posts: result.items,
    }))
}
