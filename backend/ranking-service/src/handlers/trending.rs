/// Trending API Handlers
use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RankingState;
use crate::error::{DataQualityIssue, Result};
use crate::models::{Algorithm, ContentItem, RankedItem};
use crate::services::trending::{trending_posts, trending_topics, TrendingTopic};
use crate::services::Timeframe;

/// Query parameters for GET /posts/trending
#[derive(Debug, Deserialize)]
pub struct TrendingPostsQuery {
    /// hour, day, week or month (default: day)
    #[serde(default)]
    pub timeframe: Timeframe,

    #[serde(default = "default_posts_limit")]
    pub limit: usize,
}

/// Query parameters for GET /trending/topics
#[derive(Debug, Deserialize)]
pub struct TrendingTopicsQuery {
    #[serde(default)]
    pub timeframe: Timeframe,

    #[serde(default = "default_topics_limit")]
    pub limit: usize,
}

fn default_posts_limit() -> usize {
    10
}

fn default_topics_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPostsResponse {
    pub posts: Vec<RankedItem<ContentItem>>,
    pub timeframe: Timeframe,
    pub algorithm: Algorithm,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_quality_warnings: Vec<DataQualityIssue>,
}

#[derive(Debug, Serialize)]
pub struct TrendingTopicsResponse {
    pub trending: Vec<TrendingTopic>,
    pub timeframe: Timeframe,
}

/// GET /posts/trending
#[get("/posts/trending")]
pub async fn get_trending_posts(
    query: web::Query<TrendingPostsQuery>,
    state: web::Data<RankingState>,
) -> Result<HttpResponse> {
    let limit = state.limits.clamp(query.limit);
    let now = Utc::now();

    let posts = state
        .fetch(
            "posts_since",
            state.store.posts_since(now - query.timeframe.duration()),
        )
        .await?;
    let result = trending_posts(&posts, query.timeframe, limit, now);

    debug!(
        timeframe = query.timeframe.as_str(),
        candidates = posts.len(),
        count = result.len(),
        "Trending posts served"
    );

    Ok(HttpResponse::Ok().json(TrendingPostsResponse {
        timeframe: query.timeframe,
        algorithm: result.algorithm,
        data_quality_warnings: result.issues,
        posts: result.items,
    }))
}

/// GET /trending/topics
#[get("/trending/topics")]
pub async fn get_trending_topics(
    query: web::Query<TrendingTopicsQuery>,
    state: web::Data<RankingState>,
) -> Result<HttpResponse> {
    let limit = state.limits.clamp(query.limit);
    let now = Utc::now();

    let posts = state
        .fetch(
            "posts_since",
            state.store.posts_since(now - query.timeframe.duration()),
        )
        .await?;
    let trending = trending_topics(&posts, query.timeframe, limit, now);

    Ok(HttpResponse::Ok().json(TrendingTopicsResponse {
        trending,
        timeframe: query.timeframe,
    }))
}
