/// HTTP boundary
///
/// Handlers gather candidate batches from the store (concurrently where
/// independent, each under the store timeout), then hand them to the ranking
/// services with a single `now`.
use actix_web::{get, web, HttpResponse};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RankingLimits;
use crate::error::Result;
use crate::services::RankingPipeline;
use crate::store::{ContentStore, StoreResult};
use crate::utils::with_timeout;

pub mod feed;
pub mod recommendation;
pub mod trending;

pub use feed::{get_community_posts, get_personalized_feed};
pub use recommendation::{discover_communities, get_recommendations};
pub use trending::{get_trending_posts, get_trending_topics};

/// Shared handler state
pub struct RankingState {
    pub store: Arc<dyn ContentStore>,
    pub pipeline: RankingPipeline,
    pub limits: RankingLimits,
    pub store_timeout: Duration,
}

impl RankingState {
    pub fn new(store: Arc<dyn ContentStore>, limits: RankingLimits, store_timeout: Duration) -> Self {
        Self {
            store,
            pipeline: RankingPipeline::new(),
            limits,
            store_timeout,
        }
    }

    /// Run one store call under the configured timeout.
    pub(crate) async fn fetch<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        Ok(with_timeout(operation, self.store_timeout, future).await??)
    }
}

/// GET /health
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Register every route on an `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(discover_communities)
        .service(get_community_posts)
        .service(get_trending_posts)
        .service(get_personalized_feed)
        .service(get_recommendations)
        .service(get_trending_topics);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentItem;
    use crate::store::{InMemoryStore, MockContentStore, StoreError};
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;

    fn app_state(store: Arc<dyn ContentStore>, timeout: Duration) -> web::Data<RankingState> {
        web::Data::new(RankingState::new(store, RankingLimits::default(), timeout))
    }

    #[actix_web::test]
    async fn test_health() {
        let state = app_state(Arc::new(InMemoryStore::new()), Duration::from_secs(1));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "OK");
    }

    #[actix_web::test]
    async fn test_store_unavailable_returns_503() {
        let mut store = MockContentStore::new();
        store
            .expect_active_posts()
            .returning(|_| Err(StoreError::Unavailable("scan throttled".to_string())));

        let state = app_state(Arc::new(store), Duration::from_secs(1));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/feed/personalized").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 503);
    }

    #[actix_web::test]
    async fn test_corrupt_store_returns_500() {
        let mut store = MockContentStore::new();
        store
            .expect_communities()
            .returning(|_| Err(StoreError::Corrupt("memberCount is not a number".to_string())));

        let state = app_state(Arc::new(store), Duration::from_secs(1));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/communities/discover").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_personalized_uses_configured_fetch_sizes() {
        let mut store = MockContentStore::new();
        store
            .expect_user_interactions()
            .withf(|_, limit| *limit == 500)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_joined_communities()
            .times(1)
            .returning(|_| Ok(vec!["rust".to_string()]));
        store.expect_active_posts().withf(|limit| *limit == 200).returning(|_| {
            Ok(vec![ContentItem::new("p1", "rust", Utc::now())])
        });

        let state = app_state(Arc::new(store), Duration::from_secs(1));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/feed/personalized?userId=u1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["algorithm"], "collaborative_filtering_with_hot_ranking");
        assert!(body.get("reason").is_none());
    }
}
