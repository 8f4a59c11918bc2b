use actix_web::{web, App, HttpServer};
use buchat_ranking::handlers::{self, RankingState};
use buchat_ranking::store::{ContentStore, InMemoryStore};
use buchat_ranking::Config;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration (also reads .env)
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},actix_web=info", config.app.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    tracing::info!(
        "Starting buchat-ranking-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Environment: {}", config.app.env);

    let store = match &config.store.seed_path {
        Some(path) => match InMemoryStore::load_seed_file(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Seed loading failed: {:#}", e);
                eprintln!("ERROR: Failed to load seed {}: {:#}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("SEED_PATH not set - starting with an empty store");
            InMemoryStore::new()
        }
    };
    let store: Arc<dyn ContentStore> = Arc::new(store);

    let state = web::Data::new(RankingState::new(
        store,
        config.limits.clone(),
        config.store.timeout(),
    ));

    tracing::info!(
        port = config.app.port,
        store_timeout_ms = config.store.timeout_ms,
        max_limit = config.limits.max_limit,
        "HTTP server listening"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(format!("0.0.0.0:{}", config.app.port))?
    .run()
    .await
}
