use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use recipe_suggester::app_state::AppState;
use recipe_suggester::auth::TokenVerifier;
use recipe_suggester::config::AppConfig;
use recipe_suggester::db::{self, store::PgStore};
use recipe_suggester::jobs::TaskRunner;
use recipe_suggester::routes;
use recipe_suggester::services::{
    executor::{LocalExecutor, TaskSubmitter},
    ingredient_detector::HttpDetectionClient,
    queue::RedisQueue,
    recipe_generator::OpenAiRecipeClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing recipe-suggester server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");
    let store = Arc::new(PgStore::new(db_pool));

    let submitter: Arc<dyn TaskSubmitter> = match config.redis_url.as_deref() {
        Some(redis_url) => {
            tracing::info!("Connecting to Redis job queue; jobs run in the worker process");
            Arc::new(RedisQueue::new(redis_url).expect("Failed to initialize job queue"))
        }
        None => {
            tracing::info!(
                concurrency = config.worker_concurrency,
                "No REDIS_URL set; jobs run in-process"
            );
            let detector = HttpDetectionClient::new(&config.detection_url, config.detection_timeout())
                .expect("Failed to initialize detection client");
            let generator = OpenAiRecipeClient::new(
                &config.llm_api_url,
                &config.llm_api_key,
                &config.llm_model,
                config.llm_timeout(),
            )
            .expect("Failed to initialize LLM client");

            let runner = TaskRunner::new(
                store.clone(),
                store.clone(),
                Arc::new(detector),
                Arc::new(generator),
                &config.upload_dir,
            );
            Arc::new(LocalExecutor::start(runner, config.worker_concurrency))
        }
    };

    let state = AppState::new(
        store.clone(),
        store,
        submitter,
        TokenVerifier::new(&config.jwt_secret),
    );

    let app = routes::api_router(state)
        .merge(
            Router::new()
                .route("/metrics", get(routes::metrics::prometheus_metrics))
                .with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
