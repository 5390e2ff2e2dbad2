use metrics_exporter_prometheus::PrometheusBuilder;
use recipe_suggester::{
    config::AppConfig,
    db::{self, store::PgStore},
    jobs::TaskRunner,
    routes::metrics::describe_metrics,
    services::{
        ingredient_detector::HttpDetectionClient, queue::RedisQueue,
        recipe_generator::OpenAiRecipeClient,
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting recipe job worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");
    let redis_url = config
        .redis_url
        .as_deref()
        .expect("REDIS_URL must be set for the worker");

    // Job and engine metrics are recorded here, not in the API process
    let metrics_addr: SocketAddr = config
        .worker_metrics_addr
        .parse()
        .expect("WORKER_METRICS_ADDR must be a socket address");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus metrics exporter");
    describe_metrics();
    tracing::info!(addr = %metrics_addr, "Serving worker metrics");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    let store = Arc::new(PgStore::new(db_pool));

    tracing::info!("Initializing engine clients");
    let detector = HttpDetectionClient::new(&config.detection_url, config.detection_timeout())
        .expect("Failed to initialize detection client");
    let generator = OpenAiRecipeClient::new(
        &config.llm_api_url,
        &config.llm_api_key,
        &config.llm_model,
        config.llm_timeout(),
    )
    .expect("Failed to initialize LLM client");

    let queue = Arc::new(RedisQueue::new(redis_url).expect("Failed to initialize job queue"));
    let runner = TaskRunner::new(
        store.clone(),
        store,
        Arc::new(detector),
        Arc::new(generator),
        &config.upload_dir,
    );
    let permits = Arc::new(Semaphore::new(config.worker_concurrency.max(1)));

    match queue.queue_depth().await {
        Ok(depth) => tracing::info!(pending = depth, "Worker ready, starting job processing loop"),
        Err(e) => tracing::warn!(error = %e, "Worker ready, queue depth unavailable"),
    }

    loop {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        match queue.dequeue().await {
            Ok(Some(item)) => {
                tracing::info!(job_id = item.job_id, kind = item.kind.as_str(), "Processing job");
                let runner = runner.clone();
                let queue = queue.clone();
                tokio::spawn(async move {
                    runner.run_guarded(item.clone()).await;
                    if let Err(e) = queue.complete(&item).await {
                        tracing::error!(job_id = item.job_id, error = %e, "Failed to remove job from processing list");
                    }
                    drop(permit);
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Error dequeuing job, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}
