mod helpers;

use helpers::*;
use std::sync::Arc;

use recipe_suggester::{
    config::AppConfig,
    db::{
        self,
        store::{JobStore, PgStore, RecipeStore},
        StoreError,
    },
    jobs::{orchestrator::JobOrchestrator, TaskRunner},
    models::job::{JobKind, JobStatus},
    services::executor::LocalExecutor,
};

async fn pg_store() -> Arc<PgStore> {
    let config = AppConfig::from_env().expect("Failed to load config");

    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    Arc::new(PgStore::new(db_pool))
}

/// Integration test: the full pipeline against PostgreSQL.
///
/// Engines are scripted; jobs run on the in-process executor. Requires a
/// running PostgreSQL configured via environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_pipeline_against_postgres() {
    let store = pg_store().await;
    let owner = format!("it-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());

    let runner = TaskRunner::new(
        store.clone(),
        store.clone(),
        Arc::new(ScriptedDetector::returning(fridge())),
        Arc::new(ScriptedGenerator::returning(sample_recipe("Integration Risotto"))),
        UPLOAD_DIR,
    );
    let executor = Arc::new(LocalExecutor::start(runner, 2));
    let orchestrator = JobOrchestrator::new(store.clone(), store.clone(), executor);

    let recipe = store.create(&owner, "Untitled").await.expect("Failed to create recipe");
    store
        .set_image(recipe.id, &owner, IMAGE)
        .await
        .expect("Failed to attach image");

    let detection = orchestrator
        .create_detection_job(recipe.id, &owner)
        .await
        .expect("Failed to create detection job");
    assert_eq!(detection.status, JobStatus::Running);

    let detection = wait_for_terminal(&orchestrator, JobKind::Detection, detection.id, &owner).await;
    assert_eq!(detection.status, JobStatus::Completed);
    assert!(detection.is_consistent());

    let generation = orchestrator
        .create_generation_job(recipe.id, &owner, strings(&["Rice", "Mushroom"]))
        .await
        .expect("Failed to create generation job");
    let generation = wait_for_terminal(&orchestrator, JobKind::Generation, generation.id, &owner).await;
    assert_eq!(generation.status, JobStatus::Completed);

    let renamed = store.find(recipe.id, &owner).await.unwrap().unwrap();
    assert_eq!(renamed.title, "Integration Risotto");

    // Terminal rows stay put.
    assert!(!store.fail(JobKind::Generation, generation.id).await.unwrap());

    assert!(store.delete(recipe.id, &owner).await.unwrap());
    assert!(store
        .find_by_id(JobKind::Detection, detection.id)
        .await
        .unwrap()
        .is_none());
}

/// The unique index on `recipe_id` backs the one-job-per-kind rule.
#[tokio::test]
#[ignore]
async fn test_duplicate_jobs_rejected_by_database() {
    let store = pg_store().await;
    let recipe = store.create("it-duplicates", "Untitled").await.unwrap();

    store
        .insert_running(JobKind::Detection, recipe.id)
        .await
        .expect("First insert should succeed");
    let err = store
        .insert_running(JobKind::Detection, recipe.id)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));

    let err = store
        .insert_running(JobKind::Generation, i64::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingRecipe(_)));

    store.delete(recipe.id, "it-duplicates").await.unwrap();
}
