//! Test helper utilities shared by the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use recipe_suggester::{
    auth::Claims,
    db::{
        memory::MemoryStore,
        store::{JobStore, RecipeStore},
    },
    jobs::{orchestrator::JobOrchestrator, TaskRunner},
    models::{
        ingredient::DetectedIngredient,
        job::{JobKind, JobRecord, JobStatus},
        recipe::{GeneratedRecipe, Recipe},
    },
    services::{
        executor::{TaskSubmitter, WorkItem},
        ingredient_detector::{DetectionError, IngredientDetector},
        queue::QueueError,
        recipe_generator::{parse_recipe_document, GenerationError, RecipeGenerator},
    },
};

pub const TEST_SECRET: &str = "test-secret";
pub const UPLOAD_DIR: &str = "uploads";
pub const IMAGE: &str = "fridge.jpg";

/// What a scripted engine does when called.
#[derive(Clone)]
pub enum Outcome<T> {
    Succeed(T),
    Fail,
    Panic,
}

/// Ingredient detector with a fixed answer. Records every image reference.
pub struct ScriptedDetector {
    outcome: Outcome<Vec<DetectedIngredient>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDetector {
    pub fn new(outcome: Outcome<Vec<DetectedIngredient>>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(ingredients: Vec<DetectedIngredient>) -> Self {
        Self::new(Outcome::Succeed(ingredients))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngredientDetector for ScriptedDetector {
    async fn detect(&self, image_reference: &str) -> Result<Vec<DetectedIngredient>, DetectionError> {
        self.calls.lock().unwrap().push(image_reference.to_string());
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        match &self.outcome {
            Outcome::Succeed(ingredients) => Ok(ingredients.clone()),
            Outcome::Fail => Err(DetectionError::Status(500, "model crashed".to_string())),
            Outcome::Panic => panic!("detector blew up"),
        }
    }
}

/// Recipe generator with a fixed answer. Records every ingredient list.
pub struct ScriptedGenerator {
    outcome: Outcome<GeneratedRecipe>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn new(outcome: Outcome<GeneratedRecipe>) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(recipe: GeneratedRecipe) -> Self {
        Self::new(Outcome::Succeed(recipe))
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeGenerator for ScriptedGenerator {
    async fn generate(&self, ingredients: &[String]) -> Result<GeneratedRecipe, GenerationError> {
        self.calls.lock().unwrap().push(ingredients.to_vec());
        match &self.outcome {
            Outcome::Succeed(recipe) => Ok(recipe.clone()),
            Outcome::Fail => Err(GenerationError::MissingField("procedure")),
            Outcome::Panic => panic!("generator blew up"),
        }
    }
}

/// Submitter that only records work; tests decide when it runs.
#[derive(Default)]
pub struct ManualSubmitter {
    pending: Mutex<Vec<WorkItem>>,
    broken: AtomicBool,
}

impl ManualSubmitter {
    /// A submitter whose every `submit` fails.
    pub fn broken() -> Self {
        let submitter = Self::default();
        submitter.broken.store(true, Ordering::SeqCst);
        submitter
    }

    pub fn take(&self) -> Vec<WorkItem> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    pub fn pending(&self) -> Vec<WorkItem> {
        self.pending.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskSubmitter for ManualSubmitter {
    async fn submit(&self, item: WorkItem) -> Result<(), QueueError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.pending.lock().unwrap().push(item);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "manual"
    }
}

/// Orchestrator and runner over one in-memory store.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub submitter: Arc<ManualSubmitter>,
    pub detector: Arc<ScriptedDetector>,
    pub generator: Arc<ScriptedGenerator>,
    pub orchestrator: JobOrchestrator,
    pub runner: TaskRunner,
}

impl Harness {
    pub fn new(detector: ScriptedDetector, generator: ScriptedGenerator) -> Self {
        Self::with_submitter(detector, generator, ManualSubmitter::default())
    }

    pub fn with_submitter(
        detector: ScriptedDetector,
        generator: ScriptedGenerator,
        submitter: ManualSubmitter,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let submitter = Arc::new(submitter);
        let detector = Arc::new(detector);
        let generator = Arc::new(generator);

        let orchestrator = JobOrchestrator::new(store.clone(), store.clone(), submitter.clone());
        let runner = TaskRunner::new(
            store.clone(),
            store.clone(),
            detector.clone(),
            generator.clone(),
            UPLOAD_DIR,
        );

        Self {
            store,
            submitter,
            detector,
            generator,
            orchestrator,
            runner,
        }
    }

    /// Default harness: detection finds [`fridge`], generation returns [`sample_recipe`].
    pub fn happy() -> Self {
        Self::new(
            ScriptedDetector::returning(fridge()),
            ScriptedGenerator::returning(sample_recipe("Caprese Pasta")),
        )
    }

    pub async fn recipe(&self, owner: &str) -> Recipe {
        self.store.create(owner, "Untitled").await.unwrap()
    }

    pub async fn recipe_with_image(&self, owner: &str) -> Recipe {
        let recipe = self.recipe(owner).await;
        self.store
            .set_image(recipe.id, owner, IMAGE)
            .await
            .unwrap()
            .unwrap()
    }

    /// Run everything submitted so far, in submission order.
    pub async fn drain(&self) -> usize {
        let items = self.submitter.take();
        for item in &items {
            self.runner.run_guarded(item.clone()).await;
        }
        items.len()
    }

    /// A recipe whose detection job has already completed.
    pub async fn detected_recipe(&self, owner: &str) -> (Recipe, JobRecord) {
        let recipe = self.recipe_with_image(owner).await;
        let job = self
            .orchestrator
            .create_detection_job(recipe.id, owner)
            .await
            .unwrap();
        self.drain().await;
        let job = self.stored(JobKind::Detection, job.id).await;
        assert_eq!(job.status, JobStatus::Completed);
        (recipe, job)
    }

    /// Current row of a job, bypassing owner scoping.
    pub async fn stored(&self, kind: JobKind, job_id: i64) -> JobRecord {
        self.store.find_by_id(kind, job_id).await.unwrap().unwrap()
    }
}

pub fn fridge() -> Vec<DetectedIngredient> {
    vec![
        DetectedIngredient::new("Tomato", 0.95),
        DetectedIngredient::new("Mozzarella", 0.88),
        DetectedIngredient::new("Basil", 0.71),
    ]
}

/// Engine output for a recipe titled `title` that uses `ingredients`.
pub fn recipe_document(title: &str, ingredients: &[&str]) -> String {
    let lines: Vec<serde_json::Value> = ingredients
        .iter()
        .map(|name| serde_json::json!({ "name": name, "quantity_needed": 200, "unit": "gr" }))
        .collect();
    serde_json::json!({
        "title": title,
        "difficulty": "Easy",
        "preparation_time": 10,
        "cooking_time": 15,
        "ingredients": lines,
        "procedure": ["Boil the pasta", "Toss with tomato and mozzarella"]
    })
    .to_string()
}

pub fn recipe_with_ingredients(title: &str, ingredients: &[&str]) -> GeneratedRecipe {
    parse_recipe_document(&recipe_document(title, ingredients)).expect("valid recipe document")
}

pub fn sample_recipe(title: &str) -> GeneratedRecipe {
    recipe_with_ingredients(title, &["Tomato", "Mozzarella"])
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// `Authorization` header value for `owner`, signed with [`TEST_SECRET`].
pub fn bearer(owner: &str) -> String {
    let claims = Claims {
        sub: owner.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Poll a job through the orchestrator until it leaves `running`.
pub async fn wait_for_terminal(
    orchestrator: &JobOrchestrator,
    kind: JobKind,
    job_id: i64,
    owner: &str,
) -> JobRecord {
    for _ in 0..200 {
        let job = match kind {
            JobKind::Detection => orchestrator.get_detection_job(job_id, owner).await,
            JobKind::Generation => orchestrator.get_generation_job(job_id, owner).await,
        }
        .unwrap();
        if job.status.is_terminal() {
            return job;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("{} job {} did not finish within 5 seconds", kind, job_id);
}
