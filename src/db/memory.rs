//! In-process store with the same semantics as the PostgreSQL backend.
//! Used by the test suites and for running the API without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::db::store::{JobStore, RecipeStore};
use crate::db::StoreError;
use crate::models::job::{JobKind, JobRecord, JobStatus};
use crate::models::recipe::Recipe;

#[derive(Default)]
struct Tables {
    next_recipe_id: i64,
    next_detection_id: i64,
    next_generation_id: i64,
    recipes: BTreeMap<i64, Recipe>,
    detection_jobs: BTreeMap<i64, JobRecord>,
    generation_jobs: BTreeMap<i64, JobRecord>,
}

impl Tables {
    fn jobs(&self, kind: JobKind) -> &BTreeMap<i64, JobRecord> {
        match kind {
            JobKind::Detection => &self.detection_jobs,
            JobKind::Generation => &self.generation_jobs,
        }
    }

    fn jobs_mut(&mut self, kind: JobKind) -> &mut BTreeMap<i64, JobRecord> {
        match kind {
            JobKind::Detection => &mut self.detection_jobs,
            JobKind::Generation => &mut self.generation_jobs,
        }
    }

    fn next_job_id(&mut self, kind: JobKind) -> i64 {
        let counter = match kind {
            JobKind::Detection => &mut self.next_detection_id,
            JobKind::Generation => &mut self.next_generation_id,
        };
        *counter += 1;
        *counter
    }

    fn running_mut(&mut self, kind: JobKind, job_id: i64) -> Option<&mut JobRecord> {
        self.jobs_mut(kind)
            .get_mut(&job_id)
            .filter(|job| job.status == JobStatus::Running)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn create(&self, owner_id: &str, title: &str) -> Result<Recipe, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.next_recipe_id += 1;
        let recipe = Recipe {
            id: tables.next_recipe_id,
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            image: None,
            created_at: Utc::now(),
        };
        tables.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn find(&self, recipe_id: i64, owner_id: &str) -> Result<Option<Recipe>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .get(&recipe_id)
            .filter(|r| r.owner_id == owner_id)
            .cloned())
    }

    async fn find_unscoped(&self, recipe_id: i64) -> Result<Option<Recipe>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.recipes.get(&recipe_id).cloned())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.lock().await;
        let mut recipes: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(recipes)
    }

    async fn set_image(
        &self,
        recipe_id: i64,
        owner_id: &str,
        image: &str,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .get_mut(&recipe_id)
            .filter(|r| r.owner_id == owner_id)
            .map(|r| {
                r.image = Some(image.to_string());
                r.clone()
            }))
    }

    async fn rename(
        &self,
        recipe_id: i64,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .get_mut(&recipe_id)
            .filter(|r| r.owner_id == owner_id)
            .map(|r| {
                r.title = title.to_string();
                r.clone()
            }))
    }

    async fn delete(&self, recipe_id: i64, owner_id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .recipes
            .get(&recipe_id)
            .is_some_and(|r| r.owner_id == owner_id);
        if !owned {
            return Ok(false);
        }
        tables.recipes.remove(&recipe_id);
        tables.detection_jobs.retain(|_, j| j.recipe_id != recipe_id);
        tables.generation_jobs.retain(|_, j| j.recipe_id != recipe_id);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_running(&self, kind: JobKind, recipe_id: i64) -> Result<JobRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.recipes.contains_key(&recipe_id) {
            return Err(StoreError::MissingRecipe(recipe_id));
        }
        if tables.jobs(kind).values().any(|j| j.recipe_id == recipe_id) {
            return Err(StoreError::Duplicate { kind, recipe_id });
        }

        let job = JobRecord {
            id: tables.next_job_id(kind),
            kind,
            recipe_id,
            status: JobStatus::Running,
            result_json: None,
            start_time: Utc::now(),
            end_time: None,
        };
        tables.jobs_mut(kind).insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_for_owner(
        &self,
        kind: JobKind,
        job_id: i64,
        owner_id: &str,
    ) -> Result<Option<JobRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .jobs(kind)
            .get(&job_id)
            .filter(|job| {
                tables
                    .recipes
                    .get(&job.recipe_id)
                    .is_some_and(|r| r.owner_id == owner_id)
            })
            .cloned())
    }

    async fn find_by_recipe(&self, kind: JobKind, recipe_id: i64) -> Result<Option<JobRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .jobs(kind)
            .values()
            .find(|j| j.recipe_id == recipe_id)
            .cloned())
    }

    async fn find_by_id(&self, kind: JobKind, job_id: i64) -> Result<Option<JobRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.jobs(kind).get(&job_id).cloned())
    }

    async fn complete(&self, kind: JobKind, job_id: i64, payload: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.running_mut(kind, job_id) {
            Some(job) => {
                job.status = JobStatus::Completed;
                job.result_json = Some(payload.to_string());
                job.end_time = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn complete_generation(&self, job_id: i64, payload: &str, title: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let recipe_id = match tables.running_mut(JobKind::Generation, job_id) {
            Some(job) => {
                job.status = JobStatus::Completed;
                job.result_json = Some(payload.to_string());
                job.end_time = Some(Utc::now());
                job.recipe_id
            }
            None => return Ok(false),
        };
        if let Some(recipe) = tables.recipes.get_mut(&recipe_id) {
            recipe.title = title.to_string();
        }
        Ok(true)
    }

    async fn fail(&self, kind: JobKind, job_id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.running_mut(kind, job_id) {
            Some(job) => {
                job.status = JobStatus::Failed;
                job.result_json = None;
                job.end_time = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn replace_result(
        &self,
        kind: JobKind,
        job_id: i64,
        payload: &str,
    ) -> Result<Option<JobRecord>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .jobs_mut(kind)
            .get_mut(&job_id)
            .filter(|job| job.status == JobStatus::Completed)
            .map(|job| {
                job.result_json = Some(payload.to_string());
                job.clone()
            }))
    }
}
