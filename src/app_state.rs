use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::db::store::{JobStore, RecipeStore};
use crate::jobs::orchestrator::JobOrchestrator;
use crate::services::executor::TaskSubmitter;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<dyn RecipeStore>,
    pub orchestrator: JobOrchestrator,
    pub submitter: Arc<dyn TaskSubmitter>,
    pub auth: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        recipes: Arc<dyn RecipeStore>,
        jobs: Arc<dyn JobStore>,
        submitter: Arc<dyn TaskSubmitter>,
        auth: TokenVerifier,
    ) -> Self {
        let orchestrator = JobOrchestrator::new(recipes.clone(), jobs, submitter.clone());
        Self {
            recipes,
            orchestrator,
            submitter,
            auth: Arc::new(auth),
        }
    }
}
