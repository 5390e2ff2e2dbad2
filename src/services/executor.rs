//! Background execution facility: where the orchestrator hands off work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::jobs::TaskRunner;
use crate::models::job::JobKind;
use crate::services::queue::QueueError;

/// One unit of work for a task runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub job_id: i64,
    pub kind: JobKind,
    /// Ingredient names for generation; empty for detection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,
}

impl WorkItem {
    pub fn detection(job_id: i64) -> Self {
        Self {
            job_id,
            kind: JobKind::Detection,
            ingredients: Vec::new(),
        }
    }

    pub fn generation(job_id: i64, ingredients: Vec<String>) -> Self {
        Self {
            job_id,
            kind: JobKind::Generation,
            ingredients,
        }
    }
}

/// Fire-and-forget submission. `submit` never waits for the work to run.
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    async fn submit(&self, item: WorkItem) -> Result<(), QueueError>;

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }

    fn backend(&self) -> &'static str;
}

/// In-process executor: a dispatcher task drains a channel and spawns one
/// runner per item, at most `concurrency` at a time.
///
/// Items still in the channel are lost if the process exits.
pub struct LocalExecutor {
    sender: mpsc::UnboundedSender<WorkItem>,
}

impl LocalExecutor {
    /// Spawn the dispatcher. Must be called inside a Tokio runtime.
    pub fn start(runner: TaskRunner, concurrency: usize) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WorkItem>();
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));

        tokio::spawn(async move {
            while let Some(item) = receiver.recv().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let runner = runner.clone();
                tokio::spawn(async move {
                    runner.run_guarded(item).await;
                    drop(permit);
                });
            }
            tracing::info!("Local executor stopped");
        });

        Self { sender }
    }
}

#[async_trait]
impl TaskSubmitter for LocalExecutor {
    async fn submit(&self, item: WorkItem) -> Result<(), QueueError> {
        self.sender.send(item).map_err(|_| QueueError::Closed)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
