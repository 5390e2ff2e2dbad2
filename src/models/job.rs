use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Status of a detection or generation job.
///
/// `Completed` and `Failed` are terminal: a job never leaves them.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// The two stages of the pipeline. Each kind lives in its own table.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    /// Ingredient detection on the recipe's fridge photo.
    Detection,
    /// Recipe generation from an ingredient list.
    Generation,
}

impl JobKind {
    pub fn table(self) -> &'static str {
        match self {
            JobKind::Detection => "ingredients_jobs",
            JobKind::Generation => "recipe_jobs",
        }
    }

    pub fn result_column(self) -> &'static str {
        match self {
            JobKind::Detection => "ingredients_json",
            JobKind::Generation => "recipe_json",
        }
    }

    /// Static label for metrics and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Detection => "detection",
            JobKind::Generation => "generation",
        }
    }
}

/// A persisted unit of asynchronous work.
///
/// `result_json` is present only when `status` is `Completed`, and `end_time`
/// is present exactly when `status` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: i64,
    pub kind: JobKind,
    pub recipe_id: i64,
    pub status: JobStatus,
    pub result_json: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Decode the stored result payload, if any.
    pub fn result<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.result_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    /// Whether the row satisfies the status/payload/end-time invariants.
    pub fn is_consistent(&self) -> bool {
        let payload_ok = self.result_json.is_some() == (self.status == JobStatus::Completed);
        let end_ok = self.end_time.is_some() == self.status.is_terminal();
        payload_ok && end_ok
    }
}

/// Serialize a result payload for the text column.
pub fn encode_result<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Both job records of one recipe.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipeJobs {
    pub ingredients_job: Option<JobRecord>,
    pub recipe_job: Option<JobRecord>,
}
