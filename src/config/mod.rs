use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000"). Unused by the worker.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string. When unset, jobs run in-process.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// HS256 secret for validating bearer tokens
    pub jwt_secret: String,

    /// Base URL of the ingredient-detection service
    #[serde(default = "default_detection_url")]
    pub detection_url: String,

    #[serde(default = "default_detection_timeout_secs")]
    pub detection_timeout_secs: u64,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,

    pub llm_api_key: String,

    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Directory recipe images are stored in
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Maximum number of jobs running at once
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Address the worker serves Prometheus metrics on. Unused by the API.
    #[serde(default = "default_worker_metrics_addr")]
    pub worker_metrics_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_detection_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_detection_timeout_secs() -> u64 {
    30
}

fn default_llm_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_upload_dir() -> String {
    "uploads/recipes".to_string()
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_worker_metrics_addr() -> String {
    "0.0.0.0:9100".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_secs(self.detection_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
