use async_trait::async_trait;
use thiserror::Error;

use seismic::{CalculationRequest, JobCreated, JobId, JobStatusReport, SourceParameters, TravelTimes};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BackendInfo {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Non-success status; `message` is whatever the error payload carried.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl BackendError {
    /// Message reported by the backend itself, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }
}

/// The external simulation service, one method per endpoint.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    async fn calculate(&self, request: &CalculationRequest) -> Result<SourceParameters, BackendError>;
    async fn travel_times(&self, request: &CalculationRequest) -> Result<TravelTimes, BackendError>;
    async fn run_simulation(&self, request: &CalculationRequest) -> Result<JobCreated, BackendError>;
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, BackendError>;
    fn info(&self) -> BackendInfo;
}
