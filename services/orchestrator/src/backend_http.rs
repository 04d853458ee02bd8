use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use seismic::{CalculationRequest, JobCreated, JobId, JobStatusReport, SourceParameters, TravelTimes};

use crate::backend::{BackendError, BackendInfo, SimulationBackend};
use crate::config::AppConfig;

/// Paths of the four simulation endpoints, relative to the base url.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub calculate: String,
    pub travel_times: String,
    pub run_simulation: String,
    pub job_status: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            calculate: "/calculate".to_string(),
            travel_times: "/tsunami-travel-times".to_string(),
            run_simulation: "/run-tsdhn".to_string(),
            job_status: "/job-status".to_string(),
        }
    }
}

pub struct HttpBackend {
    base_url: String,
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_endpoints(base_url, Endpoints::default())
    }

    pub fn with_endpoints(base_url: impl Into<String>, endpoints: Endpoints) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::with_endpoints(cfg.api_url.clone(), cfg.endpoints.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &CalculationRequest,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        debug!(%url, "backend: POST");
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_json(resp).await
    }
}

// FastAPI puts the reason in `detail`, the Next proxy in `message`
#[derive(Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

impl ErrorPayload {
    fn into_message(self) -> Option<String> {
        let detail = self.detail.map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        [self.message, detail, self.error]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp
            .json::<ErrorPayload>()
            .await
            .ok()
            .and_then(ErrorPayload::into_message);
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    resp.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    })
}

#[async_trait]
impl SimulationBackend for HttpBackend {
    async fn calculate(&self, request: &CalculationRequest) -> Result<SourceParameters, BackendError> {
        self.post(&self.endpoints.calculate, request).await
    }

    async fn travel_times(&self, request: &CalculationRequest) -> Result<TravelTimes, BackendError> {
        self.post(&self.endpoints.travel_times, request).await
    }

    async fn run_simulation(&self, request: &CalculationRequest) -> Result<JobCreated, BackendError> {
        self.post(&self.endpoints.run_simulation, request).await
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, BackendError> {
        let mut url = reqwest::Url::parse(&self.url(&self.endpoints.job_status))
            .map_err(|e| BackendError::Transport(format!("bad status url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Transport("status url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(job_id.as_str());

        debug!(%url, "backend: GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_json(resp).await
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: "tsdhn-http".to_string(),
            base_url: self.base_url.clone(),
        }
    }
}
