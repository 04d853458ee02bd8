use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Body shared by `calculate`, `travel-times` and `run-simulation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub magnitude: f64,
    pub depth: f64, // km
    pub latitude: f64,
    pub longitude: f64,
    pub datetime: DateTime<Utc>,
}

/// Rupture geometry returned by the first stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceParameters {
    #[serde(alias = "Largo")]
    pub length: f64,
    #[serde(alias = "Ancho")]
    pub width: f64,
    #[serde(alias = "Dislocación")]
    pub dislocation: f64,
    #[serde(alias = "Momento_sísmico")]
    pub seismic_moment: f64,

    // epicenter; older backends omit it
    #[serde(default)]
    pub lat0: Option<f64>,
    #[serde(default)]
    pub lon0: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsunami_warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_coast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epicenter_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectangle_parameters: Option<RectangleParameters>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rectangle_corners: Vec<Corner>,
}

impl SourceParameters {
    pub fn epicenter(&self) -> Option<(f64, f64)> {
        Some((self.lat0?, self.lon0?))
    }

    /// Fills a missing epicenter from the request that produced these parameters.
    pub fn with_epicenter_fallback(mut self, request: &CalculationRequest) -> Self {
        if self.epicenter().is_none() {
            self.lat0 = Some(request.latitude);
            self.lon0 = Some(request.longitude);
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectangleParameters {
    #[serde(rename = "L1")]
    pub l1: f64,
    #[serde(rename = "W1")]
    pub w1: f64,
    pub beta: f64,
    pub alfa: f64,
    pub h1: f64,
    pub a1: f64,
    pub b1: f64,
    pub xo: f64,
    pub yo: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub lon: f64,
    pub lat: f64,
}

/// Travel-time table from the second stage. Display data only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelTimes {
    #[serde(default)]
    pub arrival_times: BTreeMap<String, String>,
    #[serde(default)]
    pub distances: BTreeMap<String, f64>,
    #[serde(default)]
    pub epicenter_info: Option<EpicenterInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpicenterInfo {
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub depth: String,
    pub magnitude: String,
}

/// Opaque handle of a server-side simulation job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Response of `run-simulation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Coarse job lifecycle as reported by `job-status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    /// Anything the backend reports that we don't know; treated as still running.
    Other(String),
}

impl JobState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => JobState::Queued,
            "running" | "processing" => JobState::Running,
            "completed" => JobState::Completed,
            "failed" | "error" => JobState::Failed,
            _ => JobState::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(JobState::parse(&raw))
    }
}

/// Structured progress attached to a status snapshot.
///
/// An explicit percentage wins over a step count when both are sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressDetails {
    Percent {
        #[serde(alias = "progress")]
        percentage: f64,
    },
    Steps {
        #[serde(deserialize_with = "step_count")]
        current_step: u32,
        #[serde(deserialize_with = "step_count")]
        total_steps: u32,
    },
    /// Free-form text or an unrecognised object; carried for display only.
    Other(serde_json::Value),
}

impl ProgressDetails {
    /// Completion in percent, when the details carry a usable ratio.
    pub fn percent(&self) -> Option<f64> {
        match *self {
            ProgressDetails::Steps { current_step, total_steps } if total_steps > 0 => {
                Some(f64::from(current_step) / f64::from(total_steps) * 100.0)
            }
            ProgressDetails::Percent { percentage } if percentage.is_finite() => Some(percentage),
            _ => None,
        }
    }
}

// total_steps shows up as "5" on some deployments
fn step_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Num(f64),
        Text(String),
    }

    match NumOrText::deserialize(d)? {
        NumOrText::Num(n) if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) => Ok(n as u32),
        NumOrText::Num(n) => Err(D::Error::custom(format!("invalid step count: {n}"))),
        NumOrText::Text(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|e| D::Error::custom(format!("invalid step count {s:?}: {e}"))),
    }
}

/// One `job-status` snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ProgressDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
}

impl JobStatusReport {
    pub fn new(status: JobState) -> Self {
        Self {
            status,
            details: None,
            download_url: None,
            error: None,
            created_at: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
