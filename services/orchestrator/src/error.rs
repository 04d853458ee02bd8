use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

/// Which preparatory call of the sequencer failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Calculate,
    TravelTimes,
    Submit,
}

impl Step {
    fn fallback_message(self) -> &'static str {
        match self {
            Step::Calculate => "source parameter calculation failed",
            Step::TravelTimes => "travel time calculation failed",
            Step::Submit => "simulation could not be started",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Calculate => "calculate",
            Step::TravelTimes => "travelTimes",
            Step::Submit => "submit",
        })
    }
}

pub const POLLING_FAILED_MESSAGE: &str = "could not check the simulation status";
pub const JOB_FAILED_MESSAGE: &str = "simulation failed";

/// Terminal error of one calculation run. Display is the user-facing message.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunError {
    #[error("{message}")]
    CalculationFailed { stage: Step, message: String },

    /// The status query itself failed; the job may still be running server-side.
    #[error("{message}")]
    PollingFailed { message: String },

    /// The backend reported the job as failed.
    #[error("{message}")]
    JobFailed { message: String },
}

impl RunError {
    pub fn stage_failed(stage: Step, err: &BackendError) -> Self {
        let message = match err.backend_message() {
            Some(m) => m.to_string(),
            None => format!("{} ({err})", stage.fallback_message()),
        };
        RunError::CalculationFailed { stage, message }
    }

    pub fn polling_failed(err: &BackendError) -> Self {
        RunError::PollingFailed {
            message: format!("{POLLING_FAILED_MESSAGE} ({err})"),
        }
    }

    pub fn job_failed(backend_error: Option<&str>) -> Self {
        let message = backend_error
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(JOB_FAILED_MESSAGE)
            .to_string();
        RunError::JobFailed { message }
    }

    /// The sequencer step, for stage failures.
    pub fn step(&self) -> Option<Step> {
        match self {
            RunError::CalculationFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
