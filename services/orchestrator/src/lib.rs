//! Client-side orchestration of a tsunami simulation run.
//!
//! A run calls the simulation backend three times in order (source
//! parameters, travel times, job submission) and then polls the submitted
//! job until it completes or fails. [`Orchestrator`] owns the run and
//! publishes an [`OrchestrationState`] snapshot after every step.

pub mod backend;
pub mod backend_http;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod state;

mod poller;
mod run;
mod sequencer;

pub use backend::{BackendError, BackendInfo, SimulationBackend};
pub use backend_http::{Endpoints, HttpBackend};
pub use config::AppConfig;
pub use error::{RunError, Step};
pub use orchestrator::Orchestrator;
pub use state::{OrchestrationState, Stage, StateStore};
