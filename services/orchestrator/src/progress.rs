//! Progress policy for a calculation run.
//!
//! The sequencer moves through fixed checkpoints; once the job is submitted
//! the estimate follows the backend's step ratio (or direct percentage),
//! capped at [`REPORTED_CAP`] until the job completes. Backends that report
//! nothing structured get a slow heuristic bounded at [`HEURISTIC_CAP`].

use seismic::{JobStatusReport, ProgressDetails};

pub const CALCULATED: u8 = 10;
pub const TRAVEL_TIMES_READY: u8 = 20;
pub const SUBMITTED: u8 = 30;
pub const COMPLETE: u8 = 100;

pub const REPORTED_CAP: u8 = 95;
pub const HEURISTIC_CAP: u8 = 90;
pub const HEURISTIC_STEP: u8 = 5;

/// Progress after a non-terminal snapshot. Never below `previous`.
pub fn estimate(previous: u8, report: &JobStatusReport) -> u8 {
    let next = match report.details.as_ref().and_then(ProgressDetails::percent) {
        Some(pct) => pct.round().clamp(0.0, f64::from(REPORTED_CAP)) as u8,
        None => previous.saturating_add(HEURISTIC_STEP).min(HEURISTIC_CAP),
    };
    previous.max(next)
}
