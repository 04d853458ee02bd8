use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::schema::CalculationRequest;

pub const MIN_MAGNITUDE: f64 = 6.5;
pub const MAX_MAGNITUDE: f64 = 9.5;
pub const MIN_DEPTH_KM: f64 = 0.0;
pub const MAX_DEPTH_KM: f64 = 100.0;

/// Decimal places kept on coordinates sent to the backend.
pub const COORDINATE_DECIMALS: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Magnitude,
    Depth,
    Latitude,
    Longitude,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Magnitude => "magnitude",
            Field::Depth => "depth",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} must be a finite number")]
    NotFinite(Field),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: Field,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Every violation found in one request.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("invalid calculation request: {}", join(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A request that passed [`CalculationRequest::validate`].
///
/// The orchestrator only accepts this type, so nothing unvalidated is ever sent.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedRequest(CalculationRequest);

impl ValidatedRequest {
    pub fn get(&self) -> &CalculationRequest {
        &self.0
    }

    pub fn into_inner(self) -> CalculationRequest {
        self.0
    }
}

impl CalculationRequest {
    pub fn validate(mut self) -> Result<ValidatedRequest, ValidationErrors> {
        let mut errors = Vec::new();

        check(&mut errors, Field::Magnitude, self.magnitude, MIN_MAGNITUDE, MAX_MAGNITUDE);
        check(&mut errors, Field::Depth, self.depth, MIN_DEPTH_KM, MAX_DEPTH_KM);
        check(&mut errors, Field::Latitude, self.latitude, -90.0, 90.0);
        check(&mut errors, Field::Longitude, self.longitude, -180.0, 180.0);

        if !errors.is_empty() {
            return Err(ValidationErrors { errors });
        }

        self.latitude = round_coordinate(self.latitude);
        self.longitude = round_coordinate(self.longitude);
        Ok(ValidatedRequest(self))
    }
}

fn check(errors: &mut Vec<ValidationError>, field: Field, value: f64, min: f64, max: f64) {
    if !value.is_finite() {
        errors.push(ValidationError::NotFinite(field));
    } else if value < min || value > max {
        errors.push(ValidationError::OutOfRange { field, min, max, value });
    }
}

pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}
