//! Domain types for the tsunami simulation pipeline.
//!
//! Wire shapes of the four backend endpoints plus client-side validation of
//! the seismic event that drives a calculation run.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::*;
