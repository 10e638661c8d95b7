//! Schema checks and the valid/reject split.
//!
//! Column checks run against a schema before any row is looked at. The
//! classifier never raises for bad rows: rejection is part of its output.

mod classify;
mod columns;

pub use classify::split_valid_rejected;
pub use columns::{missing_columns, validate_key_columns, validate_required_columns};
