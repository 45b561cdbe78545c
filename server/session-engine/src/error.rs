//! Structured error types for the session engine.
//!
//! Only structurally invalid input (missing identity, unparseable JSON) is an
//! error; per-sample anomalies aggregate into `Diagnostics` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// No aggregation key can be derived without session/vehicle identity.
  #[error("missing identity: {0} must not be empty")]
  MissingIdentity(&'static str),

  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }
}
