//! Types for the hotspot engine (JSON contracts + internal models).
//!
//! The inbound contract matches session-engine's incident output; the crates
//! stay independent and each own their JSON surface.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what the caller sends)
// ---------------------------------------------------------------------------

/// One inbound incident line from stdin. Unknown fields are silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundIncident {
  pub id: String,
  pub session_id: String,
  pub severity: String,
  #[serde(default)]
  pub kind: Option<String>,
  #[serde(default)]
  pub location: Option<InboundLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundLocation {
  pub lat: f64,
  pub lon: f64,
  #[serde(default)]
  pub interpolated: bool,
}

// ---------------------------------------------------------------------------
// Severity (normalized, ordered by badness)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Light,
  Moderate,
  Critical,
}

impl Severity {
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "light" | "leve" => Some(Self::Light),
      "moderate" | "moderada" => Some(Self::Moderate),
      "critical" | "critica" | "crítica" => Some(Self::Critical),
      _ => None,
    }
  }
}

// ---------------------------------------------------------------------------
// Internal normalized incident
// ---------------------------------------------------------------------------

/// Canonical incident after validation. `location` stays optional: unlocated
/// incidents are counted but never clustered.
#[derive(Debug, Clone)]
pub struct IncidentRecord {
  pub id: String,
  pub severity: Severity,
  pub location: Option<(f64, f64)>,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Centroid {
  pub lat: f64,
  pub lon: f64,
}

/// A spatial hotspot ("black point") of stability incidents.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentCluster {
  pub cluster_id: String,
  pub centroid: Centroid,
  pub radius_m: f64,
  pub frequency: usize,
  pub dominant_severity: Severity,
  pub member_ids: Vec<String>,
}

/// The single output line emitted at end of input.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
  pub clusters: Vec<IncidentCluster>,
  pub located_count: usize,
  pub unlocated_count: usize,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
