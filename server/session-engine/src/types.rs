//! Core types for the session engine (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what the caller sends)
// ---------------------------------------------------------------------------

/// One inbound session line from stdin. Unknown fields are silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundSession {
  pub session_id: String,
  pub vehicle_id: String,
  #[serde(default)]
  pub positions: Vec<InboundPosition>,
  #[serde(default)]
  pub stability: Vec<InboundStability>,
  #[serde(default)]
  pub beacon: Vec<InboundBeacon>,
  /// Geofence definitions are owned externally; the CLI accepts them inline
  /// so it can build the lookup index for this session.
  #[serde(default)]
  pub geofences: Vec<InboundGeofence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundPosition {
  pub timestamp: String,
  pub lat: f64,
  pub lon: f64,
  #[serde(default)]
  pub speed: Option<f64>,
  #[serde(default)]
  pub fix_quality: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundStability {
  pub timestamp: String,
  pub roll: f64,
  pub pitch: f64,
  pub yaw: f64,
  pub accel_x: f64,
  pub accel_y: f64,
  pub accel_z: f64,
  pub stability_index: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundBeacon {
  pub timestamp: String,
  pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundGeofence {
  pub id: String,
  pub name: String,
  /// "park" or "workshop".
  pub kind: String,
  pub shape: InboundShape,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundShape {
  Circle { lat: f64, lon: f64, radius_m: f64 },
  Polygon { vertices: Vec<[f64; 2]> },
}

// ---------------------------------------------------------------------------
// Canonical internal samples (after normalization)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PositionSample {
  pub timestamp: DateTime<Utc>,
  pub lat: f64,
  pub lon: f64,
  pub speed: f64,
  pub fix_quality: u8,
}

#[derive(Debug, Clone)]
pub struct StabilitySample {
  pub timestamp: DateTime<Utc>,
  pub roll: f64,
  pub pitch: f64,
  pub yaw: f64,
  pub accel_x: f64,
  pub accel_y: f64,
  pub accel_z: f64,
  /// Derived rollover/drift risk scalar in [0, 1]; lower is worse.
  pub stability_index: f64,
}

#[derive(Debug, Clone)]
pub struct BeaconSample {
  pub timestamp: DateTime<Utc>,
  pub active: bool,
}

// ---------------------------------------------------------------------------
// Severity / incident kind enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Light,
  Moderate,
  Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
  RolloverRisk,
  DangerousDrift,
  AbruptManeuver,
}

impl IncidentKind {
  pub fn label(self) -> &'static str {
    match self {
      Self::RolloverRisk => "rollover_risk",
      Self::DangerousDrift => "dangerous_drift",
      Self::AbruptManeuver => "abrupt_maneuver",
    }
  }
}

// ---------------------------------------------------------------------------
// Operational keys
// ---------------------------------------------------------------------------

/// Operational key ("clave") for a timeline phase. Numeric codes are the
/// fleet's historical radio codes and are preserved in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
  Taller,
  Parque,
  Emergencia,
  Incendio,
  Regreso,
}

impl KeyType {
  pub fn code(self) -> u8 {
    match self {
      Self::Taller => 0,
      Self::Parque => 1,
      Self::Emergencia => 2,
      Self::Incendio => 3,
      Self::Regreso => 5,
    }
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IncidentLocation {
  pub lat: f64,
  pub lon: f64,
  pub interpolated: bool,
}

/// Metrics of the peak-intensity sample inside a debounce window.
#[derive(Debug, Clone, Serialize)]
pub struct PeakMetrics {
  pub roll: f64,
  pub pitch: f64,
  pub yaw: f64,
  pub accel_x: f64,
  pub accel_y: f64,
  pub accel_z: f64,
  pub stability_index: f64,
}

/// A discrete stability incident. Immutable once emitted.
#[derive(Debug, Clone, Serialize)]
pub struct StabilityIncident {
  pub id: String,
  pub session_id: String,
  pub timestamp: String,
  pub kind: IncidentKind,
  pub severity: Severity,
  /// `null` when the position stream had a total gap around the incident;
  /// such incidents are kept but excluded from clustering downstream.
  pub location: Option<IncidentLocation>,
  pub peak: PeakMetrics,
}

/// One contiguous phase of the session timeline.
#[derive(Debug, Clone, Serialize)]
pub struct KeySegment {
  pub session_id: String,
  pub key: KeyType,
  pub code: u8,
  pub start_time: String,
  pub end_time: String,
  pub duration_secs: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub geofence_name: Option<String>,
}

/// An observed state change that is not in the valid transition table.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionAnomaly {
  pub at: String,
  pub from: KeyType,
  pub to: KeyType,
  pub trigger: String,
}

/// Per-session diagnostics summary. Anomalies aggregate here instead of
/// aborting the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
  pub malformed_samples: u64,
  pub resorted_streams: u64,
  pub position_gaps: u64,
  pub unlocated_incidents: u64,
  pub initial_state_inferred: bool,
  pub transition_anomalies: Vec<TransitionAnomaly>,
}

/// The per-session output line.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
  pub session_id: String,
  pub vehicle_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_time: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_time: Option<String>,
  pub segments: Vec<KeySegment>,
  pub incidents: Vec<StabilityIncident>,
  pub diagnostics: Diagnostics,
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
