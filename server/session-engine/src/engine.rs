//! Per-session orchestration: normalize, detect, classify, assemble summary.
//!
//! The engine is stateless across sessions (`process` takes `&self`), so a
//! caller-side worker pool can run many sessions concurrently with no
//! coordination beyond collecting results; one failed session never affects
//! the others.

use crate::config::Config;
use crate::detect;
use crate::error::EngineError;
use crate::geofence::GeofenceIndex;
use crate::keys;
use crate::normalize;
use crate::types::*;

pub struct Engine {
  config: Config,
}

impl Engine {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  /// Process one session against an injected geofence lookup.
  pub fn process(
    &self,
    raw: &InboundSession,
    geofences: &dyn GeofenceIndex,
  ) -> Result<SessionSummary, EngineError> {
    let data = normalize::normalize(raw, &self.config)?;

    let detected = detect::detect(&data.session_id, &data.stability, &data.positions, &self.config);
    let timeline = keys::run(
      &data.session_id,
      &data.positions,
      &data.beacon,
      geofences,
      &self.config,
    );

    Ok(SessionSummary {
      session_id: data.session_id,
      vehicle_id: data.vehicle_id,
      start_time: timeline.span.map(|(s, _)| s.to_rfc3339()),
      end_time: timeline.span.map(|(_, e)| e.to_rfc3339()),
      segments: timeline.segments,
      incidents: detected.incidents,
      diagnostics: Diagnostics {
        malformed_samples: data.malformed_samples,
        resorted_streams: data.resorted_streams,
        position_gaps: data.position_gaps,
        unlocated_incidents: detected.unlocated,
        initial_state_inferred: timeline.initial_state_inferred,
        transition_anomalies: timeline.anomalies,
      },
    })
  }
}
