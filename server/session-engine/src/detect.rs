//! Stability incident detection: trigger predicates, per-kind debounce with
//! peak tracking, severity bands, and geolocation via the stream aligner.
//!
//! Pure function of its inputs: running it twice on identical samples yields
//! an identical incident list.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::align;
use crate::config::{Config, SeverityBands};
use crate::types::*;

#[derive(Debug, Clone)]
pub struct DetectOutcome {
  pub incidents: Vec<StabilityIncident>,
  pub unlocated: u64,
}

#[derive(Debug, Clone)]
struct Pending {
  window_end: DateTime<Utc>,
  intensity: f64,
  peak: StabilitySample,
}

/// Classify a session's stability stream into discrete incidents.
pub fn detect(
  session_id: &str,
  stability: &[StabilitySample],
  positions: &[PositionSample],
  config: &Config,
) -> DetectOutcome {
  let debounce = Duration::seconds(config.debounce_secs);
  let kinds = [
    IncidentKind::RolloverRisk,
    IncidentKind::DangerousDrift,
    IncidentKind::AbruptManeuver,
  ];
  let mut pending: [Option<Pending>; 3] = [None, None, None];
  let mut incidents: Vec<StabilityIncident> = Vec::new();
  let mut unlocated: u64 = 0;

  // Consecutive samples satisfying the yaw-rate condition (drift arming).
  let mut yaw_run: usize = 0;
  let mut prev: Option<&StabilitySample> = None;

  for sample in stability {
    if let Some(p) = prev {
      let dt = (sample.timestamp - p.timestamp).num_milliseconds() as f64 / 1000.0;
      if dt > 0.0 {
        let rate = wrap_degrees(sample.yaw - p.yaw).abs() / dt;
        if rate >= config.yaw_rate_threshold {
          yaw_run += 1;
        } else {
          yaw_run = 0;
        }
      }
    }
    prev = Some(sample);

    // Rollover risk: excessive roll, or the stability index bottoming out.
    let roll_ratio = sample.roll.abs() / config.roll_threshold_deg;
    let si_ratio = if sample.stability_index < config.stability_index_critical {
      config.stability_index_critical / sample.stability_index.max(1e-6)
    } else {
      0.0
    };
    if sample.roll.abs() > config.roll_threshold_deg
      || sample.stability_index < config.stability_index_critical
    {
      trigger(
        &mut pending[0],
        &mut incidents,
        &mut unlocated,
        session_id,
        IncidentKind::RolloverRisk,
        roll_ratio.max(si_ratio),
        sample,
        positions,
        debounce,
        config,
      );
    }

    // Dangerous drift: lateral acceleration plus a sustained yaw rate.
    let lateral = sample.accel_y.abs();
    if lateral > config.lateral_accel_threshold && yaw_run >= config.drift_sustain_samples {
      trigger(
        &mut pending[1],
        &mut incidents,
        &mut unlocated,
        session_id,
        IncidentKind::DangerousDrift,
        lateral / config.lateral_accel_threshold,
        sample,
        positions,
        debounce,
        config,
      );
    }

    // Abrupt maneuver: short combined-acceleration spike.
    let combined = (sample.accel_x.powi(2) + sample.accel_y.powi(2) + sample.accel_z.powi(2)).sqrt();
    if combined > config.accel_spike_threshold {
      trigger(
        &mut pending[2],
        &mut incidents,
        &mut unlocated,
        session_id,
        IncidentKind::AbruptManeuver,
        combined / config.accel_spike_threshold,
        sample,
        positions,
        debounce,
        config,
      );
    }
  }

  for (slot, kind) in pending.into_iter().zip(kinds) {
    if let Some(p) = slot {
      flush(
        &mut incidents,
        &mut unlocated,
        session_id,
        kind,
        &p,
        positions,
        config,
      );
    }
  }

  // Deterministic order: by timestamp, then kind label.
  incidents.sort_by(|a, b| {
    a.timestamp
      .cmp(&b.timestamp)
      .then_with(|| a.kind.label().cmp(b.kind.label()))
  });

  DetectOutcome {
    incidents,
    unlocated,
  }
}

#[allow(clippy::too_many_arguments)]
fn trigger(
  slot: &mut Option<Pending>,
  incidents: &mut Vec<StabilityIncident>,
  unlocated: &mut u64,
  session_id: &str,
  kind: IncidentKind,
  intensity: f64,
  sample: &StabilitySample,
  positions: &[PositionSample],
  debounce: Duration,
  config: &Config,
) {
  match slot {
    // Still inside the cool-down: one continuous event, track the peak and
    // keep extending the window.
    Some(p) if sample.timestamp <= p.window_end => {
      if intensity > p.intensity {
        p.intensity = intensity;
        p.peak = sample.clone();
      }
      p.window_end = sample.timestamp + debounce;
    }
    _ => {
      if let Some(p) = slot.take() {
        flush(incidents, unlocated, session_id, kind, &p, positions, config);
      }
      *slot = Some(Pending {
        window_end: sample.timestamp + debounce,
        intensity,
        peak: sample.clone(),
      });
    }
  }
}

fn flush(
  incidents: &mut Vec<StabilityIncident>,
  unlocated: &mut u64,
  session_id: &str,
  kind: IncidentKind,
  p: &Pending,
  positions: &[PositionSample],
  config: &Config,
) {
  let bands = match kind {
    IncidentKind::RolloverRisk => config.rollover_bands,
    IncidentKind::DangerousDrift => config.drift_bands,
    IncidentKind::AbruptManeuver => config.maneuver_bands,
  };
  let severity = severity_for(bands, p.intensity);

  let location = align::locate(p.peak.timestamp, positions, config).map(|loc| IncidentLocation {
    lat: loc.lat,
    lon: loc.lon,
    interpolated: loc.interpolated,
  });
  if location.is_none() {
    *unlocated += 1;
    warn!(
      session = %session_id,
      kind = kind.label(),
      at = %p.peak.timestamp.to_rfc3339(),
      "incident has no usable position fix; keeping it unlocated"
    );
  }

  incidents.push(StabilityIncident {
    id: incident_id(session_id, kind, p.peak.timestamp),
    session_id: session_id.to_string(),
    timestamp: p.peak.timestamp.to_rfc3339(),
    kind,
    severity,
    location,
    peak: PeakMetrics {
      roll: p.peak.roll,
      pitch: p.peak.pitch,
      yaw: p.peak.yaw,
      accel_x: p.peak.accel_x,
      accel_y: p.peak.accel_y,
      accel_z: p.peak.accel_z,
      stability_index: p.peak.stability_index,
    },
  });
}

fn severity_for(bands: SeverityBands, intensity: f64) -> Severity {
  if intensity >= bands.critical {
    Severity::Critical
  } else if intensity >= bands.moderate {
    Severity::Moderate
  } else {
    Severity::Light
  }
}

/// Stable incident ID: hash of session + kind + peak time.
fn incident_id(session_id: &str, kind: IncidentKind, at: DateTime<Utc>) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(session_id.as_bytes());
  hasher.update(b"|");
  hasher.update(kind.label().as_bytes());
  hasher.update(b"|");
  hasher.update(at.to_rfc3339().as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("stb-{}", &hex[..16])
}

/// Normalize an angle difference into [-180, 180) degrees.
fn wrap_degrees(d: f64) -> f64 {
  let mut d = d % 360.0;
  if d >= 180.0 {
    d -= 360.0;
  } else if d < -180.0 {
    d += 360.0;
  }
  d
}
