//! Operational key state machine: derives the phase timeline of a session
//! from the beacon stream, geofence membership, and the dwell window.
//!
//! Invalid observed changes never abort processing: the anomaly is recorded,
//! the last valid state is retained, and the change is accepted only once the
//! next piece of evidence corroborates it.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Config;
use crate::dwell::DwellWindow;
use crate::geofence::{GeofenceHit, GeofenceIndex, GeofenceKind};
use crate::types::*;

#[derive(Debug, Clone)]
pub struct KeysOutcome {
  pub segments: Vec<KeySegment>,
  pub anomalies: Vec<TransitionAnomaly>,
  pub initial_state_inferred: bool,
  /// First and last evidence timestamps (positions + beacon).
  pub span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Transition table. Anything else is an anomaly.
fn valid_transition(from: KeyType, to: KeyType) -> bool {
  use KeyType::*;
  matches!(
    (from, to),
    (Taller, Parque)
      | (Parque, Taller)
      | (Parque, Emergencia)
      | (Emergencia, Incendio)
      | (Emergencia, Regreso)
      | (Incendio, Regreso)
      | (Regreso, Parque)
  )
}

/// Build the phase timeline for one session.
pub fn run(
  session_id: &str,
  positions: &[PositionSample],
  beacon: &[BeaconSample],
  geofences: &dyn GeofenceIndex,
  config: &Config,
) -> KeysOutcome {
  let span = evidence_span(positions, beacon);
  let (start, end) = match span {
    Some(s) => s,
    None => {
      warn!(session = %session_id, "no position or beacon evidence; empty timeline");
      return KeysOutcome {
        segments: Vec::new(),
        anomalies: Vec::new(),
        initial_state_inferred: false,
        span: None,
      };
    }
  };

  // First beacon + geofence reading determines the starting state.
  let beacon_at_start = beacon
    .first()
    .filter(|b| b.timestamp <= start)
    .map(|b| b.active)
    .unwrap_or(false);
  let zone_at_start = positions
    .first()
    .and_then(|p| geofences.classify(p.lat, p.lon));
  let (initial, inferred) = initial_state(beacon_at_start, zone_at_start.as_ref());
  if inferred {
    warn!(
      session = %session_id,
      state = ?initial,
      "no clean starting reading; inferred nearest valid starting state"
    );
  }

  let mut machine = Machine::new(session_id, initial, beacon_at_start, zone_at_start, start, config);

  // Merged evidence stream in increasing time order; position evidence first
  // on ties so beacon changes see the current zone.
  let mut pi = 0;
  let mut bi = 0;
  while pi < positions.len() || bi < beacon.len() {
    let take_position = match (positions.get(pi), beacon.get(bi)) {
      (Some(p), Some(b)) => p.timestamp <= b.timestamp,
      (Some(_), None) => true,
      (None, _) => false,
    };
    if take_position {
      let p = &positions[pi];
      let hit = geofences.classify(p.lat, p.lon);
      machine.on_position(p, hit);
      pi += 1;
    } else {
      machine.on_beacon(&beacon[bi]);
      bi += 1;
    }
  }

  machine.finish(end);

  KeysOutcome {
    segments: machine.segments,
    anomalies: machine.anomalies,
    initial_state_inferred: inferred,
    span,
  }
}

fn evidence_span(
  positions: &[PositionSample],
  beacon: &[BeaconSample],
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
  let firsts = [
    positions.first().map(|p| p.timestamp),
    beacon.first().map(|b| b.timestamp),
  ];
  let lasts = [
    positions.last().map(|p| p.timestamp),
    beacon.last().map(|b| b.timestamp),
  ];
  let start = firsts.into_iter().flatten().min()?;
  let end = lasts.into_iter().flatten().max()?;
  Some((start, end))
}

fn initial_state(beacon_active: bool, zone: Option<&GeofenceHit>) -> (KeyType, bool) {
  match (beacon_active, zone.map(|z| z.kind)) {
    (false, Some(GeofenceKind::Workshop)) => (KeyType::Taller, false),
    (false, Some(GeofenceKind::Park)) => (KeyType::Parque, false),
    // Nearest valid starting state, flagged as inferred.
    (true, _) => (KeyType::Emergencia, true),
    (false, None) => (KeyType::Regreso, true),
  }
}

struct Machine<'a> {
  session_id: &'a str,
  state: KeyType,
  beacon_active: bool,
  zone: Option<GeofenceHit>,
  segment_start: DateTime<Utc>,
  segment_zone_name: Option<String>,
  dwell: DwellWindow,
  /// Candidate from an invalid observed change, awaiting corroboration.
  pending: Option<KeyType>,
  segments: Vec<KeySegment>,
  anomalies: Vec<TransitionAnomaly>,
}

impl<'a> Machine<'a> {
  fn new(
    session_id: &'a str,
    initial: KeyType,
    beacon_active: bool,
    zone: Option<GeofenceHit>,
    start: DateTime<Utc>,
    config: &Config,
  ) -> Self {
    let mut machine = Self {
      session_id,
      state: initial,
      beacon_active,
      zone,
      segment_start: start,
      segment_zone_name: None,
      dwell: DwellWindow::new(config.dwell_window_secs, config.dwell_radius_m),
      pending: None,
      segments: Vec::new(),
      anomalies: Vec::new(),
    };
    machine.segment_zone_name = machine.zone_name_for(initial);
    machine
  }

  fn on_position(&mut self, p: &PositionSample, hit: Option<GeofenceHit>) {
    let zone_changed = hit != self.zone;
    self.zone = hit;
    if zone_changed {
      self.evaluate(p.timestamp, "geofence");
    }

    // On-scene confirmation only runs while dispatched with the beacon on.
    if self.state == KeyType::Emergencia && self.beacon_active {
      if let Some(window_start) = self.dwell.push(p.timestamp, p.lat, p.lon) {
        self.transition(window_start, KeyType::Incendio);
      }
    }
  }

  fn on_beacon(&mut self, b: &BeaconSample) {
    if b.active == self.beacon_active {
      return;
    }
    self.beacon_active = b.active;
    self.evaluate(b.timestamp, "beacon");
  }

  /// Re-derive the desired state from current evidence and apply the
  /// transition policy.
  fn evaluate(&mut self, at: DateTime<Utc>, trigger: &str) {
    let candidate = match self.desired_state() {
      Some(c) => c,
      None => {
        self.pending = None;
        return;
      }
    };

    if candidate == self.state {
      self.pending = None;
      return;
    }
    // An active beacon while confirmed on scene is not a downgrade.
    if candidate == KeyType::Emergencia && self.state == KeyType::Incendio {
      self.pending = None;
      return;
    }

    if valid_transition(self.state, candidate) {
      self.transition(at, candidate);
      self.pending = None;
    } else if self.pending == Some(candidate) {
      // Second consecutive piece of evidence for the same change: accept it.
      self.transition(at, candidate);
      self.pending = None;
    } else {
      warn!(
        session = %self.session_id,
        from = ?self.state,
        to = ?candidate,
        trigger = %trigger,
        "transition not in valid table; retaining state"
      );
      self.anomalies.push(TransitionAnomaly {
        at: at.to_rfc3339(),
        from: self.state,
        to: candidate,
        trigger: trigger.to_string(),
      });
      self.pending = Some(candidate);
    }
  }

  fn desired_state(&self) -> Option<KeyType> {
    if self.beacon_active {
      return Some(KeyType::Emergencia);
    }
    match self.zone.as_ref().map(|z| z.kind) {
      Some(GeofenceKind::Park) => Some(KeyType::Parque),
      Some(GeofenceKind::Workshop) => Some(KeyType::Taller),
      None => match self.state {
        // Beacon off away from base after a dispatch: heading back.
        KeyType::Emergencia | KeyType::Incendio => Some(KeyType::Regreso),
        _ => None,
      },
    }
  }

  fn transition(&mut self, at: DateTime<Utc>, to: KeyType) {
    self.close_segment(at);
    self.state = to;
    self.segment_start = at;
    self.segment_zone_name = self.zone_name_for(to);
    if to == KeyType::Emergencia {
      self.dwell.reset();
    }
  }

  /// Close the current segment at `end`; zero-length segments are dropped so
  /// the timeline stays contiguous without degenerate entries.
  fn close_segment(&mut self, end: DateTime<Utc>) {
    if end <= self.segment_start {
      return;
    }
    self.push_segment(end);
  }

  fn finish(&mut self, end: DateTime<Utc>) {
    // The final segment closes at the session's last sample, even when it is
    // zero-length (single-instant session).
    if end > self.segment_start || self.segments.is_empty() {
      self.push_segment(end.max(self.segment_start));
    }
  }

  fn push_segment(&mut self, end: DateTime<Utc>) {
    let duration_secs = (end - self.segment_start).num_milliseconds() as f64 / 1000.0;
    self.segments.push(KeySegment {
      session_id: self.session_id.to_string(),
      key: self.state,
      code: self.state.code(),
      start_time: self.segment_start.to_rfc3339(),
      end_time: end.to_rfc3339(),
      duration_secs,
      geofence_name: self.segment_zone_name.clone(),
    });
  }

  fn zone_name_for(&self, state: KeyType) -> Option<String> {
    match state {
      KeyType::Taller | KeyType::Parque => self.zone.as_ref().map(|z| z.name.clone()),
      _ => None,
    }
  }
}
