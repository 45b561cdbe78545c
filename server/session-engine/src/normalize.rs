//! Normalize an inbound session into canonical, timestamp-sorted streams.
//!
//! Per-sample problems (bad timestamps, NaN values) are skipped and counted;
//! only missing identity aborts the session.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::types::*;

/// Canonical session data plus normalization counters.
#[derive(Debug, Clone)]
pub struct SessionData {
  pub session_id: String,
  pub vehicle_id: String,
  pub positions: Vec<PositionSample>,
  pub stability: Vec<StabilitySample>,
  pub beacon: Vec<BeaconSample>,
  pub malformed_samples: u64,
  pub resorted_streams: u64,
  pub position_gaps: u64,
}

pub fn normalize(raw: &InboundSession, config: &Config) -> Result<SessionData, EngineError> {
  if raw.session_id.trim().is_empty() {
    return Err(EngineError::MissingIdentity("session_id"));
  }
  if raw.vehicle_id.trim().is_empty() {
    return Err(EngineError::MissingIdentity("vehicle_id"));
  }

  let mut malformed: u64 = 0;
  let mut resorted: u64 = 0;

  let mut positions: Vec<PositionSample> = raw
    .positions
    .iter()
    .filter_map(|p| {
      let timestamp = parse_ts(&p.timestamp, &mut malformed)?;
      if !p.lat.is_finite() || !p.lon.is_finite() || p.lat.abs() > 90.0 || p.lon.abs() > 180.0 {
        debug!(session = %raw.session_id, "skipping position with invalid coordinates");
        malformed += 1;
        return None;
      }
      Some(PositionSample {
        timestamp,
        lat: p.lat,
        lon: p.lon,
        speed: p.speed.filter(|s| s.is_finite() && *s >= 0.0).unwrap_or(0.0),
        fix_quality: p.fix_quality.unwrap_or(0),
      })
    })
    .collect();

  let mut stability: Vec<StabilitySample> = raw
    .stability
    .iter()
    .filter_map(|s| {
      let timestamp = parse_ts(&s.timestamp, &mut malformed)?;
      let fields = [
        s.roll,
        s.pitch,
        s.yaw,
        s.accel_x,
        s.accel_y,
        s.accel_z,
        s.stability_index,
      ];
      if fields.iter().any(|v| !v.is_finite()) {
        debug!(session = %raw.session_id, "skipping stability sample with non-finite values");
        malformed += 1;
        return None;
      }
      Some(StabilitySample {
        timestamp,
        roll: s.roll,
        pitch: s.pitch,
        yaw: s.yaw,
        accel_x: s.accel_x,
        accel_y: s.accel_y,
        accel_z: s.accel_z,
        stability_index: s.stability_index.clamp(0.0, 1.0),
      })
    })
    .collect();

  let mut beacon: Vec<BeaconSample> = raw
    .beacon
    .iter()
    .filter_map(|b| {
      let timestamp = parse_ts(&b.timestamp, &mut malformed)?;
      Some(BeaconSample {
        timestamp,
        active: b.active,
      })
    })
    .collect();

  resorted += ensure_sorted(&mut positions, |p| p.timestamp, "positions", &raw.session_id);
  resorted += ensure_sorted(&mut stability, |s| s.timestamp, "stability", &raw.session_id);
  resorted += ensure_sorted(&mut beacon, |b| b.timestamp, "beacon", &raw.session_id);

  let gap = Duration::seconds(config.gap_flag_secs);
  let position_gaps = positions
    .windows(2)
    .filter(|w| w[1].timestamp - w[0].timestamp > gap)
    .count() as u64;
  if position_gaps > 0 {
    warn!(
      session = %raw.session_id,
      gaps = position_gaps,
      "position stream has long no-signal gaps"
    );
  }

  for (name, empty) in [
    ("positions", positions.is_empty()),
    ("stability", stability.is_empty()),
    ("beacon", beacon.is_empty()),
  ] {
    if empty {
      warn!(session = %raw.session_id, stream = name, "stream is empty; results will be partial");
    }
  }

  Ok(SessionData {
    session_id: raw.session_id.clone(),
    vehicle_id: raw.vehicle_id.clone(),
    positions,
    stability,
    beacon,
    malformed_samples: malformed,
    resorted_streams: resorted,
    position_gaps,
  })
}

fn parse_ts(s: &str, malformed: &mut u64) -> Option<DateTime<Utc>> {
  match DateTime::parse_from_rfc3339(s) {
    Ok(dt) => Some(dt.with_timezone(&Utc)),
    Err(_) => {
      *malformed += 1;
      None
    }
  }
}

/// Re-sort a stream if it is not monotonic; returns 1 if a resort happened.
fn ensure_sorted<T, F>(items: &mut [T], key: F, stream: &str, session: &str) -> u64
where
  F: Fn(&T) -> DateTime<Utc>,
{
  if items.windows(2).all(|w| key(&w[0]) <= key(&w[1])) {
    return 0;
  }
  warn!(session = %session, stream = %stream, "non-monotonic timestamps; re-sorting");
  items.sort_by_key(|item| key(item));
  1
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_session() -> InboundSession {
    serde_json::from_str(
      r#"{
        "session_id": "s1",
        "vehicle_id": "v1",
        "positions": [
          {"timestamp": "2025-03-10T09:00:00Z", "lat": 40.0, "lon": -3.0},
          {"timestamp": "2025-03-10T09:01:00Z", "lat": 40.01, "lon": -3.0}
        ],
        "stability": [
          {"timestamp": "2025-03-10T09:00:00Z", "roll": 1.0, "pitch": 0.5, "yaw": 90.0,
           "accel_x": 0.1, "accel_y": 0.2, "accel_z": 0.0, "stability_index": 0.9}
        ],
        "beacon": [
          {"timestamp": "2025-03-10T09:00:00Z", "active": false}
        ]
      }"#,
    )
    .unwrap()
  }

  #[test]
  fn valid_session_normalizes_cleanly() {
    let data = normalize(&base_session(), &Config::default()).unwrap();
    assert_eq!(data.positions.len(), 2);
    assert_eq!(data.stability.len(), 1);
    assert_eq!(data.malformed_samples, 0);
    assert_eq!(data.resorted_streams, 0);
  }

  #[test]
  fn missing_session_id_is_fatal() {
    let mut raw = base_session();
    raw.session_id = "  ".into();
    let err = normalize(&raw, &Config::default()).unwrap_err();
    assert!(err.to_string().contains("session_id"));
  }

  #[test]
  fn missing_vehicle_id_is_fatal() {
    let mut raw = base_session();
    raw.vehicle_id = "".into();
    let err = normalize(&raw, &Config::default()).unwrap_err();
    assert!(err.to_string().contains("vehicle_id"));
  }

  #[test]
  fn bad_timestamp_and_nan_are_skipped_and_counted() {
    let mut raw = base_session();
    raw.positions[0].timestamp = "not-a-date".into();
    raw.stability[0].roll = f64::NAN;
    let data = normalize(&raw, &Config::default()).unwrap();
    assert_eq!(data.positions.len(), 1);
    assert!(data.stability.is_empty());
    assert_eq!(data.malformed_samples, 2);
  }

  #[test]
  fn out_of_range_coordinates_are_skipped() {
    let mut raw = base_session();
    raw.positions[0].lat = 120.0;
    let data = normalize(&raw, &Config::default()).unwrap();
    assert_eq!(data.positions.len(), 1);
    assert_eq!(data.malformed_samples, 1);
  }

  #[test]
  fn out_of_order_stream_is_resorted() {
    let mut raw = base_session();
    raw.positions.swap(0, 1);
    let data = normalize(&raw, &Config::default()).unwrap();
    assert_eq!(data.resorted_streams, 1);
    assert!(data.positions[0].timestamp < data.positions[1].timestamp);
  }

  #[test]
  fn long_position_gap_is_flagged() {
    let mut raw = base_session();
    raw.positions[1].timestamp = "2025-03-10T09:20:00Z".into();
    let data = normalize(&raw, &Config::default()).unwrap();
    assert_eq!(data.position_gaps, 1);
  }

  #[test]
  fn empty_streams_are_not_an_error() {
    let raw: InboundSession = serde_json::from_str(
      r#"{"session_id": "s1", "vehicle_id": "v1"}"#,
    )
    .unwrap();
    let data = normalize(&raw, &Config::default()).unwrap();
    assert!(data.positions.is_empty());
    assert!(data.beacon.is_empty());
  }
}
