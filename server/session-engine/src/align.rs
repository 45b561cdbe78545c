//! Stream alignment: match an arbitrary timestamp to the position stream.
//!
//! Pure function over its inputs. Callers must treat `None` as "location
//! unknown", never as an error.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::types::PositionSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
  High,
  Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
  pub lat: f64,
  pub lon: f64,
  pub interpolated: bool,
  pub confidence: Confidence,
}

/// Locate `t` against a timestamp-sorted position stream.
///
/// - A sample within `align_exact_secs` of `t` is returned directly.
/// - Samples on both sides within `align_interp_secs` are linearly
///   interpolated by elapsed-time fraction.
/// - One side only: nearest sample with low confidence.
/// - Total gap: `None`.
pub fn locate(t: DateTime<Utc>, positions: &[PositionSample], config: &Config) -> Option<Location> {
  if positions.is_empty() {
    return None;
  }

  let exact = Duration::seconds(config.align_exact_secs);
  let wide = Duration::seconds(config.align_interp_secs);

  // First sample strictly after t; everything before idx is <= t.
  let idx = positions.partition_point(|p| p.timestamp <= t);
  let before = idx.checked_sub(1).map(|i| &positions[i]);
  let after = positions.get(idx);

  let gap_before = before.map(|p| t - p.timestamp);
  let gap_after = after.map(|p| p.timestamp - t);

  // Direct hit: nearest sample within the exact tolerance.
  let nearest = match (before, after) {
    (Some(b), Some(a)) => {
      if gap_before.unwrap() <= gap_after.unwrap() {
        Some((b, gap_before.unwrap()))
      } else {
        Some((a, gap_after.unwrap()))
      }
    }
    (Some(b), None) => Some((b, gap_before.unwrap())),
    (None, Some(a)) => Some((a, gap_after.unwrap())),
    (None, None) => None,
  };
  if let Some((sample, gap)) = nearest {
    if gap <= exact {
      return Some(Location {
        lat: sample.lat,
        lon: sample.lon,
        interpolated: false,
        confidence: Confidence::High,
      });
    }
  }

  let before_in_range = matches!(gap_before, Some(g) if g <= wide);
  let after_in_range = matches!(gap_after, Some(g) if g <= wide);

  match (before_in_range, after_in_range) {
    (true, true) => {
      let b = before.unwrap();
      let a = after.unwrap();
      let span = (a.timestamp - b.timestamp).num_milliseconds();
      if span <= 0 {
        return Some(Location {
          lat: b.lat,
          lon: b.lon,
          interpolated: false,
          confidence: Confidence::High,
        });
      }
      let frac = (t - b.timestamp).num_milliseconds() as f64 / span as f64;
      Some(Location {
        lat: b.lat + (a.lat - b.lat) * frac,
        lon: b.lon + (a.lon - b.lon) * frac,
        interpolated: true,
        confidence: Confidence::High,
      })
    }
    (true, false) => {
      let b = before.unwrap();
      Some(Location {
        lat: b.lat,
        lon: b.lon,
        interpolated: false,
        confidence: Confidence::Low,
      })
    }
    (false, true) => {
      let a = after.unwrap();
      Some(Location {
        lat: a.lat,
        lon: a.lon,
        interpolated: false,
        confidence: Confidence::Low,
      })
    }
    // Total signal gap spanning t.
    (false, false) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, min, sec).unwrap()
  }

  fn pos(min: u32, sec: u32, lat: f64, lon: f64) -> PositionSample {
    PositionSample {
      timestamp: ts(min, sec),
      lat,
      lon,
      speed: 0.0,
      fix_quality: 1,
    }
  }

  #[test]
  fn direct_hit_within_exact_tolerance() {
    let config = Config::default();
    let positions = vec![pos(0, 0, 40.0, -3.0), pos(1, 0, 40.1, -3.1)];
    let loc = locate(ts(0, 20), &positions, &config).unwrap();
    assert_eq!(loc.lat, 40.0);
    assert!(!loc.interpolated);
    assert_eq!(loc.confidence, Confidence::High);
  }

  #[test]
  fn interpolates_between_sides() {
    let config = Config::default();
    let positions = vec![pos(0, 0, 40.0, -3.0), pos(4, 0, 40.4, -3.4)];
    // Halfway in time -> halfway in space.
    let loc = locate(ts(2, 0), &positions, &config).unwrap();
    assert!(loc.interpolated);
    assert!((loc.lat - 40.2).abs() < 1e-9);
    assert!((loc.lon - -3.2).abs() < 1e-9);
  }

  #[test]
  fn one_sided_returns_low_confidence() {
    let config = Config::default();
    let positions = vec![pos(0, 0, 40.0, -3.0)];
    let loc = locate(ts(3, 0), &positions, &config).unwrap();
    assert_eq!(loc.lat, 40.0);
    assert!(!loc.interpolated);
    assert_eq!(loc.confidence, Confidence::Low);
  }

  #[test]
  fn total_gap_returns_none() {
    let config = Config::default();
    // Samples 10 minutes apart; query sits > 5 min from both.
    let positions = vec![pos(0, 0, 40.0, -3.0), pos(20, 0, 40.2, -3.2)];
    assert!(locate(ts(10, 0), &positions, &config).is_none());
  }

  #[test]
  fn empty_stream_returns_none() {
    let config = Config::default();
    assert!(locate(ts(0, 0), &[], &config).is_none());
  }

  #[test]
  fn nearest_side_wins_direct_hit() {
    let config = Config::default();
    let positions = vec![pos(0, 0, 40.0, -3.0), pos(0, 40, 40.5, -3.5)];
    // 25 s from the first, 15 s from the second: second wins.
    let loc = locate(ts(0, 25), &positions, &config).unwrap();
    assert_eq!(loc.lat, 40.5);
  }
}
