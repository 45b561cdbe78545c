//! Rolling dwell window for on-scene confirmation.
//!
//! While dispatched, the machine feeds every position fix into this window.
//! If the vehicle stays within `radius_m` of the window's running centroid
//! for a full `window_secs`, the dwell is confirmed as of the window start.
//! Any breach resets the window to the breaching sample.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::geo::haversine_m;

#[derive(Debug, Clone, Copy)]
struct Entry {
  timestamp: DateTime<Utc>,
  lat: f64,
  lon: f64,
}

#[derive(Debug, Clone)]
pub struct DwellWindow {
  window: Duration,
  radius_m: f64,
  entries: VecDeque<Entry>,
  sum_lat: f64,
  sum_lon: f64,
}

impl DwellWindow {
  pub fn new(window_secs: i64, radius_m: f64) -> Self {
    Self {
      window: Duration::seconds(window_secs),
      radius_m,
      entries: VecDeque::new(),
      sum_lat: 0.0,
      sum_lon: 0.0,
    }
  }

  pub fn reset(&mut self) {
    self.entries.clear();
    self.sum_lat = 0.0;
    self.sum_lon = 0.0;
  }

  /// Feed one position fix. Returns the window start when the dwell is
  /// confirmed (a full window elapsed with every fix inside the radius).
  pub fn push(&mut self, timestamp: DateTime<Utc>, lat: f64, lon: f64) -> Option<DateTime<Utc>> {
    self.add(Entry {
      timestamp,
      lat,
      lon,
    });

    let n = self.entries.len() as f64;
    let clat = self.sum_lat / n;
    let clon = self.sum_lon / n;
    let breached = self
      .entries
      .iter()
      .any(|e| haversine_m(e.lat, e.lon, clat, clon) > self.radius_m);
    if breached {
      self.reset();
      self.add(Entry {
        timestamp,
        lat,
        lon,
      });
      return None;
    }

    let start = self.entries.front()?.timestamp;
    if timestamp - start >= self.window {
      Some(start)
    } else {
      None
    }
  }

  fn add(&mut self, e: Entry) {
    self.sum_lat += e.lat;
    self.sum_lon += e.lon;
    self.entries.push_back(e);
  }
}
