//! Engine configuration with sane defaults.
//!
//! The numeric thresholds are field-calibration parameters; defaults here are
//! starting points, not validated ground truth.

/// Severity band boundaries on a trigger's intensity ratio
/// (observed magnitude / trigger threshold, so 1.0 is the trigger boundary).
#[derive(Debug, Clone, Copy)]
pub struct SeverityBands {
  /// At or above this ratio the incident is at least moderate.
  pub moderate: f64,
  /// At or above this ratio the incident is critical.
  pub critical: f64,
}

/// Tunable thresholds for stream alignment, incident detection, and the
/// operational key state machine.
#[derive(Debug, Clone)]
pub struct Config {
  /// Max seconds between a query time and a position sample to use it directly.
  pub align_exact_secs: i64,
  /// Max seconds to either side for interpolation / one-sided nearest.
  pub align_interp_secs: i64,

  /// Roll magnitude (degrees) that triggers rollover risk.
  pub roll_threshold_deg: f64,
  /// Stability index below which rollover risk triggers regardless of roll.
  pub stability_index_critical: f64,
  /// Lateral acceleration magnitude (m/s^2) that arms drift detection.
  pub lateral_accel_threshold: f64,
  /// Yaw rate (deg/s) that must be sustained for drift detection.
  pub yaw_rate_threshold: f64,
  /// Consecutive samples the yaw-rate condition must hold.
  pub drift_sustain_samples: usize,
  /// Combined acceleration magnitude (m/s^2) for an abrupt-maneuver spike.
  pub accel_spike_threshold: f64,
  /// Cool-down per incident kind: one continuous event emits one incident.
  pub debounce_secs: i64,

  pub rollover_bands: SeverityBands,
  pub drift_bands: SeverityBands,
  pub maneuver_bands: SeverityBands,

  /// Length of the rolling on-scene confirmation window (seconds).
  pub dwell_window_secs: i64,
  /// Max distance (meters) from the window centroid for "on scene".
  pub dwell_radius_m: f64,

  /// Position gaps longer than this (seconds) are flagged in diagnostics.
  pub gap_flag_secs: i64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      align_exact_secs: 30,
      align_interp_secs: 300,
      roll_threshold_deg: 30.0,
      stability_index_critical: 0.25,
      lateral_accel_threshold: 4.0,
      yaw_rate_threshold: 15.0,
      drift_sustain_samples: 3,
      accel_spike_threshold: 6.0,
      debounce_secs: 10,
      rollover_bands: SeverityBands {
        moderate: 1.3,
        critical: 1.6,
      },
      drift_bands: SeverityBands {
        moderate: 1.4,
        critical: 1.8,
      },
      maneuver_bands: SeverityBands {
        moderate: 1.3,
        critical: 1.7,
      },
      dwell_window_secs: 300,
      dwell_radius_m: 50.0,
      gap_flag_secs: 300,
    }
  }
}
