//! Clustering configuration with sane defaults.

/// Tunable parameters for hotspot clustering.
#[derive(Debug, Clone)]
pub struct Config {
  /// Neighborhood radius in meters (true physical distance, not planar).
  pub eps_m: f64,
  /// Minimum members for a cluster to appear in the hotspot report. The
  /// partition over located incidents is always total; this only filters
  /// what gets reported.
  pub min_points: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      eps_m: 25.0,
      min_points: 1,
    }
  }
}
