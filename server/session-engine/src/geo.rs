//! Geographic distance helpers.

/// Great-circle distance in meters (haversine, mean Earth radius).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  let r = 6_371_000.0_f64;
  let dlat = (lat2 - lat1).to_radians();
  let dlon = (lon2 - lon1).to_radians();
  let a = (dlat / 2.0).sin().powi(2)
    + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
  r * c
}
