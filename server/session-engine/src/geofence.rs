//! Geofence lookup: an injected, read-only capability.
//!
//! Zone *definitions* are owned externally; the engine only ever asks "which
//! zone contains this point". Any spatial backend can implement the trait;
//! `InMemoryGeofenceIndex` is the concrete store built from inline CLI input.

use crate::error::EngineError;
use crate::geo::haversine_m;
use crate::types::{InboundGeofence, InboundShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceKind {
  Park,
  Workshop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceHit {
  pub kind: GeofenceKind,
  pub name: String,
}

/// Synchronous point-in-zone membership query. Pure lookup, safe to share
/// across concurrently processed sessions.
pub trait GeofenceIndex: Sync {
  fn classify(&self, lat: f64, lon: f64) -> Option<GeofenceHit>;
}

#[derive(Debug, Clone)]
enum Shape {
  Circle { lat: f64, lon: f64, radius_m: f64 },
  Polygon { vertices: Vec<(f64, f64)> },
}

#[derive(Debug, Clone)]
struct Zone {
  kind: GeofenceKind,
  name: String,
  shape: Shape,
}

/// In-memory polygon/circle store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeofenceIndex {
  zones: Vec<Zone>,
}

impl InMemoryGeofenceIndex {
  pub fn from_inbound(defs: &[InboundGeofence]) -> Result<Self, EngineError> {
    let mut zones = Vec::with_capacity(defs.len());
    for def in defs {
      let kind = match def.kind.to_ascii_lowercase().as_str() {
        "park" => GeofenceKind::Park,
        "workshop" => GeofenceKind::Workshop,
        other => {
          return Err(EngineError::validation(
            "geofences[].kind",
            &format!("expected park|workshop, got {:?}", other),
          ))
        }
      };
      let shape = match &def.shape {
        InboundShape::Circle { lat, lon, radius_m } => {
          if *radius_m <= 0.0 || !radius_m.is_finite() {
            return Err(EngineError::validation(
              "geofences[].shape.radius_m",
              "must be a positive number",
            ));
          }
          Shape::Circle {
            lat: *lat,
            lon: *lon,
            radius_m: *radius_m,
          }
        }
        InboundShape::Polygon { vertices } => {
          if vertices.len() < 3 {
            return Err(EngineError::validation(
              "geofences[].shape.vertices",
              "polygon needs at least 3 vertices",
            ));
          }
          Shape::Polygon {
            vertices: vertices.iter().map(|v| (v[0], v[1])).collect(),
          }
        }
      };
      zones.push(Zone {
        kind,
        name: def.name.clone(),
        shape,
      });
    }
    Ok(Self { zones })
  }
}

impl GeofenceIndex for InMemoryGeofenceIndex {
  fn classify(&self, lat: f64, lon: f64) -> Option<GeofenceHit> {
    self
      .zones
      .iter()
      .find(|z| match &z.shape {
        Shape::Circle {
          lat: clat,
          lon: clon,
          radius_m,
        } => haversine_m(lat, lon, *clat, *clon) <= *radius_m,
        Shape::Polygon { vertices } => point_in_polygon(lat, lon, vertices),
      })
      .map(|z| GeofenceHit {
        kind: z.kind,
        name: z.name.clone(),
      })
  }
}

/// Even-odd ray casting over (lat, lon) vertices. Zones are small enough that
/// treating coordinates as planar is fine for membership.
fn point_in_polygon(lat: f64, lon: f64, vertices: &[(f64, f64)]) -> bool {
  let mut inside = false;
  let mut j = vertices.len() - 1;
  for i in 0..vertices.len() {
    let (lat_i, lon_i) = vertices[i];
    let (lat_j, lon_j) = vertices[j];
    if ((lon_i > lon) != (lon_j > lon))
      && lat < (lat_j - lat_i) * (lon - lon_i) / (lon_j - lon_i) + lat_i
    {
      inside = !inside;
    }
    j = i;
  }
  inside
}
