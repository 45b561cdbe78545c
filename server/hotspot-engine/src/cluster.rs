//! Density-based incident clustering with a geographic metric.
//!
//! Two located incidents are neighbors when their great-circle distance is
//! within `eps_m`; clusters are the transitive closure of that relation
//! (chain merging), so every located incident lands in exactly one cluster.

use crate::config::Config;
use crate::error::EngineError;
use crate::geo::haversine_m;
use crate::types::*;

/// Validate one inbound incident into a canonical record.
pub fn normalize(raw: &InboundIncident) -> Result<IncidentRecord, EngineError> {
  if raw.id.is_empty() {
    return Err(EngineError::validation("id", "must not be empty"));
  }
  if raw.session_id.is_empty() {
    return Err(EngineError::validation("session_id", "must not be empty"));
  }
  let severity = Severity::from_str_loose(&raw.severity)
    .ok_or_else(|| EngineError::validation("severity", "expected light|moderate|critical"))?;
  let location = match &raw.location {
    Some(loc) => {
      if !loc.lat.is_finite() || !loc.lon.is_finite() || loc.lat.abs() > 90.0 || loc.lon.abs() > 180.0
      {
        return Err(EngineError::validation("location", "invalid coordinates"));
      }
      Some((loc.lat, loc.lon))
    }
    None => None,
  };
  Ok(IncidentRecord {
    id: raw.id.clone(),
    severity,
    location,
  })
}

/// Cluster a snapshot of incidents across many sessions.
pub fn cluster(incidents: &[IncidentRecord], config: &Config) -> ClusterReport {
  let located: Vec<&IncidentRecord> = incidents.iter().filter(|i| i.location.is_some()).collect();
  let unlocated_count = incidents.len() - located.len();

  // Union-find over located incidents; chain merging via pairwise unions.
  let mut parent: Vec<usize> = (0..located.len()).collect();
  for i in 0..located.len() {
    for j in (i + 1)..located.len() {
      let (lat_i, lon_i) = located[i].location.unwrap();
      let (lat_j, lon_j) = located[j].location.unwrap();
      if haversine_m(lat_i, lon_i, lat_j, lon_j) <= config.eps_m {
        union(&mut parent, i, j);
      }
    }
  }

  let mut groups: Vec<Vec<usize>> = vec![Vec::new(); located.len()];
  for i in 0..located.len() {
    let root = find(&mut parent, i);
    groups[root].push(i);
  }

  let mut clusters: Vec<IncidentCluster> = groups
    .into_iter()
    .filter(|members| members.len() >= config.min_points.max(1))
    .map(|members| build_cluster(&located, &members))
    .collect();

  // Deterministic report order: biggest hotspots first, then by first member.
  clusters.sort_by(|a, b| {
    b.frequency
      .cmp(&a.frequency)
      .then_with(|| a.member_ids[0].cmp(&b.member_ids[0]))
  });

  ClusterReport {
    clusters,
    located_count: located.len(),
    unlocated_count,
  }
}

fn build_cluster(located: &[&IncidentRecord], members: &[usize]) -> IncidentCluster {
  let n = members.len() as f64;
  let (sum_lat, sum_lon) = members.iter().fold((0.0, 0.0), |(la, lo), &i| {
    let (lat, lon) = located[i].location.unwrap();
    (la + lat, lo + lon)
  });
  let centroid = Centroid {
    lat: sum_lat / n,
    lon: sum_lon / n,
  };

  let radius_m = members
    .iter()
    .map(|&i| {
      let (lat, lon) = located[i].location.unwrap();
      haversine_m(lat, lon, centroid.lat, centroid.lon)
    })
    .fold(0.0, f64::max);

  // Majority vote; ties break toward the more severe category.
  let mut votes = [0usize; 3];
  for &i in members {
    votes[located[i].severity as usize] += 1;
  }
  let mut dominant = Severity::Light;
  let mut best = 0usize;
  for severity in [Severity::Light, Severity::Moderate, Severity::Critical] {
    let count = votes[severity as usize];
    if count >= best && count > 0 {
      best = count;
      dominant = severity;
    }
  }

  let mut member_ids: Vec<String> = members.iter().map(|&i| located[i].id.clone()).collect();
  member_ids.sort();

  IncidentCluster {
    cluster_id: cluster_id(&member_ids),
    centroid,
    radius_m,
    frequency: members.len(),
    dominant_severity: dominant,
    member_ids,
  }
}

/// Stable cluster ID: hash of the sorted member IDs.
fn cluster_id(member_ids: &[String]) -> String {
  let mut hasher = blake3::Hasher::new();
  for id in member_ids {
    hasher.update(id.as_bytes());
    hasher.update(b"|");
  }
  let hex = hasher.finalize().to_hex();
  format!("hot-{}", &hex[..16])
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
  while parent[i] != i {
    parent[i] = parent[parent[i]];
    i = parent[i];
  }
  i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
  let ra = find(parent, a);
  let rb = find(parent, b);
  if ra != rb {
    parent[rb.max(ra)] = rb.min(ra);
  }
}
