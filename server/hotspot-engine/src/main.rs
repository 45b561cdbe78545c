//! Binary entrypoint: read incident JSON lines from stdin, emit one
//! ClusterReport JSON line at end of input.
//!
//! Invalid lines produce ErrorOutput lines immediately and are skipped; the
//! batch still runs over every valid incident.

use hotspot_engine::types::{ErrorOutput, IncidentRecord};
use hotspot_engine::{Config, InboundIncident};
use std::io::{self, BufRead, Write};

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let mut incidents: Vec<IncidentRecord> = Vec::new();

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        let _ = writeln!(io::stderr(), "hotspot-engine: read error: {}", e);
        std::process::exit(1);
      }
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let raw: InboundIncident = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
        continue;
      }
    };

    match hotspot_engine::normalize(&raw) {
      Ok(record) => incidents.push(record),
      Err(e) => {
        let err = match &e {
          hotspot_engine::EngineError::Validation { field, reason } => {
            ErrorOutput::new(reason.clone()).with_field(field.clone())
          }
          _ => ErrorOutput::new(e.to_string()),
        };
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
      }
    }
  }

  let report = hotspot_engine::cluster(&incidents, &Config::default());
  tracing::info!(
    clusters = report.clusters.len(),
    located = report.located_count,
    unlocated = report.unlocated_count,
    "clustering pass complete"
  );
  let _ = serde_json::to_writer(&mut out, &report);
  let _ = writeln!(out);
  let _ = out.flush();
}
