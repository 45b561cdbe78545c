//! Binary entrypoint: read JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is an InboundSession (with inline geofence definitions).
//! Output lines are either:
//! - A SessionSummary (segments + incidents + diagnostics)
//! - An ErrorOutput (when input validation fails)
//!
//! Diagnostics and warnings go to stderr via tracing so stdout stays a pure
//! JSON stream.

use session_engine::types::ErrorOutput;
use session_engine::{Engine, InboundSession, InMemoryGeofenceIndex};
use std::io::{self, BufRead, Write};

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let engine = Engine::with_defaults();

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        let _ = writeln!(io::stderr(), "session-engine: read error: {}", e);
        std::process::exit(1);
      }
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    // Parse inbound session.
    let raw: InboundSession = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
        continue;
      }
    };

    // Build the per-session geofence index from the inline definitions.
    let index = match InMemoryGeofenceIndex::from_inbound(&raw.geofences) {
      Ok(index) => index,
      Err(e) => {
        let _ = serde_json::to_writer(&mut out, &ErrorOutput::new(e.to_string()));
        let _ = writeln!(out);
        continue;
      }
    };

    // Process through the engine. A failed session is isolated: report the
    // error and keep consuming further sessions.
    match engine.process(&raw, &index) {
      Ok(summary) => {
        let _ = serde_json::to_writer(&mut out, &summary);
        let _ = writeln!(out);
      }
      Err(e) => {
        let err = match &e {
          session_engine::EngineError::Validation { field, reason } => {
            ErrorOutput::new(reason.clone()).with_field(field.clone())
          }
          _ => ErrorOutput::new(e.to_string()),
        };
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
      }
    }
  }

  let _ = out.flush();
}
