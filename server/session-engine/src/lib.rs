//! Fleet Session Classification Engine — deterministic, rule-based.
//!
//! Ingests one recorded vehicle session (unsynchronized position, stability,
//! and beacon streams), aligns the streams, detects discrete stability
//! incidents, and derives the operational key timeline (taller/parque/
//! emergencia/incendio/regreso) with a rolling dwell-window on-scene check.
//!
//! No DB, no network; pure computation + in-memory state. Sessions are
//! independent: the engine holds no cross-session state, so callers may
//! process many sessions concurrently.

pub mod align;
pub mod config;
pub mod detect;
pub mod dwell;
pub mod engine;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod keys;
pub mod normalize;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use geofence::{GeofenceIndex, InMemoryGeofenceIndex};
pub use types::{InboundSession, SessionSummary};
