//! Fleet Hotspot Clustering Engine — deterministic batch stage.
//!
//! Consumes a snapshot of stability incidents accumulated across many
//! sessions and groups the located ones into spatial "black point" clusters
//! by great-circle distance with transitive chain merging. Incident sets only
//! grow between passes, so the stage can be re-run at any time.
//!
//! No DB, no network; pure computation + in-memory state.

pub mod cluster;
pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use cluster::{cluster, normalize};
pub use config::Config;
pub use error::EngineError;
pub use types::{ClusterReport, InboundIncident};
