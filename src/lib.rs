//! MMF Algo - match function service
//!
//! This library groups pooled matchmaking tickets into scored match proposals.
//! Two assembly strategies are provided: role-unique fixed-size teams, and
//! cross-pool draws of the lowest-skill tickets per cycle.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{EngineDefaults, EngineError, MatchFunction, RunSummary, SnowflakeIds, compute_quality};
pub use self::models::{AssemblyStrategy, MatchProfile, MatchProposal, Pool, Ticket};
