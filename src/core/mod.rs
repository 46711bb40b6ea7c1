// Core engine exports
pub mod candidate;
pub mod coordinator;
pub mod error;
pub mod id;
pub mod pair_assembler;
pub mod proposal;
pub mod scoring;
pub mod team_builder;

pub use candidate::MatchCandidate;
pub use coordinator::{EngineDefaults, MatchFunction, RunState, RunSummary};
pub use error::{EngineError, ScoreError};
pub use id::{IdAllocator, SequentialIds, SnowflakeIds};
pub use pair_assembler::{PairAssembler, PoolState};
pub use proposal::ProposalBuilder;
pub use scoring::compute_quality;
pub use team_builder::TeamBuilder;
