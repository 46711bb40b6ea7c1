// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AssemblyStrategy, DoubleRangeFilter, EvaluationCriteria, Extension, MatchProfile, MatchProposal,
    MissingAttribute, Pool, PoolTickets, ScoringPolicy, SearchFields, StringEqualsFilter, TeamScope,
    Ticket,
};
pub use requests::RunRequest;
pub use responses::{ErrorResponse, HealthResponse, RunResponse};
