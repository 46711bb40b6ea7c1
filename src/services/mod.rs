// Service exports
pub mod query;
pub mod sink;

pub use query::{matches_pool, HttpPoolQuery, InMemoryTicketStore, PoolQuery, QueryError};
pub use sink::{ChannelSink, ProposalSink, SinkError};
