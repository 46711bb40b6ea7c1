use crate::models::MatchProposal;
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur while delivering a proposal
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Receiver closed")]
    Closed,

    #[error("Proposal rejected: {0}")]
    Rejected(String),
}

/// Accepts proposals one at a time, in emission order
pub trait ProposalSink: Send {
    fn send(
        &mut self,
        proposal: MatchProposal,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Forwards proposals over a bounded channel
///
/// A full channel makes `send` wait, which is how a slow consumer applies
/// backpressure. A dropped receiver fails the send.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<MatchProposal>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<MatchProposal>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MatchProposal>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl ProposalSink for ChannelSink {
    async fn send(&mut self, proposal: MatchProposal) -> Result<(), SinkError> {
        self.tx.send(proposal).await.map_err(|_| SinkError::Closed)
    }
}

impl ProposalSink for Vec<MatchProposal> {
    async fn send(&mut self, proposal: MatchProposal) -> Result<(), SinkError> {
        self.push(proposal);
        Ok(())
    }
}
