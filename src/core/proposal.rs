use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::core::candidate::MatchCandidate;
use crate::core::error::EngineError;
use crate::core::id::IdAllocator;
use crate::core::scoring::compute_quality;
use crate::models::{EvaluationCriteria, MatchProposal, MissingAttribute};

/// Coarse, human-legible timestamp used inside match ids, to the centisecond
fn match_id_time(now: &DateTime<Utc>) -> String {
    format!(
        "{}.{:02}",
        now.format("%Y-%m-%dT%H:%M:%S"),
        now.timestamp_subsec_millis().min(999) / 10
    )
}

/// Turns completed candidates into scored, identified proposals
#[derive(Clone)]
pub struct ProposalBuilder {
    ids: Arc<dyn IdAllocator>,
    quality_attribute: String,
    missing: MissingAttribute,
}

impl std::fmt::Debug for ProposalBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposalBuilder")
            .field("quality_attribute", &self.quality_attribute)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

impl ProposalBuilder {
    pub fn new(
        ids: Arc<dyn IdAllocator>,
        quality_attribute: impl Into<String>,
        missing: MissingAttribute,
    ) -> Self {
        Self {
            ids,
            quality_attribute: quality_attribute.into(),
            missing,
        }
    }

    /// Score `candidate` and wrap it into a proposal
    ///
    /// The id is `profile-{label}-time-{timestamp}-{unique}` where `label` is
    /// the pool the team completed in, or `profile` when there is none.
    /// Scoring runs before an id is drawn, so a failed candidate consumes none.
    pub fn finalize(
        &self,
        candidate: MatchCandidate,
        profile: &str,
        function: &str,
    ) -> Result<MatchProposal, EngineError> {
        self.finalize_at(candidate, profile, function, Utc::now())
    }

    pub fn finalize_at(
        &self,
        candidate: MatchCandidate,
        profile: &str,
        function: &str,
        now: DateTime<Utc>,
    ) -> Result<MatchProposal, EngineError> {
        let score = compute_quality(candidate.tickets(), &self.quality_attribute, self.missing)?;
        let evaluation = EvaluationCriteria { score }.pack()?;

        let label = candidate.completed_in().unwrap_or(profile).to_string();
        let match_id = format!(
            "profile-{}-time-{}-{}",
            label,
            match_id_time(&now),
            self.ids.next_id()
        );

        let mut extensions = BTreeMap::new();
        extensions.insert(EvaluationCriteria::EXTENSION_KEY.to_string(), evaluation);

        Ok(MatchProposal {
            match_id,
            match_profile: profile.to_string(),
            match_function: function.to_string(),
            tickets: candidate.into_tickets(),
            extensions,
        })
    }
}
