use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::core::candidate::MatchCandidate;
use crate::core::error::EngineError;
use crate::core::id::IdAllocator;
use crate::core::pair_assembler::{PairAssembler, PoolState};
use crate::core::proposal::ProposalBuilder;
use crate::core::team_builder::TeamBuilder;
use crate::models::{AssemblyStrategy, MatchProfile, MissingAttribute, ScoringPolicy};
use crate::services::{PoolQuery, ProposalSink};

/// Lifecycle of one run
///
/// `Idle -> Querying -> Assembling -> Emitting(n) -> Done`, or `Failed` from
/// any state on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Querying,
    Assembling,
    Emitting(usize),
    Done,
    Failed,
}

#[inline]
fn enter(state: &mut RunState, next: RunState) {
    tracing::trace!("Run state {:?} -> {:?}", state, next);
    *state = next;
}

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed candidates produced by the builder
    pub candidates: usize,
    /// Proposals delivered to the sink
    pub sent: usize,
    /// Candidates dropped because they could not be scored
    pub dropped: usize,
}

/// Service-wide defaults applied when a profile leaves a knob unset
#[derive(Debug, Clone)]
pub struct EngineDefaults {
    pub function_name: String,
    pub scoring_policy: ScoringPolicy,
    pub missing_attribute: MissingAttribute,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            function_name: "mmf-algo".to_string(),
            scoring_policy: ScoringPolicy::default(),
            missing_attribute: MissingAttribute::default(),
        }
    }
}

/// Profile-resolved builder variant
#[derive(Debug, Clone)]
enum Assembler {
    Team(TeamBuilder),
    CrossPool(PairAssembler),
}

/// Streaming match function
///
/// # Pipeline
/// 1. Validate the profile
/// 2. Query every declared pool (the only await before emission)
/// 3. Assemble candidates with the profile's strategy
/// 4. Score, identify and send each proposal as soon as it is finalized
///
/// A send failure ends the run at once; proposals already sent stay sent.
#[derive(Clone)]
pub struct MatchFunction {
    ids: Arc<dyn IdAllocator>,
    defaults: EngineDefaults,
}

impl std::fmt::Debug for MatchFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchFunction")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl MatchFunction {
    pub fn new(ids: Arc<dyn IdAllocator>, defaults: EngineDefaults) -> Self {
        Self { ids, defaults }
    }

    pub fn defaults(&self) -> &EngineDefaults {
        &self.defaults
    }

    /// Run one profile to completion
    ///
    /// `cancel` is checked before the query, after it, and before every send.
    pub async fn run<Q, S>(
        &self,
        profile: &MatchProfile,
        query: &Q,
        sink: &mut S,
        cancel: Option<&AtomicBool>,
    ) -> Result<RunSummary, EngineError>
    where
        Q: PoolQuery,
        S: ProposalSink,
    {
        let mut state = RunState::Idle;
        let result = self.drive(profile, query, sink, cancel, &mut state).await;

        match &result {
            Ok(summary) => tracing::debug!(
                "Run for profile {} done: sent={}, dropped={}, candidates={}",
                profile.name,
                summary.sent,
                summary.dropped,
                summary.candidates
            ),
            Err(e) => {
                tracing::warn!(
                    "Run for profile {} failed while {:?}: {}",
                    profile.name,
                    state,
                    e
                );
                enter(&mut state, RunState::Failed);
            }
        }

        result
    }

    async fn drive<Q, S>(
        &self,
        profile: &MatchProfile,
        query: &Q,
        sink: &mut S,
        cancel: Option<&AtomicBool>,
        state: &mut RunState,
    ) -> Result<RunSummary, EngineError>
    where
        Q: PoolQuery,
        S: ProposalSink,
    {
        let assembler = resolve_assembler(profile)?;
        let function = profile
            .function_name
            .as_deref()
            .unwrap_or(&self.defaults.function_name);
        let policy = profile.scoring_policy.unwrap_or(self.defaults.scoring_policy);
        let proposals = ProposalBuilder::new(
            Arc::clone(&self.ids),
            profile.quality_attribute.clone(),
            profile.missing_attribute.unwrap_or(self.defaults.missing_attribute),
        );

        check_cancelled(cancel)?;
        enter(state, RunState::Querying);
        tracing::debug!("Generating proposals for profile {}", profile.name);

        let pool_tickets = query.query_pools(&profile.pools).await?;
        check_cancelled(cancel)?;

        enter(state, RunState::Assembling);
        let candidates: Vec<MatchCandidate> = match &assembler {
            Assembler::Team(builder) => builder.build(&pool_tickets, profile.pool_names()),
            Assembler::CrossPool(assembler) => {
                assembler.build(PoolState::new(&pool_tickets, profile.pool_names()))
            }
        };

        let mut summary = RunSummary {
            candidates: candidates.len(),
            ..RunSummary::default()
        };
        tracing::debug!(
            "Profile {} assembled {} candidates",
            profile.name,
            summary.candidates
        );

        enter(state, RunState::Emitting(0));
        for candidate in candidates {
            let proposal = match proposals.finalize(candidate, &profile.name, function) {
                Ok(p) => p,
                Err(EngineError::Scoring(e)) if policy == ScoringPolicy::DropCandidate => {
                    tracing::warn!("Dropping candidate for profile {}: {}", profile.name, e);
                    summary.dropped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            check_cancelled(cancel)?;

            let match_id = proposal.match_id.clone();
            sink.send(proposal).await?;

            summary.sent += 1;
            enter(state, RunState::Emitting(summary.sent));
            tracing::debug!("Sent proposal {}", match_id);
        }

        enter(state, RunState::Done);
        Ok(summary)
    }
}

fn resolve_assembler(profile: &MatchProfile) -> Result<Assembler, EngineError> {
    if profile.name.trim().is_empty() {
        return Err(EngineError::InvalidConfig("profile name must not be empty".to_string()));
    }
    if profile.pools.is_empty() {
        return Err(EngineError::InvalidConfig(format!(
            "profile {} declares no pools",
            profile.name
        )));
    }
    if profile.quality_attribute.trim().is_empty() {
        return Err(EngineError::InvalidConfig(format!(
            "profile {} has no quality attribute",
            profile.name
        )));
    }

    let mut names: Vec<&str> = profile.pool_names().collect();
    names.sort_unstable();
    if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
        return Err(EngineError::InvalidConfig(format!(
            "profile {} declares pool {} twice",
            profile.name, pair[0]
        )));
    }

    match &profile.strategy {
        AssemblyStrategy::Team {
            team_size,
            discriminator_field,
            scope,
        } => TeamBuilder::new(*team_size, discriminator_field.clone(), *scope).map(Assembler::Team),
        AssemblyStrategy::CrossPool {
            per_pool_count,
            sort_attribute,
        } => PairAssembler::new(*per_pool_count, sort_attribute.clone()).map(Assembler::CrossPool),
    }
}

#[inline]
fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<(), EngineError> {
    match cancel {
        Some(flag) if flag.load(Ordering::Acquire) => Err(EngineError::Cancelled),
        _ => Ok(()),
    }
}
