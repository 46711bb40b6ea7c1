use std::cmp::Ordering;
use std::collections::HashSet;
use crate::core::candidate::MatchCandidate;
use crate::core::error::EngineError;
use crate::models::{PoolTickets, Ticket};

/// Remaining tickets of every pool, owned by one assembler run
///
/// Tickets leave only through [`PoolState::take_lowest`]. A ticket listed in
/// several pools is gone from all of them once taken from one.
#[derive(Debug, Clone, Default)]
pub struct PoolState {
    pools: Vec<(String, Vec<Ticket>)>,
    taken: HashSet<String>,
}

impl PoolState {
    /// Snapshot the declared pools; undeclared pools are ignored and missing
    /// ones start empty.
    pub fn new<'p, I>(pool_tickets: &PoolTickets, pools: I) -> Self
    where
        I: IntoIterator<Item = &'p str>,
    {
        let pools = pools
            .into_iter()
            .map(|name| {
                let tickets = pool_tickets.get(name).cloned().unwrap_or_default();
                (name.to_string(), tickets)
            })
            .collect();

        Self {
            pools,
            taken: HashSet::new(),
        }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Tickets still available in the pool at `index`
    pub fn remaining(&self, index: usize) -> usize {
        self.pools
            .get(index)
            .map(|(_, tickets)| {
                tickets
                    .iter()
                    .filter(|t| !self.taken.contains(&t.id))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Remove and return the `count` lowest tickets by `attribute`, or `None`
    /// if the pool holds fewer than `count`.
    ///
    /// The sort is stable, so equal values keep their supplied order. Tickets
    /// lacking the attribute sort first.
    pub fn take_lowest(&mut self, index: usize, count: usize, attribute: &str) -> Option<Vec<Ticket>> {
        let taken = &self.taken;
        let (_, tickets) = self.pools.get_mut(index)?;
        tickets.retain(|t| !taken.contains(&t.id));

        if tickets.len() < count {
            return None;
        }

        tickets.sort_by(|a, b| compare_by(a, b, attribute));
        let picked: Vec<Ticket> = tickets.drain(..count).collect();
        self.taken.extend(picked.iter().map(|t| t.id.clone()));

        Some(picked)
    }
}

#[inline]
fn compare_by(a: &Ticket, b: &Ticket, attribute: &str) -> Ordering {
    let a = a.double_arg(attribute).unwrap_or(f64::NEG_INFINITY);
    let b = b.double_arg(attribute).unwrap_or(f64::NEG_INFINITY);
    a.total_cmp(&b)
}

/// Draws the same number of tickets from every pool per matching cycle
///
/// Each cycle visits the pools in declared order and takes the lowest
/// `per_pool_count` tickets by `sort_attribute` from each. The first pool
/// that cannot supply enough tickets ends the whole run, even when other
/// pools still have surplus; the unfinished cycle is discarded.
#[derive(Debug, Clone)]
pub struct PairAssembler {
    per_pool_count: usize,
    sort_attribute: String,
}

impl PairAssembler {
    pub fn new(per_pool_count: u32, sort_attribute: impl Into<String>) -> Result<Self, EngineError> {
        let sort_attribute = sort_attribute.into();

        if per_pool_count == 0 {
            return Err(EngineError::InvalidConfig(
                "per-pool draw count must be positive".to_string(),
            ));
        }
        if sort_attribute.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "sort attribute must not be empty".to_string(),
            ));
        }

        Ok(Self {
            per_pool_count: per_pool_count as usize,
            sort_attribute,
        })
    }

    pub fn build(&self, mut state: PoolState) -> Vec<MatchCandidate> {
        let mut candidates = Vec::new();

        if state.pool_count() == 0 {
            return candidates;
        }

        'cycles: loop {
            let mut cycle = Vec::with_capacity(self.per_pool_count * state.pool_count());

            for index in 0..state.pool_count() {
                match state.take_lowest(index, self.per_pool_count, &self.sort_attribute) {
                    Some(picked) => cycle.extend(picked),
                    None => break 'cycles,
                }
            }

            candidates.push(MatchCandidate::from_tickets(cycle));
        }

        candidates
    }
}
