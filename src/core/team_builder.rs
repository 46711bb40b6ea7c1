use std::collections::{HashSet, VecDeque};
use crate::core::candidate::MatchCandidate;
use crate::core::error::EngineError;
use crate::models::{PoolTickets, TeamScope, Ticket};

/// Assembles fixed-size teams with at most one ticket per discriminator value
///
/// # Algorithm
/// Pools are walked in declared order and tickets in supplied order, filling
/// one active candidate. A ticket whose discriminator value is already in the
/// active candidate is deferred, not dropped: every freshly started candidate
/// is offered the deferred tickets first, oldest first. Full candidates are
/// emitted; an incomplete trailing candidate is discarded.
#[derive(Debug, Clone)]
pub struct TeamBuilder {
    team_size: usize,
    discriminator: Option<String>,
    scope: TeamScope,
}

impl TeamBuilder {
    pub fn new(
        team_size: u32,
        discriminator: Option<String>,
        scope: TeamScope,
    ) -> Result<Self, EngineError> {
        if team_size == 0 {
            return Err(EngineError::InvalidConfig(
                "team size must be positive".to_string(),
            ));
        }
        if matches!(discriminator.as_deref(), Some(field) if field.trim().is_empty()) {
            return Err(EngineError::InvalidConfig(
                "discriminator field name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            team_size: team_size as usize,
            discriminator,
            scope,
        })
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    /// Group the tickets of `pools` into completed teams
    ///
    /// Pools absent from `pool_tickets` contribute nothing. A ticket listed in
    /// more than one pool is placed at most once.
    pub fn build<'p, I>(&self, pool_tickets: &PoolTickets, pools: I) -> Vec<MatchCandidate>
    where
        I: IntoIterator<Item = &'p str>,
    {
        let mut assembly = Assembly::new(self);

        for pool in pools {
            if let Some(tickets) = pool_tickets.get(pool) {
                for ticket in tickets {
                    assembly.offer(ticket, pool);
                }
            }

            if self.scope == TeamScope::PerPool {
                assembly.reset();
            }
        }

        assembly.completed
    }

    fn key<'t>(&self, ticket: &'t Ticket) -> Option<&'t str> {
        // A ticket without the field counts as the empty value
        self.discriminator
            .as_deref()
            .map(|field| ticket.string_arg(field).unwrap_or(""))
    }
}

/// Mutable state of one `build` call
struct Assembly<'b, 't> {
    builder: &'b TeamBuilder,
    active: MatchCandidate,
    deferred: Vec<&'t Ticket>,
    claimed: HashSet<&'t str>,
    completed: Vec<MatchCandidate>,
}

impl<'b, 't> Assembly<'b, 't> {
    fn new(builder: &'b TeamBuilder) -> Self {
        Self {
            builder,
            active: MatchCandidate::new(),
            deferred: Vec::new(),
            claimed: HashSet::new(),
            completed: Vec::new(),
        }
    }

    fn offer(&mut self, ticket: &'t Ticket, pool: &str) {
        // Overlapping pools may list the same ticket twice
        if !self.claimed.insert(ticket.id.as_str()) {
            return;
        }

        if self.try_place(ticket, pool) {
            self.drain_deferred(pool);
        }
    }

    /// Place into the active candidate or defer. Returns true when the
    /// placement completed the candidate.
    fn try_place(&mut self, ticket: &'t Ticket, pool: &str) -> bool {
        let key = self.builder.key(ticket);
        if matches!(key, Some(k) if self.active.has_seen(k)) {
            self.deferred.push(ticket);
            return false;
        }

        self.active.push(ticket.clone(), key);
        if self.active.len() < self.builder.team_size {
            return false;
        }

        let mut done = std::mem::take(&mut self.active);
        done.mark_completed(pool);
        self.completed.push(done);
        true
    }

    fn drain_deferred(&mut self, pool: &str) {
        let mut pending: VecDeque<&'t Ticket> = std::mem::take(&mut self.deferred).into();

        while let Some(ticket) = pending.pop_front() {
            if self.try_place(ticket, pool) {
                // Tickets re-deferred during this drain are older than the rest
                let mut requeue: VecDeque<&'t Ticket> = std::mem::take(&mut self.deferred).into();
                requeue.extend(pending.drain(..));
                pending = requeue;
            }
        }
    }

    /// Discard the unfinished candidate and backlog; their tickets become
    /// available again to later pools.
    fn reset(&mut self) {
        let abandoned = std::mem::take(&mut self.active);
        for ticket in abandoned.tickets() {
            self.claimed.remove(ticket.id.as_str());
        }
        for ticket in self.deferred.drain(..) {
            self.claimed.remove(ticket.id.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: &str, role: &str, score: f64) -> Ticket {
        Ticket::new(id).with_string("role", role).with_double("score", score)
    }

    fn single_pool(name: &str, tickets: Vec<Ticket>) -> PoolTickets {
        let mut pools = PoolTickets::new();
        pools.insert(name.to_string(), tickets);
        pools
    }

    fn role_builder(team_size: u32) -> TeamBuilder {
        TeamBuilder::new(team_size, Some("role".to_string()), TeamScope::AcrossPools).unwrap()
    }

    #[test]
    fn test_duplicate_role_deferred() {
        let pools = single_pool(
            "normal",
            vec![
                ticket("A", "bang", 10.0),
                ticket("B", "valk", 20.0),
                ticket("C", "bang", 15.0),
                ticket("D", "horizon", 5.0),
            ],
        );

        let teams = role_builder(3).build(&pools, ["normal"]);

        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].ticket_ids(), vec!["A", "B", "D"]);
        assert_eq!(teams[0].completed_in(), Some("normal"));
    }

    #[test]
    fn test_deferred_ticket_joins_next_team() {
        let pools = single_pool(
            "normal",
            vec![
                ticket("1", "a", 1.0),
                ticket("2", "a", 2.0),
                ticket("3", "b", 3.0),
                ticket("4", "b", 4.0),
            ],
        );

        let teams = role_builder(2).build(&pools, ["normal"]);

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].ticket_ids(), vec!["1", "3"]);
        assert_eq!(teams[1].ticket_ids(), vec!["2", "4"]);
    }

    #[test]
    fn test_backlog_can_fill_several_teams() {
        let pools = single_pool(
            "normal",
            vec![
                ticket("1", "a", 0.0),
                ticket("2", "a", 0.0),
                ticket("3", "a", 0.0),
                ticket("4", "b", 0.0),
                ticket("5", "b", 0.0),
            ],
        );

        // "3" is re-deferred while "2" opens the second team, then left over
        let teams = role_builder(2).build(&pools, ["normal"]);

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].ticket_ids(), vec!["1", "4"]);
        assert_eq!(teams[1].ticket_ids(), vec!["2", "5"]);
    }

    #[test]
    fn test_too_few_tickets() {
        let pools = single_pool("normal", vec![ticket("1", "bang", 1.0), ticket("2", "valk", 2.0)]);
        assert!(role_builder(3).build(&pools, ["normal"]).is_empty());
    }

    #[test]
    fn test_missing_pool_yields_nothing() {
        let pools = PoolTickets::new();
        assert!(role_builder(3).build(&pools, ["normal"]).is_empty());
    }

    #[test]
    fn test_zero_team_size_is_invalid() {
        let result = TeamBuilder::new(0, None, TeamScope::AcrossPools);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_blank_discriminator_is_invalid() {
        let result = TeamBuilder::new(3, Some(" ".to_string()), TeamScope::AcrossPools);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_without_discriminator_groups_in_order() {
        let pools = single_pool(
            "p",
            vec![
                ticket("1", "x", 0.0),
                ticket("2", "x", 0.0),
                ticket("3", "x", 0.0),
                ticket("4", "x", 0.0),
                ticket("5", "x", 0.0),
            ],
        );

        let builder = TeamBuilder::new(2, None, TeamScope::AcrossPools).unwrap();
        let teams = builder.build(&pools, ["p"]);

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].ticket_ids(), vec!["1", "2"]);
        assert_eq!(teams[1].ticket_ids(), vec!["3", "4"]);
    }

    #[test]
    fn test_team_spans_pools() {
        let mut pools = PoolTickets::new();
        pools.insert("low".to_string(), vec![ticket("1", "bang", 1.0), ticket("2", "valk", 2.0)]);
        pools.insert("high".to_string(), vec![ticket("3", "horizon", 9.0)]);

        let teams = role_builder(3).build(&pools, ["low", "high"]);

        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].ticket_ids(), vec!["1", "2", "3"]);
        assert_eq!(teams[0].completed_in(), Some("high"));
    }

    #[test]
    fn test_per_pool_scope_resets_between_pools() {
        let mut pools = PoolTickets::new();
        pools.insert("low".to_string(), vec![ticket("1", "bang", 1.0), ticket("2", "valk", 2.0)]);
        pools.insert("high".to_string(), vec![ticket("3", "horizon", 9.0)]);

        let builder = TeamBuilder::new(3, Some("role".to_string()), TeamScope::PerPool).unwrap();
        assert!(builder.build(&pools, ["low", "high"]).is_empty());
    }

    #[test]
    fn test_per_pool_scope_releases_abandoned_tickets() {
        let shared = ticket("2", "valk", 3450.0);
        let mut pools = PoolTickets::new();
        pools.insert("low".to_string(), vec![ticket("1", "bang", 1.0), shared.clone()]);
        pools.insert(
            "mid".to_string(),
            vec![shared, ticket("3", "bang", 4000.0), ticket("4", "horizon", 5000.0)],
        );

        let builder = TeamBuilder::new(3, Some("role".to_string()), TeamScope::PerPool).unwrap();
        let teams = builder.build(&pools, ["low", "mid"]);

        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].ticket_ids(), vec!["2", "3", "4"]);
        assert_eq!(teams[0].completed_in(), Some("mid"));
    }

    #[test]
    fn test_ticket_in_overlapping_pools_placed_once() {
        let shared = ticket("shared", "bang", 1.0);
        let mut pools = PoolTickets::new();
        pools.insert("a".to_string(), vec![shared.clone(), ticket("2", "valk", 1.0)]);
        pools.insert("b".to_string(), vec![shared, ticket("3", "valk", 1.0), ticket("4", "bang", 1.0)]);

        let builder = TeamBuilder::new(2, Some("role".to_string()), TeamScope::AcrossPools).unwrap();
        let teams = builder.build(&pools, ["a", "b"]);

        let ids: Vec<_> = teams.iter().flat_map(|t| t.ticket_ids()).collect();
        assert_eq!(ids, vec!["shared", "2", "3", "4"]);
    }

    #[test]
    fn test_build_is_repeatable() {
        let pools = single_pool(
            "normal",
            vec![
                ticket("1", "a", 0.0),
                ticket("2", "a", 0.0),
                ticket("3", "b", 0.0),
                ticket("4", "c", 0.0),
                ticket("5", "b", 0.0),
                ticket("6", "c", 0.0),
            ],
        );

        let builder = role_builder(3);
        assert_eq!(builder.build(&pools, ["normal"]), builder.build(&pools, ["normal"]));
    }
}
