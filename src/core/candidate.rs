use std::collections::HashSet;
use crate::models::Ticket;

/// An in-progress group of tickets
///
/// Tickets keep insertion order. `seen` holds the discriminator values
/// already present so the team builder can enforce uniqueness.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCandidate {
    tickets: Vec<Ticket>,
    seen: HashSet<String>,
    completed_in: Option<String>,
}

impl MatchCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Append a ticket, recording its discriminator value if any
    pub fn push(&mut self, ticket: Ticket, key: Option<&str>) {
        if let Some(key) = key {
            self.seen.insert(key.to_string());
        }
        self.tickets.push(ticket);
    }

    /// Pool in which the candidate reached its full size
    pub fn completed_in(&self) -> Option<&str> {
        self.completed_in.as_deref()
    }

    pub(crate) fn mark_completed(&mut self, pool: &str) {
        self.completed_in = Some(pool.to_string());
    }

    pub fn ticket_ids(&self) -> Vec<&str> {
        self.tickets.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn into_tickets(self) -> Vec<Ticket> {
        self.tickets
    }
}
