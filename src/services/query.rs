use crate::models::{Pool, PoolTickets, Ticket};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching pool tickets
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Query service returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Ticket store unavailable: {0}")]
    Unavailable(String),
}

/// Fetches the tickets of every requested pool
pub trait PoolQuery: Send + Sync {
    fn query_pools(
        &self,
        pools: &[Pool],
    ) -> impl Future<Output = Result<PoolTickets, QueryError>> + Send;
}

/// Check a ticket against every filter of a pool
///
/// String filters need an exact match; numeric ranges are inclusive. A ticket
/// lacking a filtered attribute never matches.
#[inline]
pub fn matches_pool(ticket: &Ticket, pool: &Pool) -> bool {
    let strings_ok = pool
        .string_equals_filters
        .iter()
        .all(|f| ticket.string_arg(&f.string_arg) == Some(f.value.as_str()));

    strings_ok
        && pool.double_range_filters.iter().all(|f| {
            ticket
                .double_arg(&f.double_arg)
                .is_some_and(|v| v >= f.min && v <= f.max)
        })
}

/// Client for an HTTP ticket query service
///
/// Sends one `POST {base}/v1/queryservice/tickets:query` per pool. The
/// response body may be a single JSON object or newline-delimited chunks;
/// each chunk carries `tickets` either at the top level or under `result`.
pub struct HttpPoolQuery {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct QueryChunk {
    #[serde(default)]
    tickets: Vec<Ticket>,
    #[serde(default)]
    result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    tickets: Vec<Ticket>,
}

impl HttpPoolQuery {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, QueryError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    async fn query_pool(&self, pool: &Pool) -> Result<Vec<Ticket>, QueryError> {
        let url = format!(
            "{}/v1/queryservice/tickets:query",
            self.base_url.trim_end_matches('/')
        );

        tracing::debug!("Querying pool {} from: {}", pool.name, url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "pool": pool }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueryError::ApiError(format!(
                "Failed to query pool {}: {}",
                pool.name,
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_query_body(&body)
    }
}

fn parse_query_body(body: &str) -> Result<Vec<Ticket>, QueryError> {
    let mut tickets = Vec::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let chunk: QueryChunk = serde_json::from_str(line)
            .map_err(|e| QueryError::InvalidResponse(format!("Failed to parse tickets: {}", e)))?;

        tickets.extend(chunk.tickets);
        if let Some(result) = chunk.result {
            tickets.extend(result.tickets);
        }
    }

    Ok(tickets)
}

impl PoolQuery for HttpPoolQuery {
    async fn query_pools(&self, pools: &[Pool]) -> Result<PoolTickets, QueryError> {
        let mut pool_tickets = PoolTickets::with_capacity(pools.len());

        for pool in pools {
            let tickets = self.query_pool(pool).await?;
            tracing::debug!("Pool {} returned {} tickets", pool.name, tickets.len());
            pool_tickets.insert(pool.name.clone(), tickets);
        }

        Ok(pool_tickets)
    }
}

/// In-process ticket store that evaluates pool filters itself
///
/// Tickets are returned in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<Vec<Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets: RwLock::new(tickets),
        }
    }

    pub fn insert(&self, ticket: Ticket) -> Result<(), QueryError> {
        self.tickets
            .write()
            .map_err(|e| QueryError::Unavailable(e.to_string()))?
            .push(ticket);
        Ok(())
    }

    /// Drop tickets by id, e.g. once they have been assigned
    pub fn remove(&self, ids: &[&str]) -> Result<usize, QueryError> {
        let mut tickets = self
            .tickets
            .write()
            .map_err(|e| QueryError::Unavailable(e.to_string()))?;
        let before = tickets.len();
        tickets.retain(|t| !ids.contains(&t.id.as_str()));
        Ok(before - tickets.len())
    }

    pub fn len(&self) -> usize {
        self.tickets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, pools: &[Pool]) -> Result<PoolTickets, QueryError> {
        let tickets = self
            .tickets
            .read()
            .map_err(|e| QueryError::Unavailable(e.to_string()))?;

        Ok(pools
            .iter()
            .map(|pool| {
                let members = tickets
                    .iter()
                    .filter(|t| matches_pool(t, pool))
                    .cloned()
                    .collect();
                (pool.name.clone(), members)
            })
            .collect())
    }
}

impl PoolQuery for InMemoryTicketStore {
    async fn query_pools(&self, pools: &[Pool]) -> Result<PoolTickets, QueryError> {
        self.select(pools)
    }
}
