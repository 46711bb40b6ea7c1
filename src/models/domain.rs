use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Searchable attributes attached to a ticket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFields {
    #[serde(rename = "stringArgs", default)]
    pub string_args: HashMap<String, String>,
    #[serde(rename = "doubleArgs", default)]
    pub double_args: HashMap<String, f64>,
}

/// A single participant's matchmaking request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    #[serde(rename = "searchFields", default)]
    pub search_fields: SearchFields,
}

impl Ticket {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            search_fields: SearchFields::default(),
        }
    }

    /// Builder helper for string-valued attributes
    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.search_fields.string_args.insert(key.into(), value.into());
        self
    }

    /// Builder helper for numeric attributes
    pub fn with_double(mut self, key: impl Into<String>, value: f64) -> Self {
        self.search_fields.double_args.insert(key.into(), value);
        self
    }

    pub fn string_arg(&self, key: &str) -> Option<&str> {
        self.search_fields.string_args.get(key).map(String::as_str)
    }

    pub fn double_arg(&self, key: &str) -> Option<f64> {
        self.search_fields.double_args.get(key).copied()
    }
}

/// Exact-match filter on a string attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringEqualsFilter {
    #[serde(rename = "stringArg")]
    pub string_arg: String,
    pub value: String,
}

/// Inclusive range filter on a numeric attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleRangeFilter {
    #[serde(rename = "doubleArg")]
    pub double_arg: String,
    pub min: f64,
    pub max: f64,
}

/// A named, pre-filtered collection of tickets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,
    #[serde(rename = "stringEqualsFilters", default)]
    pub string_equals_filters: Vec<StringEqualsFilter>,
    #[serde(rename = "doubleRangeFilters", default)]
    pub double_range_filters: Vec<DoubleRangeFilter>,
}

impl Pool {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            string_equals_filters: Vec::new(),
            double_range_filters: Vec::new(),
        }
    }
}

/// Tickets returned by the query service, keyed by pool name
pub type PoolTickets = HashMap<String, Vec<Ticket>>;

/// Whether one active team spans all pools or is reset at every pool boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamScope {
    #[default]
    AcrossPools,
    PerPool,
}

/// Assembly strategy and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyStrategy {
    /// Fixed-size teams with no duplicate discriminator value per team
    Team {
        #[serde(rename = "teamSize")]
        team_size: u32,
        #[serde(rename = "discriminatorField", default)]
        discriminator_field: Option<String>,
        #[serde(default)]
        scope: TeamScope,
    },
    /// Lowest `per_pool_count` tickets from every pool, once per cycle
    CrossPool {
        #[serde(rename = "perPoolCount")]
        per_pool_count: u32,
        #[serde(rename = "sortAttribute")]
        sort_attribute: String,
    },
}

/// What to do when a completed candidate cannot be scored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    #[default]
    DropCandidate,
    AbortRun,
}

/// How the scorer treats a ticket lacking the quality attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttribute {
    #[default]
    Reject,
    Zero,
}

/// Configuration for one match-generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProfile {
    pub name: String,
    pub pools: Vec<Pool>,
    pub strategy: AssemblyStrategy,
    #[serde(rename = "qualityAttribute")]
    pub quality_attribute: String,
    #[serde(rename = "functionName", default)]
    pub function_name: Option<String>,
    #[serde(rename = "scoringPolicy", default)]
    pub scoring_policy: Option<ScoringPolicy>,
    #[serde(rename = "missingAttribute", default)]
    pub missing_attribute: Option<MissingAttribute>,
}

impl MatchProfile {
    pub fn pool_names(&self) -> impl Iterator<Item = &str> {
        self.pools.iter().map(|p| p.name.as_str())
    }
}

/// Opaque, typed side-channel value attached to a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(rename = "typeUrl")]
    pub type_url: String,
    pub value: serde_json::Value,
}

/// Quality input consumed by downstream evaluators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriteria {
    pub score: f64,
}

impl EvaluationCriteria {
    pub const TYPE_URL: &'static str = "type.googleapis.com/openmatch.DefaultEvaluationCriteria";
    pub const EXTENSION_KEY: &'static str = "evaluation_input";

    pub fn pack(&self) -> Result<Extension, serde_json::Error> {
        Ok(Extension {
            type_url: Self::TYPE_URL.to_string(),
            value: serde_json::to_value(self)?,
        })
    }

    /// Decode from an extension, returning `None` when the type does not match
    pub fn unpack(extension: &Extension) -> Option<Result<Self, serde_json::Error>> {
        if extension.type_url != Self::TYPE_URL {
            return None;
        }
        Some(serde_json::from_value(extension.value.clone()))
    }
}

/// A finalized, scored group of tickets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    #[serde(rename = "matchId")]
    pub match_id: String,
    #[serde(rename = "matchProfile")]
    pub match_profile: String,
    #[serde(rename = "matchFunction")]
    pub match_function: String,
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub extensions: BTreeMap<String, Extension>,
}

impl MatchProposal {
    /// Decoded quality score, if the evaluation extension is present and well-formed
    pub fn quality(&self) -> Option<f64> {
        let ext = self.extensions.get(EvaluationCriteria::EXTENSION_KEY)?;
        EvaluationCriteria::unpack(ext)?.ok().map(|c| c.score)
    }

    pub fn ticket_ids(&self) -> Vec<&str> {
        self.tickets.iter().map(|t| t.id.as_str()).collect()
    }
}
