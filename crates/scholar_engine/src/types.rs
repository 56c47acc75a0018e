use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub type RequestSeq = u64;
pub type TimerToken = u64;

/// One primary fetch as the backend sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchRequest {
    pub category: String,
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub filters: BTreeMap<String, String>,
    /// Route to the live upstream search instead of the cache.
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RecordDto {
    pub title: Option<String>,
    #[serde(deserialize_with = "authors_field")]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub institution: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub year: Option<String>,
    pub identifier: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

pub type FacetMap = BTreeMap<String, Vec<FacetCount>>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub results: Vec<RecordDto>,
    pub total: u64,
    pub page: u32,
    pub facets: FacetMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestOutcome {
    pub new_records: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HealthReport {
    pub total_records: u64,
    pub theses: u64,
    pub articles: u64,
    pub research: u64,
    pub last_harvest: Option<String>,
    pub includes_elis: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SearchCompleted {
        seq: RequestSeq,
        result: Result<SearchPage, BackendError>,
    },
    HarvestCompleted {
        category: String,
        result: Result<HarvestOutcome, BackendError>,
    },
    HealthChecked(Result<HealthReport, BackendError>),
    TimerElapsed {
        token: TimerToken,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// Body was not JSON or lacked the fields every answer must carry.
    MalformedResponse,
    /// The backend answered `success: false`.
    Application,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Application => write!(f, "backend reported failure"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

// Wire shapes. Everything is optional; the client decides what is fatal.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSearchResponse {
    pub(crate) success: Option<bool>,
    pub(crate) results: Option<Vec<RecordDto>>,
    pub(crate) facets: Option<RawFacets>,
    #[serde(alias = "totalResults", alias = "total_results")]
    pub(crate) total: Option<u64>,
    pub(crate) page: Option<u32>,
    pub(crate) error: Option<String>,
}

pub(crate) type RawFacets = BTreeMap<String, Vec<RawFacetOption>>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawFacetOption {
    #[serde(alias = "name", deserialize_with = "loose_string")]
    pub(crate) value: Option<String>,
    pub(crate) count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawFiltersResponse {
    Wrapped { facets: RawFacets },
    Bare(RawFacets),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHarvestResponse {
    pub(crate) success: Option<bool>,
    #[serde(rename = "newRecords", alias = "new_records")]
    pub(crate) new_records: Option<u64>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHealthResponse {
    pub(crate) data: RawHealthData,
    pub(crate) harvest: RawHealthHarvest,
    pub(crate) repositories: RawHealthRepositories,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHealthData {
    pub(crate) total_records: u64,
    pub(crate) theses: u64,
    pub(crate) articles: u64,
    pub(crate) research: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHealthHarvest {
    #[serde(deserialize_with = "loose_string")]
    pub(crate) last_harvest: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHealthRepositories {
    pub(crate) includes_elis: bool,
}

pub(crate) fn normalize_facets(raw: RawFacets) -> FacetMap {
    raw.into_iter()
        .map(|(name, options)| {
            let options = options
                .into_iter()
                .filter_map(|option| {
                    let value = option.value?.trim().to_string();
                    (!value.is_empty()).then_some(FacetCount {
                        value,
                        count: option.count,
                    })
                })
                .collect();
            (name, options)
        })
        .collect()
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts a string, a number or null.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_to_string))
}

/// Accepts `"A; B"`, `["A", "B"]` or null.
fn authors_field<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let authors = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(joined)) => joined
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        Some(Value::Array(values)) => values.into_iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    };
    Ok(authors)
}
