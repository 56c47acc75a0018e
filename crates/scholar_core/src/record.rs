use std::collections::BTreeMap;
use std::fmt;

use crate::FilterKey;

/// One search hit as received from the backend. Every field except the
/// title placeholder is optional; see `ResultCardView` for display defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultRecord {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub institution: Option<String>,
    pub kind: Option<String>,
    pub year: Option<String>,
    pub identifier: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetOption {
    pub value: String,
    pub count: u64,
}

pub type Facets = BTreeMap<FilterKey, Vec<FacetOption>>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub results: Vec<ResultRecord>,
    pub total: u64,
    pub page: u32,
    pub facets: Facets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestReport {
    pub new_records: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositoryStats {
    pub total_records: u64,
    pub theses: u64,
    pub articles: u64,
    pub research: u64,
    pub last_harvest: Option<String>,
    pub includes_elis: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network exception, timeout or an endpoint that could not be built.
    Transport,
    HttpStatus(u16),
    /// Unparsable body or missing `results` array.
    Malformed,
    /// `success: false` reported by the backend.
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SearchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Transport => {
                write!(f, "could not reach the search service: {}", self.message)
            }
            FailureKind::HttpStatus(code) => {
                write!(f, "search service returned HTTP {code}")
            }
            FailureKind::Malformed => {
                write!(f, "unexpected response from the search service: {}", self.message)
            }
            FailureKind::Application => write!(f, "search failed: {}", self.message),
        }
    }
}
