use std::collections::BTreeMap;
use std::fmt;

use crate::gate::{HarvestGate, HarvestSkip};
use crate::record::{Facets, RepositoryStats, ResultRecord, SearchFailure, SearchPage};
use crate::view_model::{AppViewModel, FacetOptionView, FacetView, Pagination, ResultCardView};
use crate::HarvestPolicy;

/// Milliseconds on the driver's monotonic clock.
pub type Timestamp = u64;
/// Sequence number of an issued primary fetch.
pub type RequestSeq = u64;
/// Identifies one scheduled debounce timer.
pub type DebounceToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub page_size: u32,
    pub harvest_interval_ms: u64,
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 20,
            harvest_interval_ms: 5 * 60 * 1000,
            debounce_ms: 400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Category {
    #[default]
    All,
    Theses,
    Articles,
    Research,
    /// E-LIS live search. Always hits the upstream, so it needs a query and never harvests.
    Elis,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::All,
        Category::Theses,
        Category::Articles,
        Category::Research,
        Category::Elis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Theses => "theses",
            Category::Articles => "articles",
            Category::Research => "research",
            Category::Elis => "elis",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::All => "All",
            Category::Theses => "Theses",
            Category::Articles => "Articles",
            Category::Research => "Research",
            Category::Elis => "E-LIS",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|category| {
            category.as_str().eq_ignore_ascii_case(name) || category.label().eq_ignore_ascii_case(name)
        })
    }

    pub fn is_live_only(self) -> bool {
        matches!(self, Category::Elis)
    }

    pub fn supports_harvest(self) -> bool {
        !self.is_live_only()
    }

    pub fn has_facets(self) -> bool {
        !self.is_live_only()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Year,
    Institution,
    Author,
    Type,
    Keyword,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::Year,
        FilterKey::Institution,
        FilterKey::Author,
        FilterKey::Type,
        FilterKey::Keyword,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::Year => "year",
            FilterKey::Institution => "institution",
            FilterKey::Author => "author",
            FilterKey::Type => "type",
            FilterKey::Keyword => "keyword",
        }
    }

    /// Accepts the wire name plus the plural and repository aliases backends use for facets.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "year" | "years" => Some(FilterKey::Year),
            "institution" | "institutions" | "repository" | "repositories" => {
                Some(FilterKey::Institution)
            }
            "author" | "authors" => Some(FilterKey::Author),
            "type" | "types" => Some(FilterKey::Type),
            "keyword" | "keywords" | "subject" | "subjects" => Some(FilterKey::Keyword),
            _ => None,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active filter values. Blank values are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filters(BTreeMap<FilterKey, String>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or removes a filter. Returns whether the stored value changed.
    pub fn set(&mut self, key: FilterKey, value: Option<String>) -> bool {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match value {
            Some(value) => self.0.insert(key, value.clone()).as_ref() != Some(&value),
            None => self.0.remove(&key).is_some(),
        }
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Removes every filter. Returns whether anything was removed.
    pub fn clear(&mut self) -> bool {
        let had_any = !self.0.is_empty();
        self.0.clear();
        had_any
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// The tuple a primary fetch is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub filters: Filters,
    pub category: Category,
}

impl SearchState {
    pub fn new(page_size: u32, category: Category) -> Self {
        Self {
            query: String::new(),
            page: 1,
            page_size: page_size.max(1),
            filters: Filters::new(),
            category,
        }
    }

    pub fn needs_query(&self) -> bool {
        self.category.is_live_only() && self.query.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayState {
    /// Nothing searched yet.
    #[default]
    Idle,
    /// Live-only category with an empty query; no request is sent.
    Prompt,
    Results,
    Empty,
    Error(SearchFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HarvestStatus {
    #[default]
    Idle,
    Running { category: Category },
    Skipped(HarvestSkip),
    UpToDate,
    Added { new_records: u64 },
    Failed(String),
    /// The silent refresh after a harvest failed; cached results stay on screen.
    RefreshFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InFlight {
    pub(crate) seq: RequestSeq,
    pub(crate) harvest: HarvestPolicy,
    /// A user is waiting on this fetch.
    pub(crate) interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub(crate) settings: Settings,
    pub(crate) search: SearchState,
    pub(crate) gate: HarvestGate,
    pub(crate) input: String,
    pub(crate) debounce_token: DebounceToken,
    pub(crate) debounce_pending: bool,
    pub(crate) last_seq: RequestSeq,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) results: Vec<ResultRecord>,
    pub(crate) total_records: u64,
    pub(crate) facets: Facets,
    pub(crate) display: DisplayState,
    pub(crate) harvest_status: HarvestStatus,
    pub(crate) stats: Option<RepositoryStats>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(Settings::default(), Category::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings, category: Category) -> Self {
        Self {
            settings,
            search: SearchState::new(settings.page_size, category),
            gate: HarvestGate::new(settings.harvest_interval_ms),
            input: String::new(),
            debounce_token: 0,
            debounce_pending: false,
            last_seq: 0,
            in_flight: None,
            results: Vec::new(),
            total_records: 0,
            facets: Facets::new(),
            display: DisplayState::Idle,
            harvest_status: HarvestStatus::Idle,
            stats: None,
            dirty: false,
        }
    }

    /// Starts from a prepared search tuple, e.g. one built from command-line arguments.
    /// The query is placed in the input box; nothing is fetched until a message asks for it.
    pub fn with_search(settings: Settings, search: SearchState) -> Self {
        let mut state = Self::with_settings(settings, search.category);
        state.input = search.query.clone();
        state.search = SearchState {
            page_size: settings.page_size.max(1),
            ..search
        };
        state
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn gate(&self) -> &HarvestGate {
        &self.gate
    }

    /// True when no fetch, harvest or debounce timer is outstanding.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_none() && !self.gate.is_outstanding() && !self.debounce_pending
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.search.page, self.search.page_size, self.total_records)
    }

    pub fn view(&self) -> AppViewModel {
        let facets = self
            .facets
            .iter()
            .map(|(key, options)| FacetView {
                key: *key,
                options: options
                    .iter()
                    .map(|option| FacetOptionView {
                        value: option.value.clone(),
                        count: option.count,
                        selected: self.search.filters.get(*key) == Some(option.value.as_str()),
                    })
                    .collect(),
            })
            .collect();

        AppViewModel {
            query: self.search.query.clone(),
            input: self.input.clone(),
            category: self.search.category,
            filters: self
                .search
                .filters
                .iter()
                .map(|(key, value)| (key, value.to_string()))
                .collect(),
            display: self.display.clone(),
            loading: matches!(self.in_flight, Some(f) if f.interactive),
            refreshing: matches!(self.in_flight, Some(f) if !f.interactive),
            pagination: self.pagination(),
            cards: self.results.iter().map(ResultCardView::from_record).collect(),
            facets,
            harvest_status: self.harvest_status.clone(),
            stats: self.stats.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn next_debounce_token(&mut self) -> DebounceToken {
        self.debounce_token += 1;
        self.debounce_pending = true;
        self.debounce_token
    }

    /// Invalidates any scheduled debounce timer.
    pub(crate) fn cancel_debounce(&mut self) {
        if self.debounce_pending {
            self.debounce_token += 1;
            self.debounce_pending = false;
        }
    }

    pub(crate) fn take_debounce(&mut self, token: DebounceToken) -> bool {
        if self.debounce_pending && token == self.debounce_token {
            self.debounce_pending = false;
            true
        } else {
            false
        }
    }

    pub(crate) fn commit_input(&mut self) {
        self.search.query = self.input.trim().to_string();
    }

    pub(crate) fn issue_seq(&mut self) -> RequestSeq {
        self.last_seq += 1;
        self.last_seq
    }

    pub(crate) fn show_prompt(&mut self) {
        self.results.clear();
        self.total_records = 0;
        self.facets.clear();
        self.display = DisplayState::Prompt;
        self.mark_dirty();
    }

    pub(crate) fn show_error(&mut self, failure: SearchFailure) {
        self.results.clear();
        self.total_records = 0;
        self.display = DisplayState::Error(failure);
        self.mark_dirty();
    }

    pub(crate) fn apply_page(&mut self, page: SearchPage) {
        self.display = if page.results.is_empty() {
            DisplayState::Empty
        } else {
            DisplayState::Results
        };
        self.results = page.results;
        self.total_records = page.total;
        self.facets = if self.search.category.has_facets() {
            page.facets
        } else {
            Facets::new()
        };
        self.mark_dirty();
    }

    pub(crate) fn reset_for_category(&mut self, category: Category) {
        self.search.category = category;
        self.search.filters.clear();
        self.results.clear();
        self.total_records = 0;
        self.facets.clear();
        self.mark_dirty();
    }
}
