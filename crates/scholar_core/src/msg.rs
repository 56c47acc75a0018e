#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Driver is up; fetch repository statistics.
    Started,
    /// User edited the search box (raw, not yet debounced).
    InputChanged(String),
    /// A scheduled debounce timer fired.
    DebounceElapsed { token: crate::DebounceToken },
    /// User pressed Enter: search now, skipping the debounce window.
    SearchSubmitted,
    /// User picked a page number.
    PageRequested(u32),
    NextPage,
    PrevPage,
    /// User set (`Some`) or removed (`None`) a filter value.
    FilterChanged {
        key: crate::FilterKey,
        value: Option<String>,
    },
    FiltersCleared,
    /// User switched category tab.
    CategorySelected(crate::Category),
    /// Backend answered a primary fetch.
    SearchCompleted {
        seq: crate::RequestSeq,
        result: Result<crate::SearchPage, crate::SearchFailure>,
        now: crate::Timestamp,
    },
    /// Backend answered a background harvest.
    HarvestCompleted {
        category: crate::Category,
        result: Result<crate::HarvestReport, crate::SearchFailure>,
        now: crate::Timestamp,
    },
    /// Backend answered the health check.
    HealthLoaded(Result<crate::RepositoryStats, crate::SearchFailure>),
    /// Fallback for placeholder wiring.
    NoOp,
}
