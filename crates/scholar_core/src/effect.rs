use crate::{Category, DebounceToken, RequestSeq, SearchState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `Msg::DebounceElapsed { token }` after `delay_ms`.
    ScheduleDebounce { token: DebounceToken, delay_ms: u64 },
    /// Primary fetch; answer with `Msg::SearchCompleted { seq, .. }`.
    FetchPage {
        seq: RequestSeq,
        request: SearchState,
        harvest: HarvestPolicy,
    },
    /// Background incremental harvest; answer with `Msg::HarvestCompleted`.
    Harvest { category: Category },
    CheckHealth,
}

/// Whether a completed primary fetch may go on to start a background harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestPolicy {
    Allow,
    /// Silent refresh after a harvest; must never harvest again.
    Suppress,
}
