//! Scholar core: pure search controller state machine and view-model helpers.
mod effect;
mod gate;
mod msg;
mod record;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, HarvestPolicy};
pub use gate::{HarvestGate, HarvestSkip};
pub use msg::Msg;
pub use record::{
    FacetOption, Facets, FailureKind, HarvestReport, RepositoryStats, ResultRecord, SearchFailure,
    SearchPage,
};
pub use state::{
    AppState, Category, DebounceToken, DisplayState, FilterKey, Filters, HarvestStatus,
    RequestSeq, SearchState, Settings, Timestamp,
};
pub use update::update;
pub use view_model::{
    total_pages, AppViewModel, FacetOptionView, FacetView, LinkAction, Pagination,
    ResultCardView, DESCRIPTION_LIMIT, UNTITLED,
};
