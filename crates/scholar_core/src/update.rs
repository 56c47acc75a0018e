use scholar_logging::{scholar_debug, scholar_info, scholar_warn};

use crate::state::InFlight;
use crate::{
    AppState, Category, Effect, HarvestPolicy, HarvestReport, HarvestSkip, HarvestStatus, Msg,
    RequestSeq, SearchFailure, SearchPage, Timestamp,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => vec![Effect::CheckHealth],
        Msg::InputChanged(text) => {
            state.input = text;
            state.mark_dirty();
            let token = state.next_debounce_token();
            vec![Effect::ScheduleDebounce {
                token,
                delay_ms: state.settings.debounce_ms,
            }]
        }
        Msg::DebounceElapsed { token } => {
            if state.take_debounce(token) {
                state.commit_input();
                search(&mut state, 1, HarvestPolicy::Allow)
            } else {
                Vec::new()
            }
        }
        Msg::SearchSubmitted => {
            state.cancel_debounce();
            state.commit_input();
            search(&mut state, 1, HarvestPolicy::Allow)
        }
        Msg::PageRequested(page) => request_page(&mut state, page),
        Msg::NextPage => {
            let page = state.search.page.saturating_add(1);
            request_page(&mut state, page)
        }
        Msg::PrevPage => {
            let page = state.search.page.saturating_sub(1);
            request_page(&mut state, page)
        }
        Msg::FilterChanged { key, value } => {
            if state.search.filters.set(key, value) {
                search(&mut state, 1, HarvestPolicy::Allow)
            } else {
                Vec::new()
            }
        }
        Msg::FiltersCleared => {
            if state.search.filters.clear() {
                search(&mut state, 1, HarvestPolicy::Allow)
            } else {
                Vec::new()
            }
        }
        Msg::CategorySelected(category) => {
            if category == state.search.category {
                Vec::new()
            } else {
                state.reset_for_category(category);
                search(&mut state, 1, HarvestPolicy::Allow)
            }
        }
        Msg::SearchCompleted { seq, result, now } => {
            on_search_completed(&mut state, seq, result, now)
        }
        Msg::HarvestCompleted {
            category,
            result,
            now,
        } => on_harvest_completed(&mut state, category, result, now),
        Msg::HealthLoaded(result) => {
            match result {
                Ok(stats) => {
                    state.stats = Some(stats);
                    state.mark_dirty();
                }
                Err(failure) => scholar_warn!("Health check failed: {}", failure),
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Issues a primary fetch for the current search tuple at `page`.
///
/// A live-only category with an empty query renders the prompt and sends
/// nothing. The sequence number is bumped in both cases so a response still
/// in flight can no longer land on screen.
fn search(state: &mut AppState, page: u32, harvest: HarvestPolicy) -> Vec<Effect> {
    issue_fetch(state, page, harvest, harvest == HarvestPolicy::Allow)
}

/// `interactive` fetches show the loading state and report failures in the
/// error panel; the others keep the current results on screen.
fn issue_fetch(
    state: &mut AppState,
    page: u32,
    harvest: HarvestPolicy,
    interactive: bool,
) -> Vec<Effect> {
    state.search.page = page.max(1);
    let seq = state.issue_seq();

    if state.search.needs_query() {
        scholar_debug!(
            "Skipping fetch seq={}: {} needs a query",
            seq,
            state.search.category
        );
        state.in_flight = None;
        state.show_prompt();
        return Vec::new();
    }

    scholar_debug!(
        "Fetch seq={} category={} page={} query_len={} filters={} harvest={:?} interactive={}",
        seq,
        state.search.category.as_str(),
        state.search.page,
        state.search.query.len(),
        state.search.filters.len(),
        harvest,
        interactive
    );
    state.in_flight = Some(InFlight {
        seq,
        harvest,
        interactive,
    });
    state.mark_dirty();
    vec![Effect::FetchPage {
        seq,
        request: state.search.clone(),
        harvest,
    }]
}

fn request_page(state: &mut AppState, page: u32) -> Vec<Effect> {
    let pagination = state.pagination();
    if page < 1 || page > pagination.total_pages || page == state.search.page {
        return Vec::new();
    }
    search(state, page, HarvestPolicy::Allow)
}

fn on_search_completed(
    state: &mut AppState,
    seq: RequestSeq,
    result: Result<SearchPage, SearchFailure>,
    now: Timestamp,
) -> Vec<Effect> {
    let in_flight = match state.in_flight {
        Some(in_flight) if in_flight.seq == seq => in_flight,
        _ => {
            scholar_debug!(
                "Discarding stale response seq={} (latest={})",
                seq,
                state.last_seq
            );
            return Vec::new();
        }
    };
    state.in_flight = None;

    match (result, in_flight.interactive) {
        (Ok(page), _) => {
            scholar_debug!(
                "Fetch seq={} returned {} of {} records",
                seq,
                page.results.len(),
                page.total
            );
            state.apply_page(page);
        }
        (Err(failure), true) => {
            scholar_warn!("Search seq={} failed: {}", seq, failure);
            state.show_error(failure);
            return Vec::new();
        }
        (Err(failure), false) => {
            scholar_warn!("Refresh seq={} failed, keeping cached results: {}", seq, failure);
            state.harvest_status = HarvestStatus::RefreshFailed(failure.to_string());
            state.mark_dirty();
            return Vec::new();
        }
    }

    if in_flight.harvest == HarvestPolicy::Allow && state.search.category.supports_harvest() {
        maybe_harvest(state, now)
    } else {
        Vec::new()
    }
}

fn maybe_harvest(state: &mut AppState, now: Timestamp) -> Vec<Effect> {
    let category = state.search.category;
    match state.gate.try_begin(now) {
        Ok(()) => {
            scholar_info!("Starting background harvest for {}", category.as_str());
            state.harvest_status = HarvestStatus::Running { category };
            state.mark_dirty();
            vec![Effect::Harvest { category }]
        }
        Err(HarvestSkip::Outstanding) => {
            scholar_debug!("Harvest skipped: {}", HarvestSkip::Outstanding);
            Vec::new()
        }
        Err(skip) => {
            scholar_debug!("Harvest skipped: {}", skip);
            state.harvest_status = HarvestStatus::Skipped(skip);
            Vec::new()
        }
    }
}

fn on_harvest_completed(
    state: &mut AppState,
    category: Category,
    result: Result<HarvestReport, SearchFailure>,
    now: Timestamp,
) -> Vec<Effect> {
    state.mark_dirty();
    let report = match result {
        Ok(report) => report,
        Err(failure) => {
            scholar_warn!("Harvest for {} failed: {}", category.as_str(), failure);
            state.gate.complete_failure(now);
            state.harvest_status = HarvestStatus::Failed(failure.to_string());
            return Vec::new();
        }
    };

    state.gate.complete_success(now);
    if report.new_records == 0 {
        scholar_info!("Harvest for {} found nothing new", category.as_str());
        state.harvest_status = HarvestStatus::UpToDate;
        return Vec::new();
    }

    scholar_info!(
        "Harvest for {} added {} records",
        category.as_str(),
        report.new_records
    );
    state.harvest_status = HarvestStatus::Added {
        new_records: report.new_records,
    };
    if category != state.search.category {
        scholar_debug!(
            "Harvested {} but {} is showing; no refresh",
            category.as_str(),
            state.search.category.as_str()
        );
        return Vec::new();
    }

    // A user fetch still in flight predates the harvest. Replace it with a
    // refresh of the same tuple that keeps its loading state and error panel.
    let interactive = matches!(state.in_flight, Some(f) if f.interactive);
    if interactive {
        scholar_debug!("Reissuing in-flight user fetch after harvest, without harvesting");
    }
    let page = state.search.page;
    issue_fetch(state, page, HarvestPolicy::Suppress, interactive)
}
