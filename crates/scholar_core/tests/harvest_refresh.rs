use std::sync::Once;

use scholar_core::{
    update, AppState, Category, DisplayState, Effect, FailureKind, HarvestPolicy, HarvestReport,
    HarvestSkip, HarvestStatus, Msg, RequestSeq, ResultRecord, SearchFailure, SearchPage,
    Settings, Timestamp,
};

const INTERVAL: u64 = 60_000;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scholar_logging::initialize_for_tests);
}

fn state_for(category: Category) -> AppState {
    AppState::with_settings(
        Settings {
            page_size: 10,
            harvest_interval_ms: INTERVAL,
            debounce_ms: 300,
        },
        category,
    )
}

fn fetches(effects: &[Effect]) -> Vec<(RequestSeq, HarvestPolicy)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::FetchPage { seq, harvest, .. } => Some((*seq, *harvest)),
            _ => None,
        })
        .collect()
}

fn harvests(effects: &[Effect]) -> Vec<Category> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Harvest { category } => Some(*category),
            _ => None,
        })
        .collect()
}

fn page(titles: &[&str]) -> SearchPage {
    SearchPage {
        results: titles
            .iter()
            .map(|title| ResultRecord {
                title: Some(title.to_string()),
                ..ResultRecord::default()
            })
            .collect(),
        total: titles.len() as u64,
        page: 1,
        ..SearchPage::default()
    }
}

/// Submits `query` and completes the primary fetch at `now`, returning the effects of completion.
fn search_and_complete(
    state: AppState,
    query: &str,
    now: Timestamp,
    titles: &[&str],
) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::InputChanged(query.to_string()));
    let (state, effects) = update(state, Msg::SearchSubmitted);
    let (seq, _) = fetches(&effects)[0];
    update(
        state,
        Msg::SearchCompleted {
            seq,
            result: Ok(page(titles)),
            now,
        },
    )
}

#[test]
fn harvest_is_dispatched_only_after_primary_fetch_completes() {
    init_logging();
    let (state, _) = update(state_for(Category::Theses), Msg::InputChanged("q".into()));
    let (state, effects) = update(state, Msg::SearchSubmitted);
    assert!(harvests(&effects).is_empty());
    assert_eq!(fetches(&effects).len(), 1);

    let (seq, _) = fetches(&effects)[0];
    let (state, effects) = update(
        state,
        Msg::SearchCompleted {
            seq,
            result: Ok(page(&["cached"])),
            now: 1_000,
        },
    );
    assert_eq!(harvests(&effects), vec![Category::Theses]);
    assert_eq!(state.view().cards[0].title, "cached");
    assert_eq!(
        state.view().harvest_status,
        HarvestStatus::Running {
            category: Category::Theses
        }
    );
    assert!(!state.is_settled());
}

#[test]
fn harvest_with_new_records_triggers_exactly_one_silent_refresh() {
    init_logging();
    let (state, effects) = search_and_complete(state_for(Category::All), "q", 0, &["cached"]);
    assert_eq!(harvests(&effects), vec![Category::All]);

    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Ok(HarvestReport { new_records: 3 }),
            now: 5_000,
        },
    );
    let refreshes = fetches(&effects);
    assert_eq!(refreshes.len(), 1);
    assert!(harvests(&effects).is_empty());
    let (seq, policy) = refreshes[0];
    assert_eq!(policy, HarvestPolicy::Suppress);
    assert_eq!(state.gate().last_harvest(), Some(5_000));

    let view = state.view();
    assert!(view.refreshing);
    assert!(!view.loading);
    assert_eq!(view.cards[0].title, "cached", "cached results stay visible");

    // Completing the refresh long after the interval still must not harvest again.
    let (state, effects) = update(
        state,
        Msg::SearchCompleted {
            seq,
            result: Ok(page(&["fresh", "cached"])),
            now: 5_000 + 10 * INTERVAL,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().cards[0].title, "fresh");
    assert!(state.is_settled());
}

#[test]
fn harvest_without_new_records_does_not_refresh() {
    init_logging();
    let (state, _) = search_and_complete(state_for(Category::All), "q", 0, &["a"]);
    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Ok(HarvestReport { new_records: 0 }),
            now: 100,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().harvest_status, HarvestStatus::UpToDate);
    assert_eq!(state.gate().last_harvest(), Some(100));
}

#[test]
fn maybe_harvest_is_noop_within_interval_for_any_category_or_query() {
    init_logging();
    let (state, _) = search_and_complete(state_for(Category::All), "q", 0, &["a"]);
    let (mut state, _) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Ok(HarvestReport { new_records: 0 }),
            now: 1_000,
        },
    );

    let mut now = 1_000;
    for (category, query) in [
        (Category::Theses, "alpha"),
        (Category::Articles, ""),
        (Category::Research, "gamma"),
        (Category::All, "delta"),
    ] {
        now += 1_000;
        let (next, effects) = update(state, Msg::CategorySelected(category));
        let (next, _) = update(next, Msg::InputChanged(query.to_string()));
        let (next, effects2) = update(next, Msg::SearchSubmitted);
        let seq = fetches(&effects2)
            .into_iter()
            .chain(fetches(&effects))
            .map(|(seq, _)| seq)
            .max()
            .expect("fetch issued");
        let (next, effects) = update(
            next,
            Msg::SearchCompleted {
                seq,
                result: Ok(page(&["a"])),
                now,
            },
        );
        assert!(harvests(&effects).is_empty(), "{category:?} harvested early");
        assert!(matches!(
            next.view().harvest_status,
            HarvestStatus::Skipped(HarvestSkip::CoolingDown { .. })
        ));
        state = next;
    }

    let (_, effects) = search_and_complete(state, "late", 1_000 + INTERVAL, &["a"]);
    assert_eq!(harvests(&effects).len(), 1);
}

#[test]
fn second_harvest_never_overlaps_outstanding_one() {
    init_logging();
    let (state, effects) = search_and_complete(state_for(Category::All), "one", 0, &["a"]);
    assert_eq!(harvests(&effects).len(), 1);

    let (state, effects) = search_and_complete(state, "two", INTERVAL * 3, &["b"]);
    assert!(harvests(&effects).is_empty());
    assert_eq!(
        state.view().harvest_status,
        HarvestStatus::Running {
            category: Category::All
        }
    );
}

/// Starts on page 1 of 3, with the first harvest outstanding, then asks for page 2.
fn paging_while_harvesting() -> (AppState, RequestSeq) {
    let (state, _) = update(state_for(Category::All), Msg::InputChanged("q".into()));
    let (state, effects) = update(state, Msg::SearchSubmitted);
    let (seq, _) = fetches(&effects)[0];
    let mut first = page(&["p1-0", "p1-1"]);
    first.total = 25;
    let (state, effects) = update(
        state,
        Msg::SearchCompleted {
            seq,
            result: Ok(first),
            now: 0,
        },
    );
    assert_eq!(harvests(&effects).len(), 1);

    let (state, effects) = update(state, Msg::NextPage);
    let (seq, policy) = fetches(&effects)[0];
    assert_eq!(policy, HarvestPolicy::Allow);
    (state, seq)
}

#[test]
fn refresh_during_user_fetch_keeps_error_panel() {
    init_logging();
    let (state, user_seq) = paging_while_harvesting();

    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Ok(HarvestReport { new_records: 5 }),
            now: 10,
        },
    );
    let refetch = fetches(&effects);
    assert_eq!(refetch.len(), 1);
    let (refresh_seq, policy) = refetch[0];
    assert_eq!(policy, HarvestPolicy::Suppress);
    assert!(state.view().loading);
    assert!(!state.view().refreshing);

    let (state, _) = update(
        state,
        Msg::SearchCompleted {
            seq: user_seq,
            result: Ok(page(&["stale"])),
            now: 20,
        },
    );
    let (state, effects) = update(
        state,
        Msg::SearchCompleted {
            seq: refresh_seq,
            result: Err(SearchFailure::new(FailureKind::Transport, "down")),
            now: 30,
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.pagination.page, 2);
    assert!(matches!(view.display, DisplayState::Error(_)));
    assert!(view.cards.is_empty());
}

#[test]
fn refresh_during_user_fetch_shows_requested_page() {
    init_logging();
    let (state, _) = paging_while_harvesting();

    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Ok(HarvestReport { new_records: 5 }),
            now: 10,
        },
    );
    let (refresh_seq, _) = fetches(&effects)[0];
    let mut second = page(&["p2-0"]);
    second.total = 30;
    second.page = 2;
    let (state, effects) = update(
        state,
        Msg::SearchCompleted {
            seq: refresh_seq,
            result: Ok(second),
            now: 20,
        },
    );

    assert!(harvests(&effects).is_empty());
    let view = state.view();
    assert_eq!(view.pagination.page, 2);
    assert_eq!(view.cards[0].title, "p2-0");
    assert_eq!(view.harvest_status, HarvestStatus::Added { new_records: 5 });
    assert!(state.is_settled());
}

#[test]
fn failed_harvest_keeps_results_and_timestamp() {
    init_logging();
    let (state, _) = search_and_complete(state_for(Category::All), "q", 0, &["cached"]);
    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Err(SearchFailure::new(FailureKind::Transport, "timeout")),
            now: 500,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.gate().last_harvest(), None);
    assert_eq!(state.view().display, DisplayState::Results);
    assert_eq!(state.view().cards[0].title, "cached");
    assert!(matches!(
        state.view().harvest_status,
        HarvestStatus::Failed(_)
    ));

    // A failure holds the gate closed for a full interval.
    let (state, effects) = search_and_complete(state, "again", 600, &["cached"]);
    assert!(harvests(&effects).is_empty());
    assert_eq!(
        state.view().harvest_status,
        HarvestStatus::Skipped(HarvestSkip::CoolingDown {
            remaining_ms: INTERVAL - 100
        })
    );

    let (_, effects) = search_and_complete(state, "later", 500 + INTERVAL, &["cached"]);
    assert_eq!(harvests(&effects).len(), 1);
}

#[test]
fn typing_after_failed_harvest_does_not_hammer_backend() {
    init_logging();
    let (state, effects) = search_and_complete(state_for(Category::All), "q", 1_000, &["a"]);
    assert_eq!(harvests(&effects).len(), 1);
    let (mut state, _) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Err(SearchFailure::new(FailureKind::Transport, "down")),
            now: 1_050,
        },
    );

    for (i, query) in ["qu", "que", "quer", "query"].into_iter().enumerate() {
        let (next, effects) = search_and_complete(state, query, 1_100 + i as u64, &["a"]);
        assert!(harvests(&effects).is_empty(), "{query} harvested again");
        state = next;
    }
}

#[test]
fn failed_refresh_keeps_cached_results() {
    init_logging();
    let (state, _) = search_and_complete(state_for(Category::All), "q", 0, &["cached"]);
    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::All,
            result: Ok(HarvestReport { new_records: 1 }),
            now: 10,
        },
    );
    let (seq, _) = fetches(&effects)[0];
    let (state, effects) = update(
        state,
        Msg::SearchCompleted {
            seq,
            result: Err(SearchFailure::new(FailureKind::HttpStatus(500), "boom")),
            now: 20,
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.display, DisplayState::Results);
    assert_eq!(view.cards[0].title, "cached");
    assert!(matches!(view.harvest_status, HarvestStatus::RefreshFailed(_)));
}

#[test]
fn live_only_category_never_harvests() {
    init_logging();
    let (state, effects) = search_and_complete(state_for(Category::Elis), "libraries", 0, &["x"]);
    assert!(harvests(&effects).is_empty());
    assert_eq!(state.view().harvest_status, HarvestStatus::Idle);
    assert!(state.view().facets.is_empty());
}

#[test]
fn harvest_for_other_category_does_not_refresh_current_tab() {
    init_logging();
    let (state, effects) = search_and_complete(state_for(Category::Theses), "q", 0, &["t"]);
    assert_eq!(harvests(&effects), vec![Category::Theses]);

    let (state, _) = update(state, Msg::CategorySelected(Category::Articles));
    let (state, effects) = update(
        state,
        Msg::HarvestCompleted {
            category: Category::Theses,
            result: Ok(HarvestReport { new_records: 9 }),
            now: 50,
        },
    );
    assert!(fetches(&effects).is_empty());
    assert_eq!(state.gate().last_harvest(), Some(50));
}
