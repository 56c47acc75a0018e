use std::cell::Cell;
use std::time::{Duration, Instant};

use scholar_core::{
    Category, Effect, FacetOption, Facets, FailureKind, FilterKey, HarvestReport, Msg,
    RepositoryStats, ResultRecord, SearchFailure, SearchPage, SearchState, Timestamp,
};
use scholar_engine::{
    BackendError, EngineEvent, EngineHandle, HarvestOutcome, HealthReport, RecordDto,
    SearchRequest,
};
use scholar_logging::{scholar_debug, scholar_info, scholar_warn};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    started: Instant,
    /// Category of the harvest in flight; the gate allows at most one.
    pending_harvest: Cell<Option<Category>>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            started: Instant::now(),
            pending_harvest: Cell::new(None),
        }
    }

    /// Milliseconds since the runner was created.
    pub fn now(&self) -> Timestamp {
        self.started.elapsed().as_millis() as Timestamp
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleDebounce { token, delay_ms } => {
                    self.engine
                        .start_timer(token, Duration::from_millis(delay_ms));
                }
                Effect::FetchPage {
                    seq,
                    request,
                    harvest,
                } => {
                    scholar_info!(
                        "FetchPage seq={} category={} page={} harvest={:?}",
                        seq,
                        request.category.as_str(),
                        request.page,
                        harvest
                    );
                    self.engine.search(seq, to_search_request(&request));
                }
                Effect::Harvest { category } => {
                    scholar_info!("Harvest category={}", category.as_str());
                    self.pending_harvest.set(Some(category));
                    self.engine.harvest(category.as_str());
                }
                Effect::CheckHealth => self.engine.check_health(),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        Some(self.map_event(event))
    }

    fn map_event(&self, event: EngineEvent) -> Msg {
        let now = self.now();
        match event {
            EngineEvent::TimerElapsed { token } => Msg::DebounceElapsed { token },
            EngineEvent::SearchCompleted { seq, result } => Msg::SearchCompleted {
                seq,
                result: result.map(map_page).map_err(map_failure),
                now,
            },
            EngineEvent::HarvestCompleted { category, result } => {
                let pending = self.pending_harvest.take();
                match (Category::parse(&category), pending) {
                    (Some(category), _) => Msg::HarvestCompleted {
                        category,
                        result: result.map(map_harvest).map_err(map_failure),
                        now,
                    },
                    (None, Some(pending)) => {
                        scholar_warn!("Harvest finished for unknown category {:?}", category);
                        Msg::HarvestCompleted {
                            category: pending,
                            result: Err(SearchFailure::new(
                                FailureKind::Malformed,
                                format!("harvest answered for unknown category {category:?}"),
                            )),
                            now,
                        }
                    }
                    (None, None) => {
                        scholar_warn!("Unexpected harvest completion for {:?}", category);
                        Msg::NoOp
                    }
                }
            }
            EngineEvent::HealthChecked(result) => {
                Msg::HealthLoaded(result.map(map_health).map_err(map_failure))
            }
        }
    }
}

pub(crate) fn to_search_request(state: &SearchState) -> SearchRequest {
    SearchRequest {
        category: state.category.as_str().to_string(),
        query: state.query.clone(),
        page: state.page,
        page_size: state.page_size,
        filters: state
            .filters
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value.to_string()))
            .collect(),
        live: state.category.is_live_only(),
    }
}

pub(crate) fn map_page(page: scholar_engine::SearchPage) -> SearchPage {
    let mut facets = Facets::new();
    for (name, options) in page.facets {
        let Some(key) = FilterKey::parse(&name) else {
            scholar_debug!("Ignoring unknown facet {:?}", name);
            continue;
        };
        facets.entry(key).or_default().extend(
            options
                .into_iter()
                .map(|option| FacetOption {
                    value: option.value,
                    count: option.count,
                }),
        );
    }

    SearchPage {
        results: page.results.into_iter().map(map_record).collect(),
        total: page.total,
        page: page.page,
        facets,
    }
}

fn map_record(record: RecordDto) -> ResultRecord {
    ResultRecord {
        title: record.title,
        authors: record.authors,
        description: record.description,
        source: record.source,
        institution: record.institution,
        kind: record.kind,
        year: record.year,
        identifier: record.identifier,
        url: record.url,
    }
}

fn map_harvest(outcome: HarvestOutcome) -> HarvestReport {
    HarvestReport {
        new_records: outcome.new_records,
    }
}

fn map_health(report: HealthReport) -> RepositoryStats {
    RepositoryStats {
        total_records: report.total_records,
        theses: report.theses,
        articles: report.articles,
        research: report.research,
        last_harvest: report.last_harvest,
        includes_elis: report.includes_elis,
    }
}

pub(crate) fn map_failure(err: BackendError) -> SearchFailure {
    use scholar_engine::FailureKind as Engine;

    let kind = match err.kind {
        Engine::HttpStatus(code) => FailureKind::HttpStatus(code),
        Engine::MalformedResponse => FailureKind::Malformed,
        Engine::Application => FailureKind::Application,
        Engine::InvalidUrl | Engine::Timeout | Engine::TooLarge { .. } | Engine::Network => {
            FailureKind::Transport
        }
    };
    let message = match kind {
        FailureKind::Application => err.message,
        _ => err.to_string(),
    };
    SearchFailure::new(kind, message)
}
