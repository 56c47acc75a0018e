use std::sync::{Arc, Mutex};
use std::time::Duration;

use scholar_engine::{
    Backend, BackendError, EngineEvent, EngineHandle, HarvestOutcome, HealthReport, SearchPage,
    SearchRequest,
};

#[derive(Default)]
struct RecordingBackend {
    searches: Mutex<Vec<SearchRequest>>,
    harvests: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Backend for RecordingBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        self.searches.lock().unwrap().push(request.clone());
        // Earlier pages answer later so completion order differs from submission order.
        let delay = 200u64.saturating_sub(u64::from(request.page) * 80);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(SearchPage {
            page: request.page,
            ..SearchPage::default()
        })
    }

    async fn harvest(&self, category: &str) -> Result<HarvestOutcome, BackendError> {
        self.harvests.lock().unwrap().push(category.to_string());
        Ok(HarvestOutcome { new_records: 4 })
    }

    async fn health(&self) -> Result<HealthReport, BackendError> {
        Ok(HealthReport {
            total_records: 3,
            ..HealthReport::default()
        })
    }
}

fn collect(engine: &EngineHandle, count: usize) -> Vec<EngineEvent> {
    (0..count)
        .map(|_| {
            engine
                .recv_timeout(Duration::from_secs(5))
                .expect("engine event")
        })
        .collect()
}

#[test]
fn every_command_produces_one_event() {
    let backend = Arc::new(RecordingBackend::default());
    let engine = EngineHandle::with_backend(backend.clone()).expect("engine");

    engine.harvest("theses");
    engine.check_health();
    let mut events = collect(&engine, 2);
    events.sort_by_key(|event| matches!(event, EngineEvent::HealthChecked(_)));

    assert_eq!(
        events[0],
        EngineEvent::HarvestCompleted {
            category: "theses".to_string(),
            result: Ok(HarvestOutcome { new_records: 4 }),
        }
    );
    assert!(matches!(
        &events[1],
        EngineEvent::HealthChecked(Ok(report)) if report.total_records == 3
    ));
    assert_eq!(*backend.harvests.lock().unwrap(), vec!["theses".to_string()]);
    assert!(engine.try_recv().is_none());
}

#[test]
fn search_events_carry_their_sequence_numbers() {
    let backend = Arc::new(RecordingBackend::default());
    let engine = EngineHandle::with_backend(backend.clone()).expect("engine");

    for (seq, page) in [(1u64, 1u32), (2, 2)] {
        engine.search(
            seq,
            SearchRequest {
                page,
                ..SearchRequest::default()
            },
        );
    }

    let events = collect(&engine, 2);
    let seqs: Vec<_> = events
        .iter()
        .map(|event| match event {
            EngineEvent::SearchCompleted { seq, result } => {
                let page = result.as_ref().expect("ok").page;
                assert_eq!(u64::from(page), *seq);
                *seq
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(seqs, vec![2, 1], "later request completed first");
    assert_eq!(backend.searches.lock().unwrap().len(), 2);
}

#[test]
fn timers_fire_after_their_delay() {
    let engine = EngineHandle::with_backend(Arc::new(RecordingBackend::default())).expect("engine");

    engine.start_timer(9, Duration::from_millis(120));
    engine.start_timer(8, Duration::from_millis(10));

    assert!(engine.try_recv().is_none());
    let events = collect(&engine, 2);
    assert_eq!(
        events,
        vec![
            EngineEvent::TimerElapsed { token: 8 },
            EngineEvent::TimerElapsed { token: 9 },
        ]
    );
}
