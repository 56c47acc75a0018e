use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use scholar_logging::{scholar_debug, scholar_info};

use crate::client::{Backend, BackendSettings, ReqwestBackend};
use crate::{BackendError, EngineEvent, RequestSeq, SearchRequest, TimerToken};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not create backend client: {0}")]
    Backend(#[from] BackendError),
}

enum EngineCommand {
    Search { seq: RequestSeq, request: SearchRequest },
    Harvest { category: String },
    CheckHealth,
    StartTimer { token: TimerToken, delay: Duration },
}

/// Runs backend calls and timers on a tokio runtime owned by a worker thread.
///
/// Commands are fire-and-forget; every one of them eventually produces exactly
/// one `EngineEvent`, in completion order rather than submission order.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: BackendSettings) -> Result<Self, EngineError> {
        let backend = ReqwestBackend::new(settings)?;
        Self::with_backend(Arc::new(backend))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let backend = backend.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let event = handle_command(backend.as_ref(), command).await;
                    let _ = event_tx.send(event);
                });
            }
            scholar_info!("Engine command channel closed; shutting down runtime");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn search(&self, seq: RequestSeq, request: SearchRequest) {
        self.send(EngineCommand::Search { seq, request });
    }

    pub fn harvest(&self, category: impl Into<String>) {
        self.send(EngineCommand::Harvest {
            category: category.into(),
        });
    }

    pub fn check_health(&self) {
        self.send(EngineCommand::CheckHealth);
    }

    pub fn start_timer(&self, token: TimerToken, delay: Duration) {
        self.send(EngineCommand::StartTimer { token, delay });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

async fn handle_command(backend: &dyn Backend, command: EngineCommand) -> EngineEvent {
    match command {
        EngineCommand::Search { seq, request } => {
            let result = backend.search(&request).await;
            scholar_debug!("Search seq={} finished ok={}", seq, result.is_ok());
            EngineEvent::SearchCompleted { seq, result }
        }
        EngineCommand::Harvest { category } => {
            let result = backend.harvest(&category).await;
            EngineEvent::HarvestCompleted { category, result }
        }
        EngineCommand::CheckHealth => EngineEvent::HealthChecked(backend.health().await),
        EngineCommand::StartTimer { token, delay } => {
            tokio::time::sleep(delay).await;
            EngineEvent::TimerElapsed { token }
        }
    }
}
