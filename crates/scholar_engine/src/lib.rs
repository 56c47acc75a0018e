//! Scholar engine: backend API client and effect execution.
mod client;
mod engine;
mod types;

pub use client::{ApiFlavor, Backend, BackendSettings, ReqwestBackend};
pub use engine::{EngineError, EngineHandle};
pub use types::{
    BackendError, EngineEvent, FacetCount, FacetMap, FailureKind, HarvestOutcome, HealthReport,
    RecordDto, RequestSeq, SearchPage, SearchRequest, TimerToken,
};
