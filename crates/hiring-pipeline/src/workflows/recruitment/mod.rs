//! Recruitment process state machine: stage catalog, process records, the transition
//! ledger, and the orchestrator that owns every write to them.

pub mod ids;
pub mod ledger;
pub mod memory;
pub mod notification;
pub mod process;
pub mod repository;
pub mod router;
pub mod service;
pub mod stage;
pub mod stats;
pub mod views;

#[cfg(test)]
mod tests;

pub use ids::{IdGenerator, InvalidNodeId, SequentialIdGenerator, SnowflakeGenerator};
pub use ledger::{LedgerEntry, TransitionLedger, OPENING_REASON};
pub use memory::InMemoryProcessRepository;
pub use notification::{
    spawn_dispatcher, NoopDispatcher, NotificationCategory, NotificationDispatcher,
    NotificationError, NotificationSink, QueuedDispatcher, StageNotice,
};
pub use process::{
    ApplicationId, IllegalTransition, LedgerEntryId, PostingId, ProcessId, ProcessRecord, UserId,
};
pub use repository::{
    ProcessCommit, ProcessFilter, ProcessOrder, ProcessRepository, RepositoryError,
};
pub use router::process_router;
pub use service::{ProcessLookup, ProcessOrchestrator, ProcessServiceError, TransitionRequest};
pub use stage::{Stage, StageClass, StageDefinition, UnknownStage};
pub use stats::{pass_rate, PostingStats, StatisticsAggregator, UserStats};
pub use views::{HistoryEntryView, ProcessPage, ProcessView, StageInfoView};
