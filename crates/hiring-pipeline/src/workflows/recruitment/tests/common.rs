use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;

use crate::workflows::recruitment::{
    ApplicationId, InMemoryProcessRepository, LedgerEntry, LedgerEntryId, NotificationDispatcher,
    PostingId, ProcessCommit, ProcessFilter, ProcessId, ProcessOrchestrator, ProcessOrder,
    ProcessRecord, ProcessRepository, RepositoryError, SequentialIdGenerator, Stage, StageNotice,
    TransitionRequest, UserId,
};

pub(super) const APPLICATION: ApplicationId = ApplicationId(1);
pub(super) const POSTING: PostingId = PostingId(100);
pub(super) const APPLICANT: UserId = UserId(200);
pub(super) const REVIEWER: UserId = UserId(900);

/// Stages walked by a candidate who is hired after two interview rounds.
pub(super) const HIRED_PATH: [Stage; 8] = [
    Stage::DocumentReview,
    Stage::DocumentPass,
    Stage::Interview1,
    Stage::Interview1Pass,
    Stage::Interview2,
    Stage::Interview2Pass,
    Stage::FinalReview,
    Stage::FinalPass,
];

pub(super) type MemoryOrchestrator =
    ProcessOrchestrator<InMemoryProcessRepository, RecordingDispatcher>;

pub(super) fn build_service() -> (
    MemoryOrchestrator,
    Arc<InMemoryProcessRepository>,
    Arc<RecordingDispatcher>,
) {
    let repository = Arc::new(InMemoryProcessRepository::default());
    let notifier = Arc::new(RecordingDispatcher::default());
    let service = ProcessOrchestrator::new(
        repository.clone(),
        Arc::new(SequentialIdGenerator::default()),
        notifier.clone(),
    );
    (service, repository, notifier)
}

pub(super) fn service_over<R>(repository: Arc<R>) -> ProcessOrchestrator<R, RecordingDispatcher>
where
    R: ProcessRepository + 'static,
{
    ProcessOrchestrator::new(
        repository,
        Arc::new(SequentialIdGenerator::default()),
        Arc::new(RecordingDispatcher::default()),
    )
}

pub(super) fn walk<R>(
    service: &ProcessOrchestrator<R, RecordingDispatcher>,
    process_id: ProcessId,
    stages: &[Stage],
) -> ProcessRecord
where
    R: ProcessRepository + 'static,
{
    let mut last = None;
    for stage in stages {
        let record = service
            .transition(process_id, TransitionRequest::to(*stage).by(REVIEWER))
            .unwrap_or_else(|err| panic!("transition to {stage} failed: {err}"));
        last = Some(record);
    }
    last.expect("at least one stage")
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    notices: Mutex<Vec<StageNotice>>,
}

impl RecordingDispatcher {
    pub(super) fn notices(&self) -> Vec<StageNotice> {
        self.notices.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, notice: StageNotice) {
        self.notices
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notice);
    }
}

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

pub(super) struct UnavailableRepository;

impl ProcessRepository for UnavailableRepository {
    fn create(&self, _: ProcessRecord, _: LedgerEntry) -> Result<ProcessRecord, RepositoryError> {
        unavailable()
    }

    fn commit(&self, _: ProcessCommit) -> Result<(), RepositoryError> {
        unavailable()
    }

    fn fetch(&self, _: ProcessId) -> Result<Option<ProcessRecord>, RepositoryError> {
        unavailable()
    }

    fn fetch_by_application(
        &self,
        _: ApplicationId,
    ) -> Result<Option<ProcessRecord>, RepositoryError> {
        unavailable()
    }

    fn remove(&self, _: ProcessId, _: u64) -> Result<ProcessRecord, RepositoryError> {
        unavailable()
    }

    fn list(&self, _: &ProcessFilter, _: ProcessOrder) -> Result<Vec<ProcessRecord>, RepositoryError> {
        unavailable()
    }

    fn stage_counts(&self, _: &ProcessFilter) -> Result<BTreeMap<Stage, u64>, RepositoryError> {
        unavailable()
    }

    fn history(&self, _: ProcessId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        unavailable()
    }

    fn history_by_application(&self, _: ApplicationId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        unavailable()
    }
}

/// In-memory store whose first `conflicts` commits lose a simulated race.
///
/// When `interloper` is set, the first commit first moves the stored record to that stage,
/// the way a concurrent reviewer would, and then reports the version conflict.
#[derive(Default)]
pub(super) struct ConflictingRepository {
    pub(super) inner: InMemoryProcessRepository,
    conflicts: AtomicUsize,
    attempts: AtomicUsize,
    interloper: Mutex<Option<Stage>>,
}

impl ConflictingRepository {
    pub(super) fn with_conflicts(conflicts: usize) -> Self {
        Self {
            conflicts: AtomicUsize::new(conflicts),
            ..Self::default()
        }
    }

    pub(super) fn with_interloper(stage: Stage) -> Self {
        Self {
            conflicts: AtomicUsize::new(1),
            interloper: Mutex::new(Some(stage)),
            ..Self::default()
        }
    }

    pub(super) fn commit_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn interfere(&self, id: ProcessId) -> Result<(), RepositoryError> {
        let stage = self
            .interloper
            .lock()
            .expect("interloper mutex poisoned")
            .take();
        let (Some(stage), Some(stored)) = (stage, self.inner.fetch(id)?) else {
            return Ok(());
        };

        let mut moved = stored.clone();
        let from = moved.current_stage();
        moved.transition(stage).expect("interloper moves legally");
        let entry = LedgerEntry::transition(
            LedgerEntryId(u64::MAX),
            &moved,
            from,
            Some(UserId(1)),
            None,
            None,
        );
        self.inner.commit(ProcessCommit {
            record: moved,
            expected_version: stored.version(),
            entry,
        })
    }
}

impl ProcessRepository for ConflictingRepository {
    fn create(
        &self,
        record: ProcessRecord,
        opening: LedgerEntry,
    ) -> Result<ProcessRecord, RepositoryError> {
        self.inner.create(record, opening)
    }

    fn commit(&self, commit: ProcessCommit) -> Result<(), RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            self.interfere(commit.record.id())?;
            return Err(RepositoryError::VersionConflict);
        }
        self.inner.commit(commit)
    }

    fn fetch(&self, id: ProcessId) -> Result<Option<ProcessRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn fetch_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<ProcessRecord>, RepositoryError> {
        self.inner.fetch_by_application(application_id)
    }

    fn remove(&self, id: ProcessId, expected_version: u64) -> Result<ProcessRecord, RepositoryError> {
        self.inner.remove(id, expected_version)
    }

    fn list(
        &self,
        filter: &ProcessFilter,
        order: ProcessOrder,
    ) -> Result<Vec<ProcessRecord>, RepositoryError> {
        self.inner.list(filter, order)
    }

    fn stage_counts(&self, filter: &ProcessFilter) -> Result<BTreeMap<Stage, u64>, RepositoryError> {
        self.inner.stage_counts(filter)
    }

    fn history(&self, id: ProcessId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        self.inner.history(id)
    }

    fn history_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        self.inner.history_by_application(application_id)
    }
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("valid request")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub(super) async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
