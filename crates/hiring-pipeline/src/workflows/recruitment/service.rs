use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::ids::IdGenerator;
use super::ledger::LedgerEntry;
use super::notification::{NotificationDispatcher, StageNotice};
use super::process::{
    ApplicationId, IllegalTransition, LedgerEntryId, PostingId, ProcessId, ProcessRecord, UserId,
};
use super::repository::{
    ProcessCommit, ProcessFilter, ProcessOrder, ProcessRepository, RepositoryError,
};
use super::stage::Stage;
use super::stats::{PostingStats, StatisticsAggregator, UserStats};
use super::views::{stage_catalog, ProcessPage, ProcessView, StageInfoView};

pub const DEFAULT_TRANSITION_ATTEMPTS: u8 = 3;

/// Requested stage change plus the audit context stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransitionRequest {
    pub to: Stage,
    #[serde(default)]
    pub actor_id: Option<UserId>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TransitionRequest {
    pub fn to(stage: Stage) -> Self {
        Self {
            to: stage,
            actor_id: None,
            reason: None,
            note: None,
        }
    }

    pub fn by(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Key a caller used to address a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessLookup {
    Process(ProcessId),
    Application(ApplicationId),
}

impl fmt::Display for ProcessLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessLookup::Process(id) => write!(f, "process {id}"),
            ProcessLookup::Application(id) => write!(f, "application {id}"),
        }
    }
}

/// Service owning every process record and ledger write.
pub struct ProcessOrchestrator<R, N> {
    repository: Arc<R>,
    ids: Arc<dyn IdGenerator>,
    notifier: Arc<N>,
    stats: StatisticsAggregator<R>,
    max_attempts: u8,
}

impl<R, N> ProcessOrchestrator<R, N>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, ids: Arc<dyn IdGenerator>, notifier: Arc<N>) -> Self {
        Self {
            stats: StatisticsAggregator::new(repository.clone()),
            repository,
            ids,
            notifier,
            max_attempts: DEFAULT_TRANSITION_ATTEMPTS,
        }
    }

    /// Attempts per transition before a version conflict is surfaced. Zero is treated as one.
    pub fn with_transition_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Open a process at [`Stage::INITIAL`] together with its opening ledger entry.
    pub fn create_process(
        &self,
        application_id: ApplicationId,
        posting_id: PostingId,
        applicant_id: UserId,
    ) -> Result<ProcessRecord, ProcessServiceError> {
        let record = ProcessRecord::open(
            ProcessId(self.ids.next_id()),
            application_id,
            posting_id,
            applicant_id,
            Utc::now(),
        );
        let opening = LedgerEntry::opening(LedgerEntryId(self.ids.next_id()), &record);

        match self.repository.create(record, opening) {
            Ok(stored) => {
                info!(
                    process_id = %stored.id(),
                    application_id = %application_id,
                    posting_id = %posting_id,
                    "recruitment process opened"
                );
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => {
                warn!(application_id = %application_id, "application already has a process");
                Err(ProcessServiceError::DuplicateProcess { application_id })
            }
            Err(err) => {
                error!(application_id = %application_id, error = %err, "failed to open process");
                Err(err.into())
            }
        }
    }

    pub fn transition(
        &self,
        process_id: ProcessId,
        request: TransitionRequest,
    ) -> Result<ProcessRecord, ProcessServiceError> {
        self.transition_where(ProcessLookup::Process(process_id), request)
    }

    pub fn transition_by_application(
        &self,
        application_id: ApplicationId,
        request: TransitionRequest,
    ) -> Result<ProcessRecord, ProcessServiceError> {
        self.transition_where(ProcessLookup::Application(application_id), request)
    }

    fn transition_where(
        &self,
        lookup: ProcessLookup,
        request: TransitionRequest,
    ) -> Result<ProcessRecord, ProcessServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut record = self.load(lookup)?;
            let expected_version = record.version();
            let from = record.current_stage();

            let outcome = record.transition(request.to).map(|_| ());
            if let Err(err) = outcome {
                warn!(
                    process_id = %record.id(),
                    from = %err.from,
                    to = %err.to,
                    "illegal stage transition rejected"
                );
                return Err(err.into());
            }

            let entry = LedgerEntry::transition(
                LedgerEntryId(self.ids.next_id()),
                &record,
                from,
                request.actor_id,
                request.reason.clone(),
                request.note.clone(),
            );
            let commit = ProcessCommit {
                record: record.clone(),
                expected_version,
                entry,
            };

            match self.repository.commit(commit) {
                Ok(()) => {
                    info!(
                        process_id = %record.id(),
                        application_id = %record.application_id(),
                        from = %from,
                        to = %record.current_stage(),
                        "stage transition committed"
                    );
                    self.notify(&record);
                    return Ok(record);
                }
                Err(RepositoryError::VersionConflict) if attempt < self.max_attempts => {
                    debug!(
                        process_id = %record.id(),
                        attempt,
                        "concurrent stage change detected; reloading"
                    );
                }
                Err(RepositoryError::NotFound) => {
                    return Err(ProcessServiceError::NotFound(lookup));
                }
                Err(err) => {
                    error!(
                        process_id = %record.id(),
                        attempt,
                        error = %err,
                        "failed to commit stage transition"
                    );
                    return Err(err.into());
                }
            }
        }
    }

    fn notify(&self, record: &ProcessRecord) {
        match StageNotice::for_transition(
            record.applicant_id(),
            record.application_id(),
            record.current_stage(),
        ) {
            Some(notice) => self.notifier.dispatch(notice),
            None => debug!(
                process_id = %record.id(),
                stage = %record.current_stage(),
                "stage has no applicant notification"
            ),
        }
    }

    fn load(&self, lookup: ProcessLookup) -> Result<ProcessRecord, ProcessServiceError> {
        let found = match lookup {
            ProcessLookup::Process(id) => self.repository.fetch(id)?,
            ProcessLookup::Application(id) => self.repository.fetch_by_application(id)?,
        };
        found.ok_or(ProcessServiceError::NotFound(lookup))
    }

    pub fn read(&self, process_id: ProcessId) -> Result<ProcessView, ProcessServiceError> {
        let record = self.load(ProcessLookup::Process(process_id))?;
        Ok(ProcessView::from(&record))
    }

    pub fn read_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<ProcessView, ProcessServiceError> {
        let record = self.load(ProcessLookup::Application(application_id))?;
        Ok(ProcessView::from(&record))
    }

    /// Ledger for a process, newest first. Unknown ids yield an empty trail.
    pub fn history(&self, process_id: ProcessId) -> Result<Vec<LedgerEntry>, ProcessServiceError> {
        Ok(self.repository.history(process_id)?)
    }

    pub fn history_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<LedgerEntry>, ProcessServiceError> {
        Ok(self.repository.history_by_application(application_id)?)
    }

    pub fn list_by_posting(
        &self,
        posting_id: PostingId,
    ) -> Result<ProcessPage, ProcessServiceError> {
        self.list(&ProcessFilter::posting(posting_id), ProcessOrder::CreatedDesc)
    }

    /// Waiting queue for one stage of a posting, longest waiting first.
    pub fn list_by_posting_and_stage(
        &self,
        posting_id: PostingId,
        stage: Stage,
    ) -> Result<ProcessPage, ProcessServiceError> {
        self.list(
            &ProcessFilter::posting(posting_id).with_stages([stage]),
            ProcessOrder::StageChangedAsc,
        )
    }

    pub fn list_by_applicant(
        &self,
        applicant_id: UserId,
    ) -> Result<ProcessPage, ProcessServiceError> {
        self.list(
            &ProcessFilter::applicant(applicant_id),
            ProcessOrder::CreatedDesc,
        )
    }

    pub fn list_by_stage(&self, stage: Stage) -> Result<ProcessPage, ProcessServiceError> {
        self.list(&ProcessFilter::stage(stage), ProcessOrder::StageChangedAsc)
    }

    fn list(
        &self,
        filter: &ProcessFilter,
        order: ProcessOrder,
    ) -> Result<ProcessPage, ProcessServiceError> {
        let records = self.repository.list(filter, order)?;
        Ok(ProcessPage::from_records(&records))
    }

    /// Withdraw an application that nobody has started screening yet.
    ///
    /// The opening ledger entry survives the record.
    pub fn cancel(
        &self,
        application_id: ApplicationId,
    ) -> Result<ProcessRecord, ProcessServiceError> {
        let lookup = ProcessLookup::Application(application_id);
        let record = self.load(lookup)?;
        if record.current_stage() != Stage::INITIAL {
            return Err(ProcessServiceError::NotCancellable {
                current: record.current_stage(),
            });
        }

        match self.repository.remove(record.id(), record.version()) {
            Ok(removed) => {
                info!(
                    process_id = %removed.id(),
                    application_id = %application_id,
                    "recruitment process cancelled"
                );
                Ok(removed)
            }
            Err(RepositoryError::VersionConflict) => {
                let current = self.load(lookup)?.current_stage();
                warn!(application_id = %application_id, current = %current, "cancel lost a race");
                Err(ProcessServiceError::NotCancellable { current })
            }
            Err(RepositoryError::NotFound) => Err(ProcessServiceError::NotFound(lookup)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn catalog(&self) -> Vec<StageInfoView> {
        stage_catalog()
    }

    pub fn user_stats(&self, applicant_id: UserId) -> Result<UserStats, ProcessServiceError> {
        Ok(self.stats.user_stats(applicant_id)?)
    }

    pub fn posting_stats(
        &self,
        posting_id: PostingId,
    ) -> Result<PostingStats, ProcessServiceError> {
        Ok(self.stats.posting_stats(posting_id)?)
    }

    pub fn multi_posting_stats(
        &self,
        posting_ids: &[PostingId],
    ) -> Result<PostingStats, ProcessServiceError> {
        Ok(self.stats.multi_posting_stats(posting_ids)?)
    }
}

/// Error raised by the process orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ProcessServiceError {
    #[error("no recruitment process for {0}")]
    NotFound(ProcessLookup),
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    #[error("application {application_id} already has a recruitment process")]
    DuplicateProcess { application_id: ApplicationId },
    #[error("process can no longer be cancelled; current stage is {current}")]
    NotCancellable { current: Stage },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
