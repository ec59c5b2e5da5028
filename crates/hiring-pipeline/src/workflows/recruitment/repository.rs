use std::collections::{BTreeMap, BTreeSet};

use super::ledger::LedgerEntry;
use super::process::{ApplicationId, PostingId, ProcessId, ProcessRecord, UserId};
use super::stage::Stage;

/// A transitioned record plus its ledger line, persisted together or not at all.
#[derive(Debug, Clone)]
pub struct ProcessCommit {
    pub record: ProcessRecord,
    /// Version the record had when it was loaded.
    pub expected_version: u64,
    pub entry: LedgerEntry,
}

/// Listing order for record queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOrder {
    /// Newest applications first.
    CreatedDesc,
    /// Longest waiting at the current stage first.
    StageChangedAsc,
}

/// Conjunctive filter over the record store; `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFilter {
    pub postings: Option<BTreeSet<PostingId>>,
    pub applicant: Option<UserId>,
    pub stages: Option<BTreeSet<Stage>>,
}

impl ProcessFilter {
    pub fn posting(posting_id: PostingId) -> Self {
        Self::postings([posting_id])
    }

    pub fn postings(posting_ids: impl IntoIterator<Item = PostingId>) -> Self {
        Self {
            postings: Some(posting_ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn applicant(applicant_id: UserId) -> Self {
        Self {
            applicant: Some(applicant_id),
            ..Self::default()
        }
    }

    pub fn stage(stage: Stage) -> Self {
        Self::default().with_stages([stage])
    }

    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages = Some(stages.into_iter().collect());
        self
    }

    pub fn matches(&self, record: &ProcessRecord) -> bool {
        let posting_ok = self
            .postings
            .as_ref()
            .map_or(true, |postings| postings.contains(&record.posting_id()));
        let applicant_ok = self
            .applicant
            .map_or(true, |applicant| applicant == record.applicant_id());
        let stage_ok = self
            .stages
            .as_ref()
            .map_or(true, |stages| stages.contains(&record.current_stage()));
        posting_ok && applicant_ok && stage_ok
    }
}

/// Storage contract for process records and their transition ledger.
///
/// Implementations must make `create` and `commit` atomic across record and ledger, and must
/// append ledger entries in commit order.
pub trait ProcessRepository: Send + Sync {
    /// Persist a new record with its opening entry. `Conflict` if the application already has one.
    fn create(
        &self,
        record: ProcessRecord,
        opening: LedgerEntry,
    ) -> Result<ProcessRecord, RepositoryError>;

    /// Compare-and-swap on `version`: `VersionConflict` when another writer got there first.
    fn commit(&self, commit: ProcessCommit) -> Result<(), RepositoryError>;

    fn fetch(&self, id: ProcessId) -> Result<Option<ProcessRecord>, RepositoryError>;

    fn fetch_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<ProcessRecord>, RepositoryError>;

    /// Delete a record still at `expected_version`. Ledger entries are retained.
    fn remove(
        &self,
        id: ProcessId,
        expected_version: u64,
    ) -> Result<ProcessRecord, RepositoryError>;

    fn list(
        &self,
        filter: &ProcessFilter,
        order: ProcessOrder,
    ) -> Result<Vec<ProcessRecord>, RepositoryError>;

    /// Per-stage record counts taken from a single consistent snapshot.
    fn stage_counts(&self, filter: &ProcessFilter) -> Result<BTreeMap<Stage, u64>, RepositoryError>;

    /// Ledger entries for a process, newest first.
    fn history(&self, id: ProcessId) -> Result<Vec<LedgerEntry>, RepositoryError>;

    /// Ledger entries for an application, newest first.
    fn history_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<LedgerEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record was modified concurrently")]
    VersionConflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
