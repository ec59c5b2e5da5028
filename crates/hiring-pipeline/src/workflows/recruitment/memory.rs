use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::ledger::{LedgerEntry, TransitionLedger};
use super::process::{ApplicationId, ProcessId, ProcessRecord};
use super::repository::{
    ProcessCommit, ProcessFilter, ProcessOrder, ProcessRepository, RepositoryError,
};
use super::stage::Stage;

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<ProcessId, ProcessRecord>,
    by_application: HashMap<ApplicationId, ProcessId>,
    ledger: TransitionLedger,
}

/// Process store kept in memory; records and ledger share one lock so every write is atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProcessRepository {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryProcessRepository {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("process store lock poisoned".to_string()))
    }

    /// Total ledger entries across all processes.
    pub fn ledger_len(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.ledger.len())
    }
}

impl ProcessRepository for InMemoryProcessRepository {
    fn create(
        &self,
        record: ProcessRecord,
        opening: LedgerEntry,
    ) -> Result<ProcessRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.records.contains_key(&record.id())
            || guard.by_application.contains_key(&record.application_id())
        {
            return Err(RepositoryError::Conflict);
        }

        guard
            .by_application
            .insert(record.application_id(), record.id());
        guard.records.insert(record.id(), record.clone());
        guard.ledger.append(opening);
        Ok(record)
    }

    fn commit(&self, commit: ProcessCommit) -> Result<(), RepositoryError> {
        let ProcessCommit {
            record,
            expected_version,
            entry,
        } = commit;

        let mut guard = self.lock()?;
        let stored = guard
            .records
            .get_mut(&record.id())
            .ok_or(RepositoryError::NotFound)?;
        if stored.version() != expected_version {
            return Err(RepositoryError::VersionConflict);
        }

        *stored = record;
        guard.ledger.append(entry);
        Ok(())
    }

    fn fetch(&self, id: ProcessId) -> Result<Option<ProcessRecord>, RepositoryError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    fn fetch_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<ProcessRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .by_application
            .get(&application_id)
            .and_then(|id| guard.records.get(id))
            .cloned())
    }

    fn remove(
        &self,
        id: ProcessId,
        expected_version: u64,
    ) -> Result<ProcessRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard.records.get(&id).ok_or(RepositoryError::NotFound)?;
        if stored.version() != expected_version {
            return Err(RepositoryError::VersionConflict);
        }

        let removed = guard.records.remove(&id).ok_or(RepositoryError::NotFound)?;
        guard.by_application.remove(&removed.application_id());
        Ok(removed)
    }

    fn list(
        &self,
        filter: &ProcessFilter,
        order: ProcessOrder,
    ) -> Result<Vec<ProcessRecord>, RepositoryError> {
        let mut records: Vec<ProcessRecord> = self
            .lock()?
            .records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        match order {
            ProcessOrder::CreatedDesc => records.sort_by(|a, b| {
                b.created_at()
                    .cmp(&a.created_at())
                    .then_with(|| b.id().cmp(&a.id()))
            }),
            ProcessOrder::StageChangedAsc => records.sort_by(|a, b| {
                a.stage_changed_at()
                    .cmp(&b.stage_changed_at())
                    .then_with(|| a.id().cmp(&b.id()))
            }),
        }

        Ok(records)
    }

    fn stage_counts(&self, filter: &ProcessFilter) -> Result<BTreeMap<Stage, u64>, RepositoryError> {
        let guard = self.lock()?;
        let mut counts = BTreeMap::new();
        for record in guard.records.values().filter(|record| filter.matches(record)) {
            *counts.entry(record.current_stage()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn history(&self, id: ProcessId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        Ok(self.lock()?.ledger.for_process(id))
    }

    fn history_by_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        Ok(self.lock()?.ledger.for_application(application_id))
    }
}
