use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::{ApplicationId, LedgerEntryId, ProcessId, ProcessRecord, UserId};
use super::stage::Stage;

pub const OPENING_REASON: &str = "application filed";

/// One immutable line of a process's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub process_id: ProcessId,
    pub application_id: ApplicationId,
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
    pub actor_id: Option<UserId>,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Synthetic first entry written alongside a freshly opened record.
    pub fn opening(id: LedgerEntryId, record: &ProcessRecord) -> Self {
        Self {
            id,
            process_id: record.id(),
            application_id: record.application_id(),
            from_stage: None,
            to_stage: record.current_stage(),
            actor_id: None,
            reason: Some(OPENING_REASON.to_string()),
            note: None,
            created_at: record.created_at(),
        }
    }

    /// Entry for a record that has just left `from`.
    pub fn transition(
        id: LedgerEntryId,
        record: &ProcessRecord,
        from: Stage,
        actor_id: Option<UserId>,
        reason: Option<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            process_id: record.id(),
            application_id: record.application_id(),
            from_stage: Some(from),
            to_stage: record.current_stage(),
            actor_id,
            reason,
            note,
            created_at: record.stage_changed_at(),
        }
    }
}

/// Append-only transition log with per-process and per-application indexes.
///
/// Entries are kept in append order, which callers must make equal to commit order.
#[derive(Debug, Default)]
pub struct TransitionLedger {
    entries: Vec<LedgerEntry>,
    by_process: HashMap<ProcessId, Vec<usize>>,
    by_application: HashMap<ApplicationId, Vec<usize>>,
}

impl TransitionLedger {
    pub fn append(&mut self, entry: LedgerEntry) -> &LedgerEntry {
        let position = self.entries.len();
        self.by_process
            .entry(entry.process_id)
            .or_default()
            .push(position);
        self.by_application
            .entry(entry.application_id)
            .or_default()
            .push(position);
        self.entries.push(entry);
        &self.entries[position]
    }

    /// Newest first.
    pub fn for_process(&self, process_id: ProcessId) -> Vec<LedgerEntry> {
        self.collect(self.by_process.get(&process_id))
    }

    /// Newest first.
    pub fn for_application(&self, application_id: ApplicationId) -> Vec<LedgerEntry> {
        self.collect(self.by_application.get(&application_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<LedgerEntry> {
        positions
            .map(|positions| {
                positions
                    .iter()
                    .rev()
                    .map(|position| self.entries[*position].clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
