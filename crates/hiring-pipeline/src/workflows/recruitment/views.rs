use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ledger::LedgerEntry;
use super::process::{
    ApplicationId, LedgerEntryId, PostingId, ProcessId, ProcessRecord, UserId,
};
use super::stage::{Stage, StageClass};

/// Read model for a process, including what may happen next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessView {
    pub process_id: ProcessId,
    pub application_id: ApplicationId,
    pub posting_id: PostingId,
    pub applicant_id: UserId,
    pub current_stage: Stage,
    pub current_stage_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_stage_label: Option<&'static str>,
    pub allowed_next: Vec<Stage>,
    pub completed: bool,
    pub passed: bool,
    pub failed: bool,
    pub stage_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ProcessRecord> for ProcessView {
    fn from(record: &ProcessRecord) -> Self {
        let current = record.current_stage();
        Self {
            process_id: record.id(),
            application_id: record.application_id(),
            posting_id: record.posting_id(),
            applicant_id: record.applicant_id(),
            current_stage: current,
            current_stage_label: current.label(),
            previous_stage: record.previous_stage(),
            previous_stage_label: record.previous_stage().map(Stage::label),
            allowed_next: current.allowed_next().to_vec(),
            completed: record.is_completed(),
            passed: record.is_passed(),
            failed: record.is_failed(),
            stage_changed_at: record.stage_changed_at(),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessPage {
    pub processes: Vec<ProcessView>,
    pub process_count: usize,
}

impl ProcessPage {
    pub fn from_records(records: &[ProcessRecord]) -> Self {
        let processes: Vec<ProcessView> = records.iter().map(ProcessView::from).collect();
        Self {
            process_count: processes.len(),
            processes,
        }
    }
}

/// Audit line with display labels resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntryView {
    pub entry_id: LedgerEntryId,
    pub process_id: ProcessId,
    pub application_id: ApplicationId,
    pub from_stage: Option<Stage>,
    pub from_stage_label: Option<&'static str>,
    pub to_stage: Stage,
    pub to_stage_label: &'static str,
    pub actor_id: Option<UserId>,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for HistoryEntryView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            entry_id: entry.id,
            process_id: entry.process_id,
            application_id: entry.application_id,
            from_stage: entry.from_stage,
            from_stage_label: entry.from_stage.map(Stage::label),
            to_stage: entry.to_stage,
            to_stage_label: entry.to_stage.label(),
            actor_id: entry.actor_id,
            reason: entry.reason.clone(),
            note: entry.note.clone(),
            created_at: entry.created_at,
        }
    }
}

/// Catalog row for UI rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfoView {
    pub stage: Stage,
    pub label: &'static str,
    pub allowed_next: Vec<Stage>,
    pub terminal: bool,
    pub classification: StageClass,
}

impl From<Stage> for StageInfoView {
    fn from(stage: Stage) -> Self {
        let definition = stage.definition();
        Self {
            stage,
            label: definition.label,
            allowed_next: definition.allowed_next.to_vec(),
            terminal: definition.is_terminal(),
            classification: definition.class,
        }
    }
}

pub fn stage_catalog() -> Vec<StageInfoView> {
    Stage::ordered().into_iter().map(StageInfoView::from).collect()
}
