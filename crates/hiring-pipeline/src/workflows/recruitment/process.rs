use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::{Stage, StageClass};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a recruitment process record.
    ProcessId
);
id_newtype!(
    /// Foreign key of the application the process tracks (1:1).
    ApplicationId
);
id_newtype!(PostingId);
id_newtype!(
    /// Applicants and reviewers share the user id space.
    UserId
);
id_newtype!(LedgerEntryId);

/// Rejected stage change; the record it was attempted on is untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move from {from} to {to}; allowed next stages: [{}]", stage_list(.allowed))]
pub struct IllegalTransition {
    pub from: Stage,
    pub to: Stage,
    pub allowed: Vec<Stage>,
}

fn stage_list(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|stage| stage.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Live state of one application moving through the hiring pipeline.
///
/// Fields are private: the only way to change `current_stage` is [`ProcessRecord::transition`].
/// Records serialize for responses but cannot be rebuilt from a payload:
///
/// ```compile_fail
/// use hiring_pipeline::workflows::recruitment::ProcessRecord;
///
/// let forged: ProcessRecord = serde_json::from_str(r#"{"current_stage":"FINAL_PASS"}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    id: ProcessId,
    application_id: ApplicationId,
    posting_id: PostingId,
    applicant_id: UserId,
    current_stage: Stage,
    previous_stage: Option<Stage>,
    stage_changed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl ProcessRecord {
    /// Fresh record in [`Stage::INITIAL`], as written when an application is filed.
    pub fn open(
        id: ProcessId,
        application_id: ApplicationId,
        posting_id: PostingId,
        applicant_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            application_id,
            posting_id,
            applicant_id,
            current_stage: Stage::INITIAL,
            previous_stage: None,
            stage_changed_at: now,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn transition(&mut self, to: Stage) -> Result<&Self, IllegalTransition> {
        self.transition_at(to, Utc::now())
    }

    pub fn transition_at(
        &mut self,
        to: Stage,
        now: DateTime<Utc>,
    ) -> Result<&Self, IllegalTransition> {
        let from = self.current_stage;
        if !from.can_transition_to(to) {
            return Err(IllegalTransition {
                from,
                to,
                allowed: from.allowed_next().to_vec(),
            });
        }

        self.previous_stage = Some(from);
        self.current_stage = to;
        self.stage_changed_at = now;
        self.updated_at = now;
        self.version += 1;
        Ok(self)
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    pub fn posting_id(&self) -> PostingId {
        self.posting_id
    }

    pub fn applicant_id(&self) -> UserId {
        self.applicant_id
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    pub fn previous_stage(&self) -> Option<Stage> {
        self.previous_stage
    }

    pub fn stage_changed_at(&self) -> DateTime<Utc> {
        self.stage_changed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Number of committed transitions; doubles as the optimistic-lock token.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn classification(&self) -> StageClass {
        self.current_stage.classification()
    }

    pub fn is_completed(&self) -> bool {
        self.current_stage.is_terminal()
    }

    pub fn is_passed(&self) -> bool {
        self.classification() == StageClass::Passed
    }

    pub fn is_failed(&self) -> bool {
        self.classification() == StageClass::Failed
    }

    pub fn is_in_progress(&self) -> bool {
        !self.is_completed()
    }
}
