//! Closed catalog of recruitment stages and the legal moves between them.
//!
//! Every stage is described once by [`StageDefinition`]; all other modules refer to
//! [`Stage`] by value. Adding a stage means adding an enum variant, which forces the
//! definition table and [`Stage::classification`] to be updated at compile time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Serialized as its wire key; deserialized through [`FromStr`], so the spellings accepted
/// in paths, queries and request bodies are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Stage {
    // document track
    Applied,
    DocumentReview,
    DocumentPass,
    DocumentFail,
    CodingTest,
    CodingPass,
    CodingFail,
    // interview track
    #[serde(rename = "INTERVIEW_1")]
    Interview1,
    #[serde(rename = "INTERVIEW_1_PASS")]
    Interview1Pass,
    #[serde(rename = "INTERVIEW_1_FAIL")]
    Interview1Fail,
    #[serde(rename = "INTERVIEW_2")]
    Interview2,
    #[serde(rename = "INTERVIEW_2_PASS")]
    Interview2Pass,
    #[serde(rename = "INTERVIEW_2_FAIL")]
    Interview2Fail,
    // final decision
    FinalReview,
    FinalPass,
    FinalFail,
}

/// Bucket a stage falls into for dashboards and record predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageClass {
    InProgress,
    Passed,
    Failed,
}

/// Static description of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDefinition {
    pub stage: Stage,
    pub label: &'static str,
    pub allowed_next: &'static [Stage],
    pub class: StageClass,
}

impl StageDefinition {
    pub fn is_terminal(&self) -> bool {
        self.allowed_next.is_empty()
    }
}

const fn def(
    stage: Stage,
    label: &'static str,
    allowed_next: &'static [Stage],
) -> StageDefinition {
    StageDefinition {
        stage,
        label,
        allowed_next,
        class: stage.classification(),
    }
}

static CATALOG: [StageDefinition; Stage::COUNT] = [
    def(Stage::Applied, "Application received", &[Stage::DocumentReview]),
    def(
        Stage::DocumentReview,
        "Document review",
        &[Stage::DocumentPass, Stage::DocumentFail],
    ),
    def(
        Stage::DocumentPass,
        "Documents accepted",
        &[Stage::CodingTest, Stage::Interview1],
    ),
    def(Stage::DocumentFail, "Documents rejected", &[]),
    def(
        Stage::CodingTest,
        "Coding test",
        &[Stage::CodingPass, Stage::CodingFail],
    ),
    def(Stage::CodingPass, "Coding test passed", &[Stage::Interview1]),
    def(Stage::CodingFail, "Coding test failed", &[]),
    def(
        Stage::Interview1,
        "First interview",
        &[Stage::Interview1Pass, Stage::Interview1Fail],
    ),
    def(Stage::Interview1Pass, "First interview passed", &[Stage::Interview2]),
    def(Stage::Interview1Fail, "First interview failed", &[]),
    def(
        Stage::Interview2,
        "Second interview",
        &[Stage::Interview2Pass, Stage::Interview2Fail],
    ),
    def(Stage::Interview2Pass, "Second interview passed", &[Stage::FinalReview]),
    def(Stage::Interview2Fail, "Second interview failed", &[]),
    def(
        Stage::FinalReview,
        "Final review",
        &[Stage::FinalPass, Stage::FinalFail],
    ),
    def(Stage::FinalPass, "Offer accepted", &[]),
    def(Stage::FinalFail, "Final rejection", &[]),
];

impl Stage {
    pub const COUNT: usize = 16;

    /// Entry stage of every process.
    pub const INITIAL: Stage = Stage::Applied;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Applied,
            Self::DocumentReview,
            Self::DocumentPass,
            Self::DocumentFail,
            Self::CodingTest,
            Self::CodingPass,
            Self::CodingFail,
            Self::Interview1,
            Self::Interview1Pass,
            Self::Interview1Fail,
            Self::Interview2,
            Self::Interview2Pass,
            Self::Interview2Fail,
            Self::FinalReview,
            Self::FinalPass,
            Self::FinalFail,
        ]
    }

    pub fn definition(self) -> &'static StageDefinition {
        &CATALOG[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.definition().label
    }

    pub fn allowed_next(self) -> &'static [Stage] {
        self.definition().allowed_next
    }

    pub fn can_transition_to(self, next: Stage) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Exhaustive on purpose: a new variant does not compile until it is bucketed.
    pub const fn classification(self) -> StageClass {
        match self {
            Self::FinalPass => StageClass::Passed,
            Self::DocumentFail
            | Self::CodingFail
            | Self::Interview1Fail
            | Self::Interview2Fail
            | Self::FinalFail => StageClass::Failed,
            Self::Applied
            | Self::DocumentReview
            | Self::DocumentPass
            | Self::CodingTest
            | Self::CodingPass
            | Self::Interview1
            | Self::Interview1Pass
            | Self::Interview2
            | Self::Interview2Pass
            | Self::FinalReview => StageClass::InProgress,
        }
    }

    /// Stages a posting dashboard counts as "awaiting first screening".
    pub const fn is_awaiting_screening(self) -> bool {
        matches!(self, Self::Applied | Self::DocumentReview)
    }

    /// Wire key, identical to the serde representation.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Applied => "APPLIED",
            Self::DocumentReview => "DOCUMENT_REVIEW",
            Self::DocumentPass => "DOCUMENT_PASS",
            Self::DocumentFail => "DOCUMENT_FAIL",
            Self::CodingTest => "CODING_TEST",
            Self::CodingPass => "CODING_PASS",
            Self::CodingFail => "CODING_FAIL",
            Self::Interview1 => "INTERVIEW_1",
            Self::Interview1Pass => "INTERVIEW_1_PASS",
            Self::Interview1Fail => "INTERVIEW_1_FAIL",
            Self::Interview2 => "INTERVIEW_2",
            Self::Interview2Pass => "INTERVIEW_2_PASS",
            Self::Interview2Fail => "INTERVIEW_2_FAIL",
            Self::FinalReview => "FINAL_REVIEW",
            Self::FinalPass => "FINAL_PASS",
            Self::FinalFail => "FINAL_FAIL",
        }
    }

    /// All stages in `class`, in catalog order.
    pub fn in_class(class: StageClass) -> Vec<Stage> {
        Self::ordered()
            .into_iter()
            .filter(|stage| stage.classification() == class)
            .collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown recruitment stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|stage| stage.key() == normalized)
            .ok_or_else(|| UnknownStage(raw.to_string()))
    }
}

impl TryFrom<String> for Stage {
    type Error = UnknownStage;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}
