use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::process::{PostingId, UserId};
use super::repository::{ProcessFilter, ProcessRepository, RepositoryError};
use super::stage::{Stage, StageClass};

/// Applicant dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub pending: u64,
    pub passed: u64,
    pub failed: u64,
    pub pass_rate: f64,
}

/// Employer dashboard counters for one or more postings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PostingStats {
    pub total: u64,
    /// Applied or in document review.
    pub pending: u64,
    /// Past document review but not yet decided.
    pub interviewing: u64,
    pub passed: u64,
    pub failed: u64,
    pub pass_rate: f64,
}

/// Share of decided processes that passed, as a percentage with one decimal.
///
/// Zero decided processes yields `0.0`.
pub fn pass_rate(passed: u64, failed: u64) -> f64 {
    let decided = passed + failed;
    if decided == 0 {
        return 0.0;
    }
    let percentage = passed as f64 / decided as f64 * 100.0;
    (percentage * 10.0).round() / 10.0
}

impl UserStats {
    pub fn from_counts(counts: &BTreeMap<Stage, u64>) -> Self {
        let mut stats = Self::default();
        for (stage, count) in counts {
            stats.total += count;
            match stage.classification() {
                StageClass::InProgress => stats.pending += count,
                StageClass::Passed => stats.passed += count,
                StageClass::Failed => stats.failed += count,
            }
        }
        stats.pass_rate = pass_rate(stats.passed, stats.failed);
        stats
    }
}

impl PostingStats {
    pub fn from_counts(counts: &BTreeMap<Stage, u64>) -> Self {
        let mut stats = Self::default();
        for (stage, count) in counts {
            stats.total += count;
            match stage.classification() {
                StageClass::InProgress if stage.is_awaiting_screening() => stats.pending += count,
                StageClass::InProgress => stats.interviewing += count,
                StageClass::Passed => stats.passed += count,
                StageClass::Failed => stats.failed += count,
            }
        }
        stats.pass_rate = pass_rate(stats.passed, stats.failed);
        stats
    }
}

/// Derives dashboard counters straight from the record store on every call.
pub struct StatisticsAggregator<R> {
    repository: Arc<R>,
}

impl<R> StatisticsAggregator<R>
where
    R: ProcessRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn user_stats(&self, applicant_id: UserId) -> Result<UserStats, RepositoryError> {
        let counts = self
            .repository
            .stage_counts(&ProcessFilter::applicant(applicant_id))?;
        Ok(UserStats::from_counts(&counts))
    }

    pub fn posting_stats(&self, posting_id: PostingId) -> Result<PostingStats, RepositoryError> {
        self.multi_posting_stats(&[posting_id])
    }

    pub fn multi_posting_stats(
        &self,
        posting_ids: &[PostingId],
    ) -> Result<PostingStats, RepositoryError> {
        if posting_ids.is_empty() {
            return Ok(PostingStats::default());
        }
        let counts = self
            .repository
            .stage_counts(&ProcessFilter::postings(posting_ids.iter().copied()))?;
        Ok(PostingStats::from_counts(&counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(Stage, u64)]) -> BTreeMap<Stage, u64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn pass_rate_rounds_to_one_decimal() {
        assert_eq!(pass_rate(1, 1), 50.0);
        assert_eq!(pass_rate(1, 2), 33.3);
        assert_eq!(pass_rate(2, 1), 66.7);
        assert_eq!(pass_rate(0, 4), 0.0);
        assert_eq!(pass_rate(0, 0), 0.0);
    }

    #[test]
    fn user_buckets_cover_every_record() {
        let stats = UserStats::from_counts(&counts(&[
            (Stage::Applied, 2),
            (Stage::Interview2, 1),
            (Stage::FinalPass, 1),
            (Stage::CodingFail, 1),
            (Stage::FinalFail, 2),
        ]));
        assert_eq!(stats.total, 7);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.pending + stats.passed + stats.failed, stats.total);
        assert_eq!(stats.pass_rate, 25.0);
    }

    #[test]
    fn posting_buckets_split_pending_from_interviewing() {
        let stats = PostingStats::from_counts(&counts(&[
            (Stage::Applied, 3),
            (Stage::DocumentReview, 2),
            (Stage::DocumentPass, 1),
            (Stage::FinalReview, 1),
            (Stage::DocumentFail, 4),
        ]));
        assert_eq!(stats.pending, 5);
        assert_eq!(stats.interviewing, 2);
        assert_eq!(stats.failed, 4);
        assert_eq!(stats.passed, 0);
        assert_eq!(
            stats.pending + stats.interviewing + stats.passed + stats.failed,
            stats.total
        );
        assert_eq!(stats.pass_rate, 0.0);
    }
}
