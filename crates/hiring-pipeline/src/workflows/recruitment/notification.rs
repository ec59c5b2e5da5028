//! Best-effort applicant notifications for committed stage changes.
//!
//! Dispatch never blocks and never reports failure to the caller: notices go onto a bounded
//! channel and a background task hands them to a [`NotificationSink`]. A full or closed
//! channel drops the notice with a warning. Delivery is at-most-once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::process::{ApplicationId, UserId};
use super::stage::Stage;

pub const RELATED_TYPE_APPLICATION: &str = "APPLY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    DocumentPass,
    DocumentFail,
    CodingTestScheduled,
    CodingTestPass,
    CodingTestFail,
    InterviewScheduled,
    InterviewPass,
    InterviewFail,
    FinalPass,
    FinalFail,
}

impl NotificationCategory {
    /// `None` for stages the applicant is not told about.
    pub const fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::DocumentPass => Some(Self::DocumentPass),
            Stage::DocumentFail => Some(Self::DocumentFail),
            Stage::CodingTest => Some(Self::CodingTestScheduled),
            Stage::CodingPass => Some(Self::CodingTestPass),
            Stage::CodingFail => Some(Self::CodingTestFail),
            Stage::Interview1 | Stage::Interview2 => Some(Self::InterviewScheduled),
            Stage::Interview1Pass | Stage::Interview2Pass => Some(Self::InterviewPass),
            Stage::Interview1Fail | Stage::Interview2Fail => Some(Self::InterviewFail),
            Stage::FinalPass => Some(Self::FinalPass),
            Stage::FinalFail => Some(Self::FinalFail),
            Stage::Applied | Stage::DocumentReview | Stage::FinalReview => None,
        }
    }
}

/// Payload handed to the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageNotice {
    pub user_id: UserId,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub link: String,
    pub related_id: ApplicationId,
    pub related_type: String,
}

impl StageNotice {
    pub fn for_transition(
        applicant_id: UserId,
        application_id: ApplicationId,
        stage: Stage,
    ) -> Option<Self> {
        let category = NotificationCategory::for_stage(stage)?;
        let (title, message) = copy_for(stage);
        Some(Self {
            user_id: applicant_id,
            category,
            title: title.to_string(),
            message: message.to_string(),
            link: format!("/my/applications/{}", application_id.0),
            related_id: application_id,
            related_type: RELATED_TYPE_APPLICATION.to_string(),
        })
    }
}

fn copy_for(stage: Stage) -> (&'static str, &'static str) {
    match stage {
        Stage::DocumentPass => (
            "Document screening passed",
            "You passed document screening. Check the details for your next step.",
        ),
        Stage::DocumentFail => (
            "Document screening result",
            "Your document screening result is available.",
        ),
        Stage::CodingTest => (
            "Coding test scheduled",
            "Your coding test has been scheduled. Check the details.",
        ),
        Stage::CodingPass => (
            "Coding test passed",
            "You passed the coding test. Check the details for your next step.",
        ),
        Stage::CodingFail => (
            "Coding test result",
            "Your coding test result is available.",
        ),
        Stage::Interview1 => (
            "First interview scheduled",
            "Your first interview has been scheduled. Check the details.",
        ),
        Stage::Interview2 => (
            "Second interview scheduled",
            "Your second interview has been scheduled. Check the details.",
        ),
        Stage::Interview1Pass => (
            "First interview passed",
            "You passed the first interview. Watch for second interview details.",
        ),
        Stage::Interview2Pass => (
            "Second interview passed",
            "You passed the second interview. The final decision is on its way.",
        ),
        Stage::Interview1Fail | Stage::Interview2Fail => (
            "Interview result",
            "Your interview result is available.",
        ),
        Stage::FinalPass => (
            "Congratulations on your offer!",
            "You have been hired. Check the onboarding details.",
        ),
        Stage::FinalFail => (
            "Final result",
            "Your final result is available. We wish you the best in your search.",
        ),
        Stage::Applied | Stage::DocumentReview | Stage::FinalReview => (
            "Application status updated",
            "The status of your application has changed.",
        ),
    }
}

/// Fire-and-forget hook invoked after a transition commits.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notice: StageNotice);
}

/// Transport that actually delivers a notice (HTTP client, e-mail adapter, ...).
///
/// Delivery may block; the worker runs it on tokio's blocking pool.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notice: &StageNotice) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification queue closed")]
    Closed,
}

/// Dispatcher for contexts that do not notify anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn dispatch(&self, notice: StageNotice) {
        debug!(user_id = %notice.user_id, category = ?notice.category, "notification discarded");
    }
}

/// Sender half of the notification queue.
#[derive(Debug, Clone)]
pub struct QueuedDispatcher {
    sender: mpsc::Sender<StageNotice>,
}

impl NotificationDispatcher for QueuedDispatcher {
    fn dispatch(&self, notice: StageNotice) {
        if let Err(err) = self.sender.try_send(notice) {
            let (reason, notice) = match err {
                mpsc::error::TrySendError::Full(notice) => ("queue full", notice),
                mpsc::error::TrySendError::Closed(notice) => ("queue closed", notice),
            };
            warn!(
                user_id = %notice.user_id,
                category = ?notice.category,
                reason,
                "stage notification dropped"
            );
        }
    }
}

/// Start the delivery worker on the current tokio runtime.
///
/// The worker exits once every [`QueuedDispatcher`] clone has been dropped and the queue drained.
pub fn spawn_dispatcher<S>(sink: Arc<S>, capacity: usize) -> (QueuedDispatcher, JoinHandle<()>)
where
    S: NotificationSink + 'static,
{
    let (sender, mut receiver) = mpsc::channel::<StageNotice>(capacity.max(1));

    let worker = tokio::spawn(async move {
        while let Some(notice) = receiver.recv().await {
            let sink = Arc::clone(&sink);
            let delivery = tokio::task::spawn_blocking(move || {
                let outcome = sink.deliver(&notice);
                (notice, outcome)
            })
            .await;

            match delivery {
                Ok((notice, Ok(()))) => info!(
                    user_id = %notice.user_id,
                    category = ?notice.category,
                    "stage notification delivered"
                ),
                Ok((notice, Err(err))) => error!(
                    user_id = %notice.user_id,
                    category = ?notice.category,
                    error = %err,
                    "stage notification failed"
                ),
                Err(err) => error!(error = %err, "stage notification delivery aborted"),
            }
        }
    });

    (QueuedDispatcher { sender }, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<StageNotice>>,
        fail: bool,
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&self, notice: &StageNotice) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::Transport("connection refused".to_string()));
            }
            self.delivered
                .lock()
                .expect("sink mutex poisoned")
                .push(notice.clone());
            Ok(())
        }
    }

    fn notice(stage: Stage) -> StageNotice {
        StageNotice::for_transition(UserId(200), ApplicationId(1), stage).expect("notifiable")
    }

    #[test]
    fn silent_stages_produce_no_notice() {
        for stage in [Stage::Applied, Stage::DocumentReview, Stage::FinalReview] {
            assert!(StageNotice::for_transition(UserId(1), ApplicationId(1), stage).is_none());
        }
    }

    #[test]
    fn interview_rounds_share_categories() {
        assert_eq!(
            notice(Stage::Interview1).category,
            notice(Stage::Interview2).category
        );
        assert_eq!(
            notice(Stage::Interview2Fail).category,
            NotificationCategory::InterviewFail
        );
        let passed = notice(Stage::FinalPass);
        assert_eq!(passed.link, "/my/applications/1");
        assert_eq!(passed.related_type, RELATED_TYPE_APPLICATION);
    }

    #[tokio::test]
    async fn worker_delivers_queued_notices_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, worker) = spawn_dispatcher(sink.clone(), 8);

        dispatcher.dispatch(notice(Stage::DocumentPass));
        dispatcher.dispatch(notice(Stage::Interview1));
        drop(dispatcher);
        worker.await.expect("worker finishes");

        let delivered = sink.delivered.lock().expect("sink mutex poisoned");
        let categories: Vec<_> = delivered.iter().map(|notice| notice.category).collect();
        assert_eq!(
            categories,
            vec![
                NotificationCategory::DocumentPass,
                NotificationCategory::InterviewScheduled
            ]
        );
    }

    #[tokio::test]
    async fn failing_sink_is_absorbed() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let (dispatcher, worker) = spawn_dispatcher(sink, 1);
        dispatcher.dispatch(notice(Stage::FinalFail));
        drop(dispatcher);
        worker.await.expect("worker survives delivery errors");
    }

    /// Sink that holds each delivery until the test releases it.
    struct GatedSink {
        gate: Mutex<std::sync::mpsc::Receiver<()>>,
        released: Mutex<Vec<bool>>,
    }

    impl NotificationSink for GatedSink {
        fn deliver(&self, _notice: &StageNotice) -> Result<(), NotificationError> {
            let opened = self
                .gate
                .lock()
                .expect("gate mutex poisoned")
                .recv_timeout(std::time::Duration::from_secs(5))
                .is_ok();
            self.released.lock().expect("sink mutex poisoned").push(opened);
            Ok(())
        }
    }

    #[tokio::test]
    async fn blocking_sink_leaves_the_runtime_free() {
        let (release, gate) = std::sync::mpsc::channel();
        let sink = Arc::new(GatedSink {
            gate: Mutex::new(gate),
            released: Mutex::new(Vec::new()),
        });
        let (dispatcher, worker) = spawn_dispatcher(sink.clone(), 4);

        dispatcher.dispatch(notice(Stage::Interview2Pass));
        // yields to the worker; delivering inline would stall this thread until the gate times out
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        release.send(()).expect("sink waiting");
        drop(dispatcher);
        worker.await.expect("worker finishes");

        assert_eq!(*sink.released.lock().expect("sink mutex poisoned"), vec![true]);
    }

    #[tokio::test]
    async fn overflow_is_dropped_without_blocking() {
        let (sender, mut receiver) = mpsc::channel(1);
        let dispatcher = QueuedDispatcher { sender };

        dispatcher.dispatch(notice(Stage::CodingTest));
        dispatcher.dispatch(notice(Stage::CodingPass));
        drop(dispatcher);

        assert_eq!(
            receiver.recv().await.map(|notice| notice.category),
            Some(NotificationCategory::CodingTestScheduled)
        );
        assert!(receiver.recv().await.is_none());
    }
}
