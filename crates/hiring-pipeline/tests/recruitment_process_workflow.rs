use std::sync::{Arc, Mutex};

use hiring_pipeline::workflows::recruitment::{
    spawn_dispatcher, ApplicationId, InMemoryProcessRepository, NotificationCategory,
    NotificationError, NotificationSink, PostingId, ProcessOrchestrator, ProcessServiceError,
    SnowflakeGenerator, Stage, StageNotice, TransitionRequest, UserId,
};

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<StageNotice>>,
}

impl NotificationSink for Outbox {
    fn deliver(&self, notice: &StageNotice) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .map_err(|_| NotificationError::Closed)?
            .push(notice.clone());
        Ok(())
    }
}

#[tokio::test]
async fn coding_track_rejection_is_audited_and_notified() {
    let outbox = Arc::new(Outbox::default());
    let (dispatcher, worker) = spawn_dispatcher(outbox.clone(), 16);
    let ids = SnowflakeGenerator::new(7).expect("node id in range");
    let service = ProcessOrchestrator::new(
        Arc::new(InMemoryProcessRepository::default()),
        Arc::new(ids),
        Arc::new(dispatcher),
    );

    let record = service
        .create_process(ApplicationId(501), PostingId(42), UserId(3001))
        .expect("process opened");
    for stage in [
        Stage::DocumentReview,
        Stage::DocumentPass,
        Stage::CodingTest,
        Stage::CodingFail,
    ] {
        service
            .transition(
                record.id(),
                TransitionRequest::to(stage).by(UserId(77)).because("panel"),
            )
            .expect("legal transition");
    }

    let view = service
        .read_by_application(ApplicationId(501))
        .expect("readable");
    assert_eq!(view.current_stage, Stage::CodingFail);
    assert_eq!(view.previous_stage, Some(Stage::CodingTest));
    assert!(view.completed && view.failed);

    let history = service.history(record.id()).expect("history");
    let trail: Vec<Stage> = history.iter().rev().map(|entry| entry.to_stage).collect();
    assert_eq!(
        trail,
        vec![
            Stage::Applied,
            Stage::DocumentReview,
            Stage::DocumentPass,
            Stage::CodingTest,
            Stage::CodingFail,
        ]
    );
    let mut entry_ids: Vec<u64> = history.iter().map(|entry| entry.id.0).collect();
    entry_ids.sort_unstable();
    entry_ids.dedup();
    assert_eq!(entry_ids.len(), history.len(), "ledger ids are unique");

    let rejected = service.transition(record.id(), TransitionRequest::to(Stage::Interview1));
    assert!(matches!(
        rejected,
        Err(ProcessServiceError::IllegalTransition(_))
    ));

    let stats = service.user_stats(UserId(3001)).expect("stats");
    assert_eq!((stats.total, stats.failed, stats.pass_rate), (1, 1, 0.0));

    drop(service);
    worker.await.expect("notification worker drains");

    let sent = outbox.sent.lock().expect("outbox");
    let categories: Vec<NotificationCategory> = sent.iter().map(|notice| notice.category).collect();
    assert_eq!(
        categories,
        vec![
            NotificationCategory::DocumentPass,
            NotificationCategory::CodingTestScheduled,
            NotificationCategory::CodingTestFail,
        ]
    );
    assert!(sent
        .iter()
        .all(|notice| notice.link == "/my/applications/501"));
}
