use clap::Args;
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::recruitment::{
    ApplicationId, HistoryEntryView, InMemoryProcessRepository, NotificationDispatcher, PostingId,
    ProcessOrchestrator, ProcessView, SequentialIdGenerator, Stage, StageClass, StageNotice,
    TransitionRequest, UserId, UserStats,
};
use std::sync::{Arc, Mutex};

const DEMO_APPLICANT: UserId = UserId(200);
const DEMO_REVIEWER: UserId = UserId(900);
const DEMO_POSTING: PostingId = PostingId(100);

/// Longest route through the pipeline, coding test included.
const HIRING_PATH: [Stage; 10] = [
    Stage::DocumentReview,
    Stage::DocumentPass,
    Stage::CodingTest,
    Stage::CodingPass,
    Stage::Interview1,
    Stage::Interview1Pass,
    Stage::Interview2,
    Stage::Interview2Pass,
    Stage::FinalReview,
    Stage::FinalPass,
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject the candidate at this fail stage instead of hiring them (e.g. coding-fail)
    #[arg(long, value_parser = crate::infra::parse_stage)]
    pub(crate) reject_at: Option<Stage>,
}

#[derive(Default)]
struct CollectingDispatcher {
    notices: Mutex<Vec<StageNotice>>,
}

impl NotificationDispatcher for CollectingDispatcher {
    fn dispatch(&self, notice: StageNotice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

struct DemoOutcome {
    process: ProcessView,
    history: Vec<HistoryEntryView>,
    stats: UserStats,
    notices: Vec<StageNotice>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let path = planned_path(args.reject_at)?;
    let outcome = run_pipeline(&path)?;
    render(&outcome);
    Ok(())
}

/// Stages to request, ending in `reject_at` when one is given.
fn planned_path(reject_at: Option<Stage>) -> Result<Vec<Stage>, AppError> {
    let Some(rejection) = reject_at else {
        return Ok(HIRING_PATH.to_vec());
    };
    if rejection.classification() != StageClass::Failed {
        return Err(AppError::InvalidRequest(format!(
            "{rejection} is not a rejection stage"
        )));
    }

    let mut path = Vec::new();
    let mut current = Stage::INITIAL;
    for next in HIRING_PATH {
        if current.can_transition_to(rejection) {
            break;
        }
        path.push(next);
        current = next;
    }
    path.push(rejection);
    Ok(path)
}

fn run_pipeline(path: &[Stage]) -> Result<DemoOutcome, AppError> {
    let notifier = Arc::new(CollectingDispatcher::default());
    let service = ProcessOrchestrator::new(
        Arc::new(InMemoryProcessRepository::default()),
        Arc::new(SequentialIdGenerator::default()),
        notifier.clone(),
    );

    let record = service.create_process(ApplicationId(1), DEMO_POSTING, DEMO_APPLICANT)?;
    // a second application that nobody has screened yet
    service.create_process(ApplicationId(2), PostingId(101), DEMO_APPLICANT)?;

    for stage in path {
        service.transition(
            record.id(),
            TransitionRequest::to(*stage)
                .by(DEMO_REVIEWER)
                .because("demo review"),
        )?;
    }

    let notices = notifier
        .notices
        .lock()
        .map(|notices| notices.clone())
        .unwrap_or_default();

    Ok(DemoOutcome {
        process: service.read(record.id())?,
        history: service
            .history(record.id())?
            .iter()
            .map(HistoryEntryView::from)
            .collect(),
        stats: service.user_stats(DEMO_APPLICANT)?,
        notices,
    })
}

fn render(outcome: &DemoOutcome) {
    let process = &outcome.process;
    println!("Recruitment process demo");
    println!(
        "- Process {} for application {} -> {} ({})",
        process.process_id,
        process.application_id,
        process.current_stage,
        process.current_stage_label
    );
    if process.allowed_next.is_empty() {
        println!("  Allowed next: none (process complete)");
    } else {
        let allowed: Vec<&str> = process.allowed_next.iter().map(|stage| stage.key()).collect();
        println!("  Allowed next: {}", allowed.join(", "));
    }

    println!("\nTransition ledger (newest first)");
    for entry in &outcome.history {
        let from = entry.from_stage.map_or("-", Stage::key);
        println!(
            "  - {} {} -> {} {}",
            entry.created_at.format("%H:%M:%S%.3f"),
            from,
            entry.to_stage,
            entry.reason.as_deref().unwrap_or("")
        );
    }

    println!("\nApplicant notifications");
    for notice in &outcome.notices {
        println!("  - {:?}: {}", notice.category, notice.title);
    }

    let stats = &outcome.stats;
    println!(
        "\nApplicant statistics: {} total | {} pending | {} passed | {} failed | {:.1}% pass rate",
        stats.total, stats.pending, stats.passed, stats.failed, stats.pass_rate
    );
}
