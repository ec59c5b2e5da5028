use hiring_pipeline::workflows::recruitment::{
    NotificationError, NotificationSink, Stage, StageNotice,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Sink used until a notification service is wired in; writes each notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn deliver(&self, notice: &StageNotice) -> Result<(), NotificationError> {
        info!(
            user_id = %notice.user_id,
            related_id = %notice.related_id,
            related_type = %notice.related_type,
            title = %notice.title,
            link = %notice.link,
            "applicant notification"
        );
        Ok(())
    }
}

pub(crate) fn parse_stage(raw: &str) -> Result<Stage, String> {
    raw.parse::<Stage>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiring_pipeline::workflows::recruitment::{ApplicationId, UserId};

    #[test]
    fn parse_stage_accepts_cli_spellings() {
        assert_eq!(parse_stage("coding-fail"), Ok(Stage::CodingFail));
        assert_eq!(parse_stage("INTERVIEW_2_FAIL"), Ok(Stage::Interview2Fail));
        assert!(parse_stage("ghosted").is_err());
    }

    #[test]
    fn logging_sink_never_fails() {
        let notice = StageNotice::for_transition(UserId(1), ApplicationId(2), Stage::FinalPass)
            .expect("final pass notifies");
        assert!(LoggingNotificationSink.deliver(&notice).is_ok());
    }
}
