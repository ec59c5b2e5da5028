use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingNotificationSink};
use crate::routes::with_process_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hiring_pipeline::config::{AppConfig, ConfigError};
use hiring_pipeline::error::AppError;
use hiring_pipeline::telemetry;
use hiring_pipeline::workflows::recruitment::{
    spawn_dispatcher, InMemoryProcessRepository, ProcessOrchestrator, SnowflakeGenerator,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let ids = SnowflakeGenerator::new(config.pipeline.node_id)
        .map_err(|_| ConfigError::InvalidNodeId)?;
    let (dispatcher, _notification_worker) = spawn_dispatcher(
        Arc::new(LoggingNotificationSink),
        config.pipeline.notification_queue,
    );
    let orchestrator = Arc::new(
        ProcessOrchestrator::new(
            Arc::new(InMemoryProcessRepository::default()),
            Arc::new(ids),
            Arc::new(dispatcher),
        )
        .with_transition_attempts(config.pipeline.transition_retries),
    );

    let app = with_process_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        node_id = config.pipeline.node_id,
        "recruitment process service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
