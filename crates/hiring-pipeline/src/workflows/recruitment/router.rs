use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::notification::NotificationDispatcher;
use super::process::{ApplicationId, PostingId, ProcessId, UserId};
use super::repository::ProcessRepository;
use super::service::{ProcessOrchestrator, TransitionRequest};
use super::stage::Stage;
use super::stats::{PostingStats, UserStats};
use super::views::{HistoryEntryView, ProcessPage, ProcessView, StageInfoView};
use crate::error::AppError;

type SharedOrchestrator<R, N> = State<Arc<ProcessOrchestrator<R, N>>>;

/// Router exposing the recruitment process operations over HTTP.
pub fn process_router<R, N>(service: Arc<ProcessOrchestrator<R, N>>) -> Router
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/processes", post(create_handler::<R, N>))
        .route("/api/v1/processes/:process_id", get(read_handler::<R, N>))
        .route(
            "/api/v1/processes/:process_id/transitions",
            post(transition_handler::<R, N>),
        )
        .route(
            "/api/v1/processes/:process_id/history",
            get(history_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/process",
            get(read_by_application_handler::<R, N>).delete(cancel_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/process/transitions",
            post(transition_by_application_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/process/history",
            get(history_by_application_handler::<R, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/processes",
            get(posting_processes_handler::<R, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/stats",
            get(posting_stats_handler::<R, N>),
        )
        .route("/api/v1/posting-stats", get(multi_posting_stats_handler::<R, N>))
        .route(
            "/api/v1/applicants/:applicant_id/processes",
            get(applicant_processes_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/stats",
            get(user_stats_handler::<R, N>),
        )
        .route(
            "/api/v1/stages/:stage/processes",
            get(stage_processes_handler::<R, N>),
        )
        .route("/api/v1/process-stages", get(catalog_handler::<R, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct CreateProcessRequest {
    pub application_id: ApplicationId,
    pub posting_id: PostingId,
    pub applicant_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
pub struct StageQuery {
    pub stage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostingIdsQuery {
    pub ids: String,
}

/// Malformed bodies, unknown stage keys included, are answered like any other bad input.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

fn parse_stage(raw: &str) -> Result<Stage, AppError> {
    raw.parse::<Stage>()
        .map_err(|err| AppError::InvalidRequest(err.to_string()))
}

/// Comma-separated posting ids; blanks are skipped so `?ids=` means "no postings".
fn parse_posting_ids(raw: &str) -> Result<Vec<PostingId>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map(PostingId)
                .map_err(|_| AppError::InvalidRequest(format!("invalid posting id '{part}'")))
        })
        .collect()
}

pub(crate) async fn create_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    payload: Result<Json<CreateProcessRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProcessView>), AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let request = json_body(payload)?;
    let record = service.create_process(
        request.application_id,
        request.posting_id,
        request.applicant_id,
    )?;
    Ok((StatusCode::CREATED, Json(ProcessView::from(&record))))
}

pub(crate) async fn read_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(process_id): Path<u64>,
) -> Result<Json<ProcessView>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Ok(Json(service.read(ProcessId(process_id))?))
}

pub(crate) async fn read_by_application_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(application_id): Path<u64>,
) -> Result<Json<ProcessView>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Ok(Json(
        service.read_by_application(ApplicationId(application_id))?,
    ))
}

pub(crate) async fn transition_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(process_id): Path<u64>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<ProcessView>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let request = json_body(payload)?;
    let record = service.transition(ProcessId(process_id), request)?;
    Ok(Json(ProcessView::from(&record)))
}

pub(crate) async fn transition_by_application_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(application_id): Path<u64>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<ProcessView>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let request = json_body(payload)?;
    let record = service.transition_by_application(ApplicationId(application_id), request)?;
    Ok(Json(ProcessView::from(&record)))
}

pub(crate) async fn history_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(process_id): Path<u64>,
) -> Result<Json<Vec<HistoryEntryView>>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let entries = service.history(ProcessId(process_id))?;
    Ok(Json(entries.iter().map(HistoryEntryView::from).collect()))
}

pub(crate) async fn history_by_application_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(application_id): Path<u64>,
) -> Result<Json<Vec<HistoryEntryView>>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let entries = service.history_by_application(ApplicationId(application_id))?;
    Ok(Json(entries.iter().map(HistoryEntryView::from).collect()))
}

pub(crate) async fn cancel_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(application_id): Path<u64>,
) -> Result<StatusCode, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    service.cancel(ApplicationId(application_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn posting_processes_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(posting_id): Path<u64>,
    Query(query): Query<StageQuery>,
) -> Result<Json<ProcessPage>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let posting_id = PostingId(posting_id);
    let page = match query.stage.as_deref() {
        Some(raw) => service.list_by_posting_and_stage(posting_id, parse_stage(raw)?)?,
        None => service.list_by_posting(posting_id)?,
    };
    Ok(Json(page))
}

pub(crate) async fn applicant_processes_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(applicant_id): Path<u64>,
) -> Result<Json<ProcessPage>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Ok(Json(service.list_by_applicant(UserId(applicant_id))?))
}

pub(crate) async fn stage_processes_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(stage): Path<String>,
) -> Result<Json<ProcessPage>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Ok(Json(service.list_by_stage(parse_stage(&stage)?)?))
}

pub(crate) async fn user_stats_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(applicant_id): Path<u64>,
) -> Result<Json<UserStats>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Ok(Json(service.user_stats(UserId(applicant_id))?))
}

pub(crate) async fn posting_stats_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Path(posting_id): Path<u64>,
) -> Result<Json<PostingStats>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Ok(Json(service.posting_stats(PostingId(posting_id))?))
}

pub(crate) async fn multi_posting_stats_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
    Query(query): Query<PostingIdsQuery>,
) -> Result<Json<PostingStats>, AppError>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let posting_ids = parse_posting_ids(&query.ids)?;
    Ok(Json(service.multi_posting_stats(&posting_ids)?))
}

pub(crate) async fn catalog_handler<R, N>(
    State(service): SharedOrchestrator<R, N>,
) -> Json<Vec<StageInfoView>>
where
    R: ProcessRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Json(service.catalog())
}
