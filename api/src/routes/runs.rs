use crate::app_state::{AppState, DatabaseConnection};
use crate::utils::{action_error, advance_unit_status, internal_error};
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use db::dtos::UnitStatus;
use db::entities::PipelineRun;
use engine::actions::{Action, Outcome};
use engine::two_phase::TwoPhaseExecutor;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

fn no_params() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCreateParams {
    project_id: Uuid,
    pipeline_id: Uuid,
    #[serde(default = "no_params")]
    params: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCreateResponse {
    id: Uuid,
}

pub async fn create(
    State(state): State<AppState>,
    Json(params): Json<RunCreateParams>,
) -> Result<Json<RunCreateResponse>, StatusCode> {
    info!(
        "Received request to run pipeline {} interactively",
        params.pipeline_id
    );

    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    let outcome = executor
        .stage(Action::CreateInteractiveRun {
            project_id: params.project_id,
            pipeline_id: params.pipeline_id,
            params: params.params,
        })
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    match outcome {
        Outcome::Created { id } => Ok(Json(RunCreateResponse { id })),
        outcome => Err(internal_error(outcome)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    id: Uuid,
    project_id: Uuid,
    pipeline_id: Uuid,
    job_id: Option<Uuid>,
    status: UnitStatus,
    params: serde_json::Value,
    requested_time: DateTime<Utc>,
    started_time: Option<DateTime<Utc>>,
    finished_time: Option<DateTime<Utc>>,
}

pub async fn details(
    DatabaseConnection(mut conn): DatabaseConnection,
    Path(id): Path<Uuid>,
) -> Result<Json<RunDetails>, StatusCode> {
    let run: Option<PipelineRun> = sqlx::query_as(
        r"
        SELECT id, project_id, pipeline_id, job_id, status, params,
               requested_time, started_time, finished_time
        FROM pipeline_runs
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(internal_error)?;

    let Some(run) = run else {
        return Err(StatusCode::NOT_FOUND);
    };

    Ok(Json(RunDetails {
        id: run.id,
        project_id: run.project_id,
        pipeline_id: run.pipeline_id,
        job_id: run.job_id,
        status: run.status,
        params: run.params,
        requested_time: run.requested_time,
        started_time: run.started_time,
        finished_time: run.finished_time,
    }))
}

pub async fn abort(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    executor
        .stage(Action::AbortPipelineRun { run_id: id })
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct StatusUpdateParams {
    status: UnitStatus,
}

pub async fn update_status(
    DatabaseConnection(mut conn): DatabaseConnection,
    Path(id): Path<Uuid>,
    Json(params): Json<StatusUpdateParams>,
) -> Result<StatusCode, StatusCode> {
    advance_unit_status(&mut conn, "pipeline_runs", id, params.status).await
}
