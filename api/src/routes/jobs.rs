use crate::app_state::{AppState, DatabaseConnection};
use crate::utils::{action_error, internal_error};
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use db::dtos::UnitStatus;
use db::entities::Job;
use engine::actions::{Action, Outcome};
use engine::two_phase::TwoPhaseExecutor;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreateParams {
    project_id: Uuid,
    pipeline_id: Uuid,
    /// Cron expression for recurring jobs; omit for a one-off job.
    schedule: Option<String>,
    /// One-off jobs only: when to fire. Omitted means as soon as possible.
    scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreateResponse {
    id: Uuid,
}

pub async fn create(
    State(state): State<AppState>,
    Json(params): Json<JobCreateParams>,
) -> Result<Json<JobCreateResponse>, StatusCode> {
    info!(
        "Received request to create a job for pipeline {}",
        params.pipeline_id
    );

    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    let outcome = executor
        .stage(Action::CreateJob {
            project_id: params.project_id,
            pipeline_id: params.pipeline_id,
            schedule: params.schedule,
            scheduled_for: params.scheduled_for,
        })
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    match outcome {
        Outcome::Created { id } => Ok(Json(JobCreateResponse { id })),
        outcome => Err(internal_error(outcome)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    id: Uuid,
    project_id: Uuid,
    pipeline_id: Uuid,
    schedule: Option<String>,
    one_off: bool,
    next_run_at: Option<DateTime<Utc>>,
    status: UnitStatus,
    requested_time: DateTime<Utc>,
    started_time: Option<DateTime<Utc>>,
    finished_time: Option<DateTime<Utc>>,
}

pub async fn details(
    DatabaseConnection(mut conn): DatabaseConnection,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetails>, StatusCode> {
    let job: Option<Job> = sqlx::query_as(
        r"
        SELECT id, project_id, pipeline_id, schedule, next_run_at, status,
               requested_time, started_time, finished_time
        FROM jobs
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(internal_error)?;

    let Some(job) = job else {
        return Err(StatusCode::NOT_FOUND);
    };

    Ok(Json(JobDetails {
        id: job.id,
        project_id: job.project_id,
        pipeline_id: job.pipeline_id,
        one_off: job.is_one_off(),
        schedule: job.schedule,
        next_run_at: job.next_run_at,
        status: job.status,
        requested_time: job.requested_time,
        started_time: job.started_time,
        finished_time: job.finished_time,
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
        .stage(Action::AbortJob { job_id: id })
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    Ok(StatusCode::NO_CONTENT)
}
