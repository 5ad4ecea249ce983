use crate::app_state::{AppState, DatabaseConnection};
use crate::utils::{action_error, advance_unit_status, internal_error};
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use db::dtos::UnitStatus;
use db::entities::JupyterBuild;
use engine::actions::{Action, Outcome};
use engine::two_phase::TwoPhaseExecutor;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCreateResponse {
    id: Uuid,
}

pub async fn create(
    State(state): State<AppState>,
) -> Result<Json<BuildCreateResponse>, StatusCode> {
    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    let outcome = executor
        .stage(Action::CreateJupyterBuild)
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    match outcome {
        Outcome::Created { id } => Ok(Json(BuildCreateResponse { id })),
        outcome => Err(internal_error(outcome)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    id: Uuid,
    status: UnitStatus,
    requested_time: DateTime<Utc>,
    started_time: Option<DateTime<Utc>>,
    finished_time: Option<DateTime<Utc>>,
}

pub async fn details(
    DatabaseConnection(mut conn): DatabaseConnection,
    Path(id): Path<Uuid>,
) -> Result<Json<BuildDetails>, StatusCode> {
    let build: Option<JupyterBuild> = sqlx::query_as(
        r"
        SELECT id, status, requested_time, started_time, finished_time
        FROM jupyter_builds
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(internal_error)?;

    let Some(build) = build else {
        return Err(StatusCode::NOT_FOUND);
    };

    Ok(Json(BuildDetails {
        id: build.id,
        status: build.status,
        requested_time: build.requested_time,
        started_time: build.started_time,
        finished_time: build.finished_time,
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
        .stage(Action::AbortJupyterBuild { build_id: id })
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
    advance_unit_status(&mut conn, "jupyter_builds", id, params.status).await
}
