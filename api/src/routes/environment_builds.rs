use crate::app_state::{AppState, DatabaseConnection};
use crate::utils::{action_error, advance_unit_status, internal_error};
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use db::dtos::UnitStatus;
use db::entities::EnvironmentBuild;
use engine::actions::{Action, Outcome};
use engine::two_phase::TwoPhaseExecutor;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCreateParams {
    project_id: Uuid,
    environment_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCreateResponse {
    id: Uuid,
}

pub async fn create(
    State(state): State<AppState>,
    Json(params): Json<BuildCreateParams>,
) -> Result<Json<BuildCreateResponse>, StatusCode> {
    info!(
        "Received request to build environment {}",
        params.environment_id
    );

    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    let outcome = executor
        .stage(Action::CreateEnvironmentBuild {
            project_id: params.project_id,
            environment_id: params.environment_id,
        })
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
    project_id: Uuid,
    environment_id: Uuid,
    status: UnitStatus,
    requested_time: DateTime<Utc>,
    started_time: Option<DateTime<Utc>>,
    finished_time: Option<DateTime<Utc>>,
}

pub async fn details(
    DatabaseConnection(mut conn): DatabaseConnection,
    Path(id): Path<Uuid>,
) -> Result<Json<BuildDetails>, StatusCode> {
    let build: Option<EnvironmentBuild> = sqlx::query_as(
        r"
        SELECT id, project_id, environment_id, status,
               requested_time, started_time, finished_time
        FROM environment_builds
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
        project_id: build.project_id,
        environment_id: build.environment_id,
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
        .stage(Action::AbortEnvironmentBuild { build_id: id })
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
    advance_unit_status(&mut conn, "environment_builds", id, params.status).await
}
