use crate::app_state::{AppState, DatabaseConnection};
use crate::utils::{action_error, internal_error};
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use db::dtos::SessionStatus;
use db::entities::InteractiveSession;
use engine::actions::Action;
use engine::two_phase::TwoPhaseExecutor;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLaunchParams {
    project_id: Uuid,
    pipeline_id: Uuid,
}

pub async fn launch(
    State(state): State<AppState>,
    Json(params): Json<SessionLaunchParams>,
) -> Result<StatusCode, StatusCode> {
    info!(
        "Received request to launch a session for pipeline {}",
        params.pipeline_id
    );

    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    executor
        .stage(Action::LaunchInteractiveSession {
            project_id: params.project_id,
            pipeline_id: params.pipeline_id,
        })
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    Ok(StatusCode::CREATED)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListItem {
    project_id: Uuid,
    pipeline_id: Uuid,
    status: SessionStatus,
    requested_time: DateTime<Utc>,
    stopped_time: Option<DateTime<Utc>>,
}

pub async fn list(
    DatabaseConnection(mut conn): DatabaseConnection,
) -> Result<Json<Vec<SessionListItem>>, StatusCode> {
    let sessions: Vec<InteractiveSession> = sqlx::query_as(
        r"
        SELECT project_id, pipeline_id, status, requested_time, stopped_time
        FROM interactive_sessions
        ORDER BY requested_time DESC
        ",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(internal_error)?;

    Ok(Json(
        sessions
            .into_iter()
            .map(|session| SessionListItem {
                project_id: session.project_id,
                pipeline_id: session.pipeline_id,
                status: session.status,
                requested_time: session.requested_time,
                stopped_time: session.stopped_time,
            })
            .collect(),
    ))
}

/// The stop request returns once the state flip is committed; the workload
/// teardown itself happens in the background.
pub async fn stop(
    State(state): State<AppState>,
    Path((project_id, pipeline_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    let mut executor = TwoPhaseExecutor::begin(&state.db, state.runtime.clone())
        .await
        .map_err(action_error)?;
    executor
        .stage(Action::StopInteractiveSession {
            project_id,
            pipeline_id,
            async_mode: true,
        })
        .await
        .map_err(action_error)?;
    executor.finish().await.map_err(internal_error)?;

    Ok(StatusCode::NO_CONTENT)
}
