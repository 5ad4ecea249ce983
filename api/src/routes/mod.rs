mod environment_builds;
mod jobs;
mod jupyter_builds;
mod runs;
mod sessions;

use crate::app_state::AppState;
use axum::routing::{delete, get, post, put};
use axum::Router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/runs", post(runs::create))
        .route("/api/runs/:id", get(runs::details).delete(runs::abort))
        .route("/api/runs/:id/status", put(runs::update_status))
        .route("/api/environment-builds", post(environment_builds::create))
        .route(
            "/api/environment-builds/:id",
            get(environment_builds::details).delete(environment_builds::abort),
        )
        .route(
            "/api/environment-builds/:id/status",
            put(environment_builds::update_status),
        )
        .route("/api/jupyter-builds", post(jupyter_builds::create))
        .route(
            "/api/jupyter-builds/:id",
            get(jupyter_builds::details).delete(jupyter_builds::abort),
        )
        .route(
            "/api/jupyter-builds/:id/status",
            put(jupyter_builds::update_status),
        )
        .route("/api/jobs", post(jobs::create))
        .route("/api/jobs/:id", get(jobs::details).delete(jobs::abort))
        .route("/api/sessions", post(sessions::launch).get(sessions::list))
        .route(
            "/api/sessions/:project_id/:pipeline_id",
            delete(sessions::stop),
        )
        .with_state(state)
}
