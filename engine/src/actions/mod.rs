mod environment_builds;
mod jobs;
mod jupyter_builds;
mod runs;
mod sessions;

use crate::error::ActionError;
use crate::two_phase::Effect;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

/// The closed set of lifecycle operations on schedulable units. Every
/// variant follows the same contract: `mutate` validates and writes the new
/// state inside the executor's transaction and hands back the collateral
/// effects to fire after commit. No variant talks to the runtime itself.
#[derive(Debug, Clone)]
pub enum Action {
    CreateInteractiveRun {
        project_id: Uuid,
        pipeline_id: Uuid,
        params: serde_json::Value,
    },
    AbortPipelineRun {
        run_id: Uuid,
    },
    CreateEnvironmentBuild {
        project_id: Uuid,
        environment_id: Uuid,
    },
    AbortEnvironmentBuild {
        build_id: Uuid,
    },
    CreateJupyterBuild,
    AbortJupyterBuild {
        build_id: Uuid,
    },
    CreateJob {
        project_id: Uuid,
        pipeline_id: Uuid,
        schedule: Option<String>,
        scheduled_for: Option<DateTime<Utc>>,
    },
    RunJob {
        job_id: Uuid,
    },
    AbortJob {
        job_id: Uuid,
    },
    LaunchInteractiveSession {
        project_id: Uuid,
        pipeline_id: Uuid,
    },
    StopInteractiveSession {
        project_id: Uuid,
        pipeline_id: Uuid,
        async_mode: bool,
    },
}

/// Caller-visible result of an action's database phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The unit reached the requested state.
    Applied,
    /// Nothing to do: the unit is missing, already terminal, or claimed by
    /// a concurrent actor.
    NoOp,
    /// A new unit record exists under this id.
    Created { id: Uuid },
    /// A due job produced a new pipeline run.
    Dispatched { run_id: Uuid },
}

pub(crate) struct Staged {
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

impl Staged {
    fn no_op() -> Self {
        Staged {
            outcome: Outcome::NoOp,
            effects: Vec::new(),
        }
    }
}

impl Action {
    pub(crate) async fn mutate(self, conn: &mut PgConnection) -> Result<Staged, ActionError> {
        match self {
            Action::CreateInteractiveRun {
                project_id,
                pipeline_id,
                params,
            } => runs::create_interactive(conn, project_id, pipeline_id, params).await,
            Action::AbortPipelineRun { run_id } => runs::abort(conn, run_id).await,
            Action::CreateEnvironmentBuild {
                project_id,
                environment_id,
            } => environment_builds::create(conn, project_id, environment_id).await,
            Action::AbortEnvironmentBuild { build_id } => {
                environment_builds::abort(conn, build_id).await
            }
            Action::CreateJupyterBuild => jupyter_builds::create(conn).await,
            Action::AbortJupyterBuild { build_id } => jupyter_builds::abort(conn, build_id).await,
            Action::CreateJob {
                project_id,
                pipeline_id,
                schedule,
                scheduled_for,
            } => jobs::create(conn, project_id, pipeline_id, schedule, scheduled_for).await,
            Action::RunJob { job_id } => jobs::run(conn, job_id).await,
            Action::AbortJob { job_id } => jobs::abort(conn, job_id).await,
            Action::LaunchInteractiveSession {
                project_id,
                pipeline_id,
            } => sessions::launch(conn, project_id, pipeline_id).await,
            Action::StopInteractiveSession {
                project_id,
                pipeline_id,
                async_mode,
            } => sessions::stop(conn, project_id, pipeline_id, async_mode).await,
        }
    }
}
