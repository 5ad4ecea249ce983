use crate::actions::{Outcome, Staged};
use crate::error::ActionError;
use crate::two_phase::Effect;
use db::dtos::{SessionStatus, WorkloadRef, WorkloadSpec};
use sqlx::PgConnection;
use uuid::Uuid;

/// Sessions are keyed by pipeline, one row each. A stopped row is revived
/// in place rather than replaced, so the requested time always reflects
/// the latest launch.
pub(super) async fn launch(
    conn: &mut PgConnection,
    project_id: Uuid,
    pipeline_id: Uuid,
) -> Result<Staged, ActionError> {
    let existing: Option<SessionStatus> = sqlx::query_scalar(
        r"
        SELECT status FROM interactive_sessions
        WHERE project_id = $1 AND pipeline_id = $2
        FOR UPDATE
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(SessionStatus::Running) => {
            return Err(ActionError::SessionAlreadyRunning {
                project_id,
                pipeline_id,
            });
        }
        Some(SessionStatus::Stopped) => {
            sqlx::query(
                r"
                UPDATE interactive_sessions
                SET status = 'RUNNING', requested_time = now(), stopped_time = NULL
                WHERE project_id = $1 AND pipeline_id = $2
                ",
            )
            .bind(project_id)
            .bind(pipeline_id)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO interactive_sessions (project_id, pipeline_id) VALUES ($1, $2)",
            )
            .bind(project_id)
            .bind(pipeline_id)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(Staged {
        outcome: Outcome::Applied,
        effects: vec![Effect::Start(WorkloadSpec::Session {
            project_id,
            pipeline_id,
        })],
    })
}

pub(super) async fn stop(
    conn: &mut PgConnection,
    project_id: Uuid,
    pipeline_id: Uuid,
    async_mode: bool,
) -> Result<Staged, ActionError> {
    let status: Option<SessionStatus> = sqlx::query_scalar(
        r"
        SELECT status FROM interactive_sessions
        WHERE project_id = $1 AND pipeline_id = $2
        FOR UPDATE
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(status) = status else {
        return Ok(Staged::no_op());
    };
    if status == SessionStatus::Stopped {
        return Ok(Staged::no_op());
    }

    sqlx::query(
        r"
        UPDATE interactive_sessions
        SET status = 'STOPPED', stopped_time = now()
        WHERE project_id = $1 AND pipeline_id = $2
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .execute(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Applied,
        effects: vec![Effect::Stop {
            target: WorkloadRef::Session {
                project_id,
                pipeline_id,
            },
            wait: !async_mode,
        }],
    })
}
