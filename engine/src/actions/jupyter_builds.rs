use crate::actions::{Outcome, Staged};
use crate::error::ActionError;
use crate::two_phase::Effect;
use db::dtos::{ImageSpec, UnitStatus, WorkloadRef};
use sqlx::PgConnection;
use uuid::Uuid;

/// At most one jupyter build may be in flight; a second request is
/// rejected instead of queued.
pub(super) async fn create(conn: &mut PgConnection) -> Result<Staged, ActionError> {
    let in_flight: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM jupyter_builds WHERE status IN ('PENDING', 'STARTED') LIMIT 1 FOR UPDATE",
    )
    .fetch_optional(&mut *conn)
    .await?;

    if in_flight.is_some() {
        return Err(ActionError::JupyterBuildInFlight);
    }

    let build_id: Uuid =
        sqlx::query_scalar("INSERT INTO jupyter_builds DEFAULT VALUES RETURNING id")
            .fetch_one(&mut *conn)
            .await?;

    Ok(Staged {
        outcome: Outcome::Created { id: build_id },
        effects: vec![Effect::Build(ImageSpec::Jupyter { build_id })],
    })
}

pub(super) async fn abort(conn: &mut PgConnection, build_id: Uuid) -> Result<Staged, ActionError> {
    let status: Option<UnitStatus> =
        sqlx::query_scalar("SELECT status FROM jupyter_builds WHERE id = $1 FOR UPDATE")
            .bind(build_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(status) = status else {
        return Ok(Staged::no_op());
    };
    if !status.abortable() {
        return Ok(Staged::no_op());
    }

    sqlx::query(
        "UPDATE jupyter_builds SET status = 'ABORTED', finished_time = now() WHERE id = $1",
    )
    .bind(build_id)
    .execute(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Applied,
        effects: vec![Effect::Stop {
            target: WorkloadRef::JupyterBuild { build_id },
            wait: true,
        }],
    })
}
