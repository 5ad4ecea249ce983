use crate::actions::{Outcome, Staged};
use crate::error::ActionError;
use crate::two_phase::Effect;
use db::dtos::{UnitStatus, WorkloadRef, WorkloadSpec};
use sqlx::PgConnection;
use uuid::Uuid;

pub(super) async fn create_interactive(
    conn: &mut PgConnection,
    project_id: Uuid,
    pipeline_id: Uuid,
    params: serde_json::Value,
) -> Result<Staged, ActionError> {
    let run_id: Uuid = sqlx::query_scalar(
        r"
        INSERT INTO pipeline_runs (project_id, pipeline_id, params)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .bind(&params)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Created { id: run_id },
        effects: vec![Effect::Start(WorkloadSpec::PipelineRun {
            run_id,
            project_id,
            pipeline_id,
            params,
        })],
    })
}

pub(super) async fn abort(conn: &mut PgConnection, run_id: Uuid) -> Result<Staged, ActionError> {
    // The row lock serializes concurrent aborts of the same run; it is
    // held until the surrounding transaction ends.
    let status: Option<UnitStatus> =
        sqlx::query_scalar("SELECT status FROM pipeline_runs WHERE id = $1 FOR UPDATE")
            .bind(run_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(status) = status else {
        return Ok(Staged::no_op());
    };
    if !status.abortable() {
        return Ok(Staged::no_op());
    }

    sqlx::query("UPDATE pipeline_runs SET status = 'ABORTED', finished_time = now() WHERE id = $1")
        .bind(run_id)
        .execute(&mut *conn)
        .await?;

    Ok(Staged {
        outcome: Outcome::Applied,
        effects: vec![Effect::Stop {
            target: WorkloadRef::PipelineRun { run_id },
            wait: true,
        }],
    })
}
