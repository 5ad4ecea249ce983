use crate::actions::{Outcome, Staged};
use crate::error::ActionError;
use crate::two_phase::Effect;
use db::dtos::{ImageSpec, UnitStatus, WorkloadRef};
use sqlx::PgConnection;
use uuid::Uuid;

/// Requesting a build supersedes any in-flight build of the same
/// environment: the old ones are aborted in the same transaction that
/// records the new one, so observers never see two live builds.
pub(super) async fn create(
    conn: &mut PgConnection,
    project_id: Uuid,
    environment_id: Uuid,
) -> Result<Staged, ActionError> {
    let in_flight: Vec<Uuid> = sqlx::query_scalar(
        r"
        SELECT id FROM environment_builds
        WHERE project_id = $1 AND environment_id = $2 AND status IN ('PENDING', 'STARTED')
        FOR UPDATE
        ",
    )
    .bind(project_id)
    .bind(environment_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut effects = Vec::new();
    for build_id in in_flight {
        let staged = abort(conn, build_id).await?;
        effects.extend(staged.effects);
    }

    let build_id: Uuid = sqlx::query_scalar(
        r"
        INSERT INTO environment_builds (project_id, environment_id)
        VALUES ($1, $2)
        RETURNING id
        ",
    )
    .bind(project_id)
    .bind(environment_id)
    .fetch_one(&mut *conn)
    .await?;

    effects.push(Effect::Build(ImageSpec::Environment {
        build_id,
        project_id,
        environment_id,
    }));

    Ok(Staged {
        outcome: Outcome::Created { id: build_id },
        effects,
    })
}

pub(super) async fn abort(conn: &mut PgConnection, build_id: Uuid) -> Result<Staged, ActionError> {
    let status: Option<UnitStatus> =
        sqlx::query_scalar("SELECT status FROM environment_builds WHERE id = $1 FOR UPDATE")
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
        "UPDATE environment_builds SET status = 'ABORTED', finished_time = now() WHERE id = $1",
    )
    .bind(build_id)
    .execute(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Applied,
        effects: vec![Effect::Stop {
            target: WorkloadRef::EnvironmentBuild { build_id },
            wait: true,
        }],
    })
}
