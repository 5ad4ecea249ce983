use crate::actions::{Outcome, Staged};
use crate::error::ActionError;
use crate::schedule::next_run_after;
use crate::two_phase::Effect;
use chrono::{DateTime, Utc};
use db::dtos::{UnitStatus, WorkloadRef, WorkloadSpec};
use db::entities::Job;
use sqlx::PgConnection;
use uuid::Uuid;

pub(super) async fn create(
    conn: &mut PgConnection,
    project_id: Uuid,
    pipeline_id: Uuid,
    schedule: Option<String>,
    scheduled_for: Option<DateTime<Utc>>,
) -> Result<Staged, ActionError> {
    let next_run_at = match &schedule {
        Some(expr) => next_run_after(expr, Utc::now())
            .map_err(|source| ActionError::InvalidSchedule {
                expr: expr.clone(),
                source,
            })?
            .ok_or_else(|| ActionError::ScheduleExhausted { expr: expr.clone() })?,
        // One-off jobs without an explicit time run as soon as a scheduler
        // picks them up.
        None => scheduled_for.unwrap_or_else(Utc::now),
    };

    let job_id: Uuid = sqlx::query_scalar(
        r"
        INSERT INTO jobs (project_id, pipeline_id, schedule, next_run_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .bind(&schedule)
    .bind(next_run_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Created { id: job_id },
        effects: Vec::new(),
    })
}

/// Dispatches one due job. The claim query does the whole race dance at
/// once: `SKIP LOCKED` loses gracefully to a replica holding the row, and
/// re-checking `next_run_at` under the lock drops claims that were
/// satisfied between the candidate scan and now.
pub(super) async fn run(conn: &mut PgConnection, job_id: Uuid) -> Result<Staged, ActionError> {
    let job: Option<Job> = sqlx::query_as(
        r"
        SELECT id, project_id, pipeline_id, schedule, next_run_at, status,
               requested_time, started_time, finished_time
        FROM jobs
        WHERE id = $1
          AND status IN ('PENDING', 'STARTED')
          AND next_run_at IS NOT NULL
          AND next_run_at <= now()
        FOR UPDATE SKIP LOCKED
        ",
    )
    .bind(job_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(job) = job else {
        return Ok(Staged::no_op());
    };

    let run_id: Uuid = sqlx::query_scalar(
        r"
        INSERT INTO pipeline_runs (project_id, pipeline_id, job_id)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(job.project_id)
    .bind(job.pipeline_id)
    .bind(job.id)
    .fetch_one(&mut *conn)
    .await?;

    // Cron jobs advance from the current instant, so a backlog of missed
    // occurrences collapses into this single run. One-off jobs are done
    // scheduling once dispatched.
    let next_run_at = match &job.schedule {
        Some(expr) => {
            next_run_after(expr, Utc::now()).map_err(|source| ActionError::InvalidSchedule {
                expr: expr.clone(),
                source,
            })?
        }
        None => None,
    };

    sqlx::query(
        r"
        UPDATE jobs
        SET status = 'STARTED',
            started_time = COALESCE(started_time, now()),
            next_run_at = $2
        WHERE id = $1
        ",
    )
    .bind(job.id)
    .bind(next_run_at)
    .execute(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Dispatched { run_id },
        effects: vec![Effect::Start(WorkloadSpec::PipelineRun {
            run_id,
            project_id: job.project_id,
            pipeline_id: job.pipeline_id,
            params: serde_json::json!({}),
        })],
    })
}

pub(super) async fn abort(conn: &mut PgConnection, job_id: Uuid) -> Result<Staged, ActionError> {
    let status: Option<UnitStatus> =
        sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(status) = status else {
        return Ok(Staged::no_op());
    };
    if !status.abortable() {
        return Ok(Staged::no_op());
    }

    // Clearing next_run_at unschedules the job in the same stroke.
    sqlx::query(
        r"
        UPDATE jobs
        SET status = 'ABORTED', next_run_at = NULL, finished_time = now()
        WHERE id = $1
        ",
    )
    .bind(job_id)
    .execute(&mut *conn)
    .await?;

    Ok(Staged {
        outcome: Outcome::Applied,
        effects: vec![Effect::Stop {
            target: WorkloadRef::Job { job_id },
            wait: true,
        }],
    })
}
