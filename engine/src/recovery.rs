use crate::actions::Action;
use crate::error::RecoveryError;
use crate::runtime::RuntimeClient;
use crate::two_phase::TwoPhaseExecutor;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// What the startup recovery pass managed to do. Steps fail independently
/// of one another, so a broken one leaves the rest of the slate clean.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub failures: Vec<StepFailure>,
}

#[derive(Debug)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: RecoveryError,
}

impl RecoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: &'static str, result: Result<(), RecoveryError>) {
        if let Err(error) = result {
            self.failures.push(StepFailure { step, error });
        }
    }
}

/// Reconciles persisted state with the fact that no workload survives a
/// control-plane crash. Orphaned non-terminal units are driven to their
/// aborted or stopped state through the same actions user requests go
/// through, so stop requests reach the runtime exactly as they would have
/// in normal operation; afterwards the jupyter build history is pruned to
/// its most recent entry.
pub async fn run_recovery(pool: &PgPool, runtime: Arc<dyn RuntimeClient>) -> RecoveryReport {
    info!("starting recovery pass");
    let mut report = RecoveryReport::default();

    report.record(
        "abort-pipeline-runs",
        abort_orphaned_runs(pool, &runtime).await,
    );
    report.record(
        "stop-sessions",
        stop_lingering_sessions(pool, &runtime).await,
    );
    report.record(
        "abort-environment-builds",
        abort_orphaned_environment_builds(pool, &runtime).await,
    );
    report.record(
        "abort-jupyter-builds",
        abort_orphaned_jupyter_builds(pool, &runtime).await,
    );
    report.record(
        "abort-one-off-jobs",
        abort_orphaned_one_off_jobs(pool, &runtime).await,
    );
    report.record(
        "prune-jupyter-builds",
        prune_jupyter_build_history(pool).await,
    );

    for failure in &report.failures {
        error!("recovery step {} failed: {}", failure.step, failure.error);
    }
    if report.is_clean() {
        info!("recovery pass finished with a clean slate");
    }
    report
}

async fn abort_orphaned_runs(
    pool: &PgPool,
    runtime: &Arc<dyn RuntimeClient>,
) -> Result<(), RecoveryError> {
    let orphaned: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM pipeline_runs WHERE status IN ('PENDING', 'STARTED')")
            .fetch_all(pool)
            .await?;
    if orphaned.is_empty() {
        return Ok(());
    }

    info!("aborting {} orphaned pipeline runs", orphaned.len());
    let mut executor = TwoPhaseExecutor::begin(pool, runtime.clone()).await?;
    for run_id in orphaned {
        executor.stage(Action::AbortPipelineRun { run_id }).await?;
    }
    executor.finish().await?;
    Ok(())
}

async fn stop_lingering_sessions(
    pool: &PgPool,
    runtime: &Arc<dyn RuntimeClient>,
) -> Result<(), RecoveryError> {
    // Every session row, regardless of status: none can have legitimately
    // survived the crash, and stopping a stopped one is a no-op.
    let sessions: Vec<(Uuid, Uuid)> =
        sqlx::query_as("SELECT project_id, pipeline_id FROM interactive_sessions")
            .fetch_all(pool)
            .await?;
    if sessions.is_empty() {
        return Ok(());
    }

    info!("stopping {} lingering sessions", sessions.len());
    let mut executor = TwoPhaseExecutor::begin(pool, runtime.clone()).await?;
    for (project_id, pipeline_id) in sessions {
        executor
            .stage(Action::StopInteractiveSession {
                project_id,
                pipeline_id,
                async_mode: false,
            })
            .await?;
    }
    executor.finish().await?;
    Ok(())
}

async fn abort_orphaned_environment_builds(
    pool: &PgPool,
    runtime: &Arc<dyn RuntimeClient>,
) -> Result<(), RecoveryError> {
    let orphaned: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM environment_builds WHERE status IN ('PENDING', 'STARTED')",
    )
    .fetch_all(pool)
    .await?;
    if orphaned.is_empty() {
        return Ok(());
    }

    info!("aborting {} orphaned environment builds", orphaned.len());
    let mut executor = TwoPhaseExecutor::begin(pool, runtime.clone()).await?;
    for build_id in orphaned {
        executor
            .stage(Action::AbortEnvironmentBuild { build_id })
            .await?;
    }
    executor.finish().await?;
    Ok(())
}

async fn abort_orphaned_jupyter_builds(
    pool: &PgPool,
    runtime: &Arc<dyn RuntimeClient>,
) -> Result<(), RecoveryError> {
    let orphaned: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM jupyter_builds WHERE status IN ('PENDING', 'STARTED')")
            .fetch_all(pool)
            .await?;
    if orphaned.is_empty() {
        return Ok(());
    }

    info!("aborting {} orphaned jupyter builds", orphaned.len());
    let mut executor = TwoPhaseExecutor::begin(pool, runtime.clone()).await?;
    for build_id in orphaned {
        executor.stage(Action::AbortJupyterBuild { build_id }).await?;
    }
    executor.finish().await?;
    Ok(())
}

/// Only one-off jobs get aborted here. Cron jobs keep their schedule
/// across restarts and simply fire again at the next occurrence.
async fn abort_orphaned_one_off_jobs(
    pool: &PgPool,
    runtime: &Arc<dyn RuntimeClient>,
) -> Result<(), RecoveryError> {
    let orphaned: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM jobs WHERE schedule IS NULL AND status = 'STARTED'")
            .fetch_all(pool)
            .await?;
    if orphaned.is_empty() {
        return Ok(());
    }

    info!("aborting {} orphaned one-off jobs", orphaned.len());
    let mut executor = TwoPhaseExecutor::begin(pool, runtime.clone()).await?;
    for job_id in orphaned {
        executor.stage(Action::AbortJob { job_id }).await?;
    }
    executor.finish().await?;
    Ok(())
}

/// Keeps only the most recently requested jupyter build, whatever its
/// status. A single statement so the retention decision and the delete
/// cannot disagree.
async fn prune_jupyter_build_history(pool: &PgPool) -> Result<(), RecoveryError> {
    let pruned = sqlx::query(
        r"
        DELETE FROM jupyter_builds
        WHERE id IN (
            SELECT id FROM jupyter_builds ORDER BY requested_time DESC OFFSET 1
        )
        ",
    )
    .execute(pool)
    .await?;

    if pruned.rows_affected() > 0 {
        info!("pruned {} superseded jupyter builds", pruned.rows_affected());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_failures_without_short_circuiting() {
        let mut report = RecoveryReport::default();
        report.record("first", Ok(()));
        report.record(
            "second",
            Err(RecoveryError::Database(sqlx::Error::RowNotFound)),
        );
        report.record("third", Ok(()));

        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, "second");
    }
}
