use crate::actions::{Action, Outcome};
use crate::error::ActionError;
use crate::runtime::RuntimeClient;
use crate::two_phase::TwoPhaseExecutor;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Periodic dispatcher of due jobs. Every process holding the scheduler
/// role runs its own copy; replicas coordinate through row locks in the
/// shared database and nothing else, so any number of them may tick at
/// the same moment.
pub struct Scheduler {
    pool: PgPool,
    runtime: Arc<dyn RuntimeClient>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pool: PgPool, runtime: Arc<dyn RuntimeClient>, interval: Duration) -> Self {
        Self {
            pool,
            runtime,
            interval,
        }
    }

    /// Spawns the loop. Each tick runs as its own task, so a slow tick
    /// delays nothing and however many ticks pile up they all eventually
    /// fire; a late dispatch beats a dropped one.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("scheduler started, ticking every {:?}", self.interval);
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let pool = self.pool.clone();
                let runtime = self.runtime.clone();
                tokio::spawn(async move {
                    if let Err(error) = check_due_jobs(&pool, runtime).await {
                        warn!("scheduler tick failed: {error}");
                    }
                });
            }
        })
    }
}

/// One scheduler tick: scan for due jobs and dispatch a run for each.
/// Every candidate is claimed in its own executor scope; replicas that
/// lose the claim observe a no-op and move on.
pub async fn check_due_jobs(
    pool: &PgPool,
    runtime: Arc<dyn RuntimeClient>,
) -> Result<(), ActionError> {
    let due: Vec<Uuid> = sqlx::query_scalar(
        r"
        SELECT id FROM jobs
        WHERE next_run_at IS NOT NULL AND next_run_at <= now()
        ORDER BY next_run_at
        ",
    )
    .fetch_all(pool)
    .await?;

    for job_id in due {
        match dispatch(pool, runtime.clone(), job_id).await {
            Ok(Outcome::Dispatched { run_id }) => {
                info!("job {job_id} dispatched pipeline run {run_id}");
            }
            Ok(_) => {}
            Err(error) => warn!("dispatch of job {job_id} failed: {error}"),
        }
    }

    Ok(())
}

async fn dispatch(
    pool: &PgPool,
    runtime: Arc<dyn RuntimeClient>,
    job_id: Uuid,
) -> Result<Outcome, ActionError> {
    let mut executor = TwoPhaseExecutor::begin(pool, runtime).await?;
    let outcome = executor.stage(Action::RunJob { job_id }).await?;
    if let Outcome::Dispatched { .. } = outcome {
        if let Err(error) = executor.finish().await {
            warn!("effects of job {job_id} dispatch failed: {error}");
        }
    }
    Ok(outcome)
}

/// One-shot provisioning check run when a scheduler process boots: if the
/// operator supplied a jupyter setup script and the runtime holds no
/// jupyter image yet, request the first build. Never fatal; failures are
/// logged and the next boot tries again.
pub async fn trigger_conditional_jupyter_build(
    pool: &PgPool,
    runtime: Arc<dyn RuntimeClient>,
    setup_script: &Path,
    image_reference: &str,
) {
    let script = match tokio::fs::read_to_string(setup_script).await {
        Ok(contents) => contents,
        // No setup script means the stock image is good enough.
        Err(_) => return,
    };
    if script.trim().is_empty() {
        return;
    }

    match runtime.has_image(image_reference).await {
        Ok(true) => return,
        Ok(false) => {}
        Err(error) => {
            warn!("jupyter image probe failed: {error}");
            return;
        }
    }

    let mut executor = match TwoPhaseExecutor::begin(pool, runtime).await {
        Ok(executor) => executor,
        Err(error) => {
            error!("failed to request jupyter build: {error}");
            return;
        }
    };
    match executor.stage(Action::CreateJupyterBuild).await {
        Ok(_) => match executor.finish().await {
            Ok(()) => info!("requested initial jupyter image build"),
            Err(error) => error!("failed to request jupyter build: {error}"),
        },
        // Another replica already got the build going.
        Err(ActionError::JupyterBuildInFlight) => {}
        Err(error) => error!("failed to request jupyter build: {error}"),
    }
}
