use crate::runtime::RuntimeError;
use db::dtos::WorkloadRef;
use std::fmt;
use uuid::Uuid;

/// Failure of an action's database-mutation phase. The surrounding
/// transaction is rolled back, so none of the action's writes survive.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("a jupyter build is already in flight")]
    JupyterBuildInFlight,
    #[error("session {project_id}/{pipeline_id} is already running")]
    SessionAlreadyRunning { project_id: Uuid, pipeline_id: Uuid },
    #[error("invalid cron expression {expr:?}: {source}")]
    InvalidSchedule {
        expr: String,
        #[source]
        source: cron::error::Error,
    },
    #[error("cron expression {expr:?} has no upcoming occurrence")]
    ScheduleExhausted { expr: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A collateral effect that failed after its transaction committed. The
/// committed state stands; the runtime side is expected to reconcile once
/// it is reachable again.
#[derive(Debug, thiserror::Error)]
#[error("{verb} of {target} failed: {source}")]
pub struct EffectFailure {
    pub verb: &'static str,
    pub target: WorkloadRef,
    #[source]
    pub source: RuntimeError,
}

#[derive(Debug)]
pub struct EffectFailures(pub Vec<EffectFailure>);

impl fmt::Display for EffectFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} collateral effect(s) failed", self.0.len())?;
        for failure in &self.0 {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EffectFailures {}

#[derive(Debug, thiserror::Error)]
pub enum FinishError {
    #[error("failed to commit transaction")]
    Commit(#[from] sqlx::Error),
    #[error(transparent)]
    Effects(#[from] EffectFailures),
}

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Finish(#[from] FinishError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
