use crate::actions::{Action, Outcome};
use crate::error::{ActionError, EffectFailure, EffectFailures, FinishError};
use crate::runtime::RuntimeClient;
use db::dtos::{ImageSpec, WorkloadRef, WorkloadSpec};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::error;

/// Collateral work planned by an action's database phase and executed only
/// after the surrounding transaction commits.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Start(WorkloadSpec),
    /// `wait: false` issues the stop from a background task so the caller
    /// returns immediately; recovery and other cleanup paths use `wait:
    /// true` to hear about delivery failures.
    Stop { target: WorkloadRef, wait: bool },
    Build(ImageSpec),
}

/// Runs actions in two phases. Phase one stages database mutations inside
/// a single transaction shared by every action in the scope; phase two
/// fires the collateral runtime effects the actions planned, strictly
/// after commit. Dropping the executor without calling [`finish`] rolls
/// everything back and fires nothing, so an error anywhere in phase one
/// leaves no trace.
///
/// [`finish`]: TwoPhaseExecutor::finish
pub struct TwoPhaseExecutor {
    tx: Transaction<'static, Postgres>,
    runtime: Arc<dyn RuntimeClient>,
    effects: Vec<Effect>,
}

impl TwoPhaseExecutor {
    pub async fn begin(
        pool: &PgPool,
        runtime: Arc<dyn RuntimeClient>,
    ) -> Result<Self, ActionError> {
        Ok(Self {
            tx: pool.begin().await?,
            runtime,
            effects: Vec::new(),
        })
    }

    /// Applies the action's mutations inside the shared transaction and
    /// queues its collateral effects. Row locks taken here are held until
    /// the scope commits or rolls back.
    pub async fn stage(&mut self, action: Action) -> Result<Outcome, ActionError> {
        let staged = action.mutate(&mut self.tx).await?;
        self.effects.extend(staged.effects);
        Ok(staged.outcome)
    }

    /// Commits, then fires the queued effects. Effect failures never roll
    /// the commit back; they are logged and returned so the caller can
    /// surface them.
    pub async fn finish(self) -> Result<(), FinishError> {
        let Self {
            tx,
            runtime,
            effects,
        } = self;

        tx.commit().await?;

        let failures = run_effects(runtime, effects).await;
        if failures.is_empty() {
            return Ok(());
        }
        for failure in &failures {
            error!("{failure}");
        }
        Err(EffectFailures(failures).into())
    }
}

/// Fires effects in staging order. A failed effect is recorded and the
/// remaining ones still run; the database already committed, so partial
/// delivery beats none.
async fn run_effects(runtime: Arc<dyn RuntimeClient>, effects: Vec<Effect>) -> Vec<EffectFailure> {
    let mut failures = Vec::new();
    for effect in effects {
        match effect {
            Effect::Start(spec) => {
                let target = spec.target();
                if let Err(source) = runtime.start(spec).await {
                    failures.push(EffectFailure {
                        verb: "start",
                        target,
                        source,
                    });
                }
            }
            Effect::Stop { target, wait: true } => {
                if let Err(source) = runtime.stop(target).await {
                    failures.push(EffectFailure {
                        verb: "stop",
                        target,
                        source,
                    });
                }
            }
            Effect::Stop {
                target,
                wait: false,
            } => {
                let runtime = runtime.clone();
                tokio::spawn(async move {
                    if let Err(error) = runtime.stop(target).await {
                        error!("stop of {target} failed: {error}");
                    }
                });
            }
            Effect::Build(image) => {
                let target = image.target();
                if let Err(source) = runtime.build(image).await {
                    failures.push(EffectFailure {
                        verb: "build",
                        target,
                        source,
                    });
                }
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Default)]
    struct FlakyRuntime {
        fail_builds: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RuntimeClient for FlakyRuntime {
        async fn start(&self, spec: WorkloadSpec) -> Result<(), RuntimeError> {
            self.calls.lock().unwrap().push(format!("start {}", spec.target()));
            Ok(())
        }

        async fn stop(&self, target: WorkloadRef) -> Result<(), RuntimeError> {
            self.calls.lock().unwrap().push(format!("stop {target}"));
            Ok(())
        }

        async fn build(&self, image: ImageSpec) -> Result<(), RuntimeError> {
            self.calls.lock().unwrap().push(format!("build {}", image.target()));
            if self.fail_builds {
                return Err(RuntimeError::Transport("broker is down".into()));
            }
            Ok(())
        }

        async fn has_image(&self, _reference: &str) -> Result<bool, RuntimeError> {
            Ok(false)
        }
    }

    fn run_spec(run_id: Uuid) -> WorkloadSpec {
        WorkloadSpec::PipelineRun {
            run_id,
            project_id: Uuid::new_v4(),
            pipeline_id: Uuid::new_v4(),
            params: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn effects_fire_in_staging_order() {
        let runtime = Arc::new(FlakyRuntime::default());
        let run_id = Uuid::new_v4();
        let build_id = Uuid::new_v4();

        let failures = run_effects(
            runtime.clone(),
            vec![
                Effect::Stop {
                    target: WorkloadRef::JupyterBuild { build_id },
                    wait: true,
                },
                Effect::Start(run_spec(run_id)),
            ],
        )
        .await;

        assert!(failures.is_empty());
        let calls = runtime.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                format!("stop jupyter build {build_id}"),
                format!("start pipeline run {run_id}"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_effect_does_not_block_the_rest() {
        let runtime = Arc::new(FlakyRuntime {
            fail_builds: true,
            ..Default::default()
        });
        let run_id = Uuid::new_v4();

        let failures = run_effects(
            runtime.clone(),
            vec![
                Effect::Build(ImageSpec::Jupyter {
                    build_id: Uuid::new_v4(),
                }),
                Effect::Start(run_spec(run_id)),
            ],
        )
        .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].verb, "build");
        let calls = runtime.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2, "start must still run after the failed build");
        assert_eq!(calls[1], format!("start pipeline run {run_id}"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn async_stop_runs_in_the_background() {
        let runtime = Arc::new(FlakyRuntime::default());
        let target = WorkloadRef::Session {
            project_id: Uuid::new_v4(),
            pipeline_id: Uuid::new_v4(),
        };

        let failures = run_effects(
            runtime.clone(),
            vec![Effect::Stop {
                target,
                wait: false,
            }],
        )
        .await;
        assert!(failures.is_empty(), "background stops never report back");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let calls = runtime.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![format!("stop {target}")]);
    }
}
