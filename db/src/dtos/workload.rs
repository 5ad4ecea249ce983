use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Addresses an existing workload owned by a schedulable unit. This is the
/// payload of stop requests sent to the container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkloadRef {
    PipelineRun {
        run_id: Uuid,
    },
    EnvironmentBuild {
        build_id: Uuid,
    },
    JupyterBuild {
        build_id: Uuid,
    },
    Job {
        job_id: Uuid,
    },
    Session {
        project_id: Uuid,
        pipeline_id: Uuid,
    },
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadRef::PipelineRun { run_id } => write!(f, "pipeline run {run_id}"),
            WorkloadRef::EnvironmentBuild { build_id } => {
                write!(f, "environment build {build_id}")
            }
            WorkloadRef::JupyterBuild { build_id } => write!(f, "jupyter build {build_id}"),
            WorkloadRef::Job { job_id } => write!(f, "job {job_id}"),
            WorkloadRef::Session {
                project_id,
                pipeline_id,
            } => write!(f, "session {project_id}/{pipeline_id}"),
        }
    }
}

/// Everything the runtime needs to start a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkloadSpec {
    PipelineRun {
        run_id: Uuid,
        project_id: Uuid,
        pipeline_id: Uuid,
        params: serde_json::Value,
    },
    Session {
        project_id: Uuid,
        pipeline_id: Uuid,
    },
}

impl WorkloadSpec {
    pub fn target(&self) -> WorkloadRef {
        match *self {
            WorkloadSpec::PipelineRun { run_id, .. } => WorkloadRef::PipelineRun { run_id },
            WorkloadSpec::Session {
                project_id,
                pipeline_id,
            } => WorkloadRef::Session {
                project_id,
                pipeline_id,
            },
        }
    }
}

/// Everything the runtime needs to trigger an image build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSpec {
    Environment {
        build_id: Uuid,
        project_id: Uuid,
        environment_id: Uuid,
    },
    Jupyter {
        build_id: Uuid,
    },
}

impl ImageSpec {
    pub fn target(&self) -> WorkloadRef {
        match *self {
            ImageSpec::Environment { build_id, .. } => WorkloadRef::EnvironmentBuild { build_id },
            ImageSpec::Jupyter { build_id } => WorkloadRef::JupyterBuild { build_id },
        }
    }
}
