use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dtos::UnitStatus;

/// A single execution of a pipeline. `job_id` is NULL for interactive runs
/// and set for runs a job scheduled.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRun {
    pub id: Uuid,
    pub project_id: Uuid,
    pub pipeline_id: Uuid,
    pub job_id: Option<Uuid>,
    pub status: UnitStatus,
    pub params: serde_json::Value,
    pub requested_time: DateTime<Utc>,
    pub started_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
}
