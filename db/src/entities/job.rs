use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dtos::UnitStatus;

/// A recurring or one-off job. `schedule` holds a cron expression and is
/// NULL for one-off jobs; `next_run_at` is NULL once nothing is left to
/// dispatch.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub project_id: Uuid,
    pub pipeline_id: Uuid,
    pub schedule: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub status: UnitStatus,
    pub requested_time: DateTime<Utc>,
    pub started_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
}

impl Job {
    pub fn is_one_off(&self) -> bool {
        self.schedule.is_none()
    }
}
