use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dtos::UnitStatus;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnvironmentBuild {
    pub id: Uuid,
    pub project_id: Uuid,
    pub environment_id: Uuid,
    pub status: UnitStatus,
    pub requested_time: DateTime<Utc>,
    pub started_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
}
