use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dtos::SessionStatus;

/// One interactive session per (project, pipeline) pair. The row is kept
/// after the session stops so the pair can be relaunched.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InteractiveSession {
    pub project_id: Uuid,
    pub pipeline_id: Uuid,
    pub status: SessionStatus,
    pub requested_time: DateTime<Utc>,
    pub stopped_time: Option<DateTime<Utc>>,
}
