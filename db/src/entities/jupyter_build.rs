use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dtos::UnitStatus;

/// Build of the user-configurable jupyter server image. Only the most
/// recently requested record survives retention cleanup.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JupyterBuild {
    pub id: Uuid,
    pub status: UnitStatus,
    pub requested_time: DateTime<Utc>,
    pub started_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
}
