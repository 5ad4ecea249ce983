use db::dtos::UnitStatus;
use engine::error::ActionError;
use hyper::StatusCode;
use sqlx::{Connection, PgConnection};
use tracing::error;
use uuid::Uuid;

pub fn internal_error<T: std::fmt::Debug>(error: T) -> StatusCode {
    error!("Internal error: {error:?}");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Maps database-phase failures to responses: conflicts for create-side
/// validation, bad request for unusable schedules, everything else is on
/// us.
pub fn action_error(error: ActionError) -> StatusCode {
    match error {
        ActionError::JupyterBuildInFlight | ActionError::SessionAlreadyRunning { .. } => {
            StatusCode::CONFLICT
        }
        ActionError::InvalidSchedule { .. } | ActionError::ScheduleExhausted { .. } => {
            StatusCode::BAD_REQUEST
        }
        ActionError::Database(_) => internal_error(error),
    }
}

/// Status write-back from the runtime's completion callbacks. Enforces the
/// forward-only transition rule under the unit's row lock and stamps the
/// matching timestamp. Repeating the current status is accepted silently
/// since callbacks are delivered at least once.
pub async fn advance_unit_status(
    conn: &mut PgConnection,
    table: &'static str,
    id: Uuid,
    next: UnitStatus,
) -> Result<StatusCode, StatusCode> {
    let mut tx = conn.begin().await.map_err(internal_error)?;

    let select = format!("SELECT status FROM {table} WHERE id = $1 FOR UPDATE");
    let current: Option<UnitStatus> = sqlx::query_scalar(&select)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal_error)?;

    let Some(current) = current else {
        return Err(StatusCode::NOT_FOUND);
    };
    if current == next {
        return Ok(StatusCode::NO_CONTENT);
    }
    if !current.may_advance_to(next) {
        return Err(StatusCode::CONFLICT);
    }

    let stamp = if next == UnitStatus::Started {
        "started_time"
    } else {
        "finished_time"
    };
    let update = format!("UPDATE {table} SET status = $2, {stamp} = now() WHERE id = $1");
    sqlx::query(&update)
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}
