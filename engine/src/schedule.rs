use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Parses a cron expression, accepting the classic five-field form
/// alongside the six/seven-field one by prepending a seconds column.
pub fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    if expr.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {expr}"))
    } else {
        Schedule::from_str(expr)
    }
}

/// The next occurrence strictly after `after`, or `None` when the
/// schedule has run out (expressions with a year field can).
pub fn next_run_after(
    expr: &str,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, cron::error::Error> {
    Ok(parse_schedule(expr)?.after(&after).next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn five_field_expressions_are_accepted() {
        assert!(parse_schedule("*/5 * * * *").is_ok());
        assert!(parse_schedule("0 3 * * 1").is_ok());
    }

    #[test]
    fn six_field_expressions_pass_through() {
        assert!(parse_schedule("0 0 3 * * Mon").is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_schedule("every full moon").is_err());
        assert!(parse_schedule("61 * * * *").is_err());
    }

    #[test]
    fn next_run_is_strictly_in_the_future() {
        let after = Utc.with_ymd_and_hms(2025, 1, 1, 10, 30, 0).unwrap();
        let next = next_run_after("0 * * * *", after).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn hourly_boundary_does_not_repeat_itself() {
        let on_the_hour = Utc.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap();
        let next = next_run_after("0 * * * *", on_the_hour).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn exhausted_schedules_yield_none() {
        let after = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let next = next_run_after("0 0 0 1 1 * 2020", after).unwrap();
        assert_eq!(next, None);
    }
}
