use serde::{Deserialize, Serialize};

/// Lifecycle status shared by runs, builds and jobs.
///
/// Transitions only move forward along
/// `Pending -> Started -> {Success, Failure, Aborted}`; skipping `Started`
/// is legal for workloads that finish before their start is recorded.
#[derive(sqlx::Type, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[sqlx(type_name = "unit_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitStatus {
    Pending,
    Started,
    Success,
    Failure,
    Aborted,
}

impl UnitStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UnitStatus::Success | UnitStatus::Failure | UnitStatus::Aborted
        )
    }

    /// Whether an abort would change this status. Terminal units stay as
    /// they are; aborting them is a no-op, not an error.
    pub fn abortable(self) -> bool {
        !self.is_terminal()
    }

    pub fn may_advance_to(self, next: UnitStatus) -> bool {
        match self {
            UnitStatus::Pending => next != UnitStatus::Pending,
            UnitStatus::Started => next.is_terminal(),
            UnitStatus::Success | UnitStatus::Failure | UnitStatus::Aborted => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UnitStatus::*;

    #[test]
    fn terminal_statuses() {
        assert!(!Pending.is_terminal());
        assert!(!Started.is_terminal());
        assert!(Success.is_terminal());
        assert!(Failure.is_terminal());
        assert!(Aborted.is_terminal());
    }

    #[test]
    fn abort_only_touches_non_terminal_units() {
        assert!(Pending.abortable());
        assert!(Started.abortable());
        assert!(!Success.abortable());
        assert!(!Failure.abortable());
        assert!(!Aborted.abortable());
    }

    #[test]
    fn transitions_only_move_forward() {
        assert!(Pending.may_advance_to(Started));
        assert!(Pending.may_advance_to(Aborted));
        // A workload can finish before its start was recorded.
        assert!(Pending.may_advance_to(Success));
        assert!(Started.may_advance_to(Success));
        assert!(Started.may_advance_to(Failure));
        assert!(Started.may_advance_to(Aborted));

        assert!(!Started.may_advance_to(Pending));
        assert!(!Started.may_advance_to(Started));
        assert!(!Success.may_advance_to(Failure));
        assert!(!Aborted.may_advance_to(Started));
        assert!(!Failure.may_advance_to(Pending));
    }
}
