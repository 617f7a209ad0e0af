use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Request lifecycle. PENDING is the only state a request is born in;
/// REJECTED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(LeaveStatus::Pending),
            "APPROVED" => Some(LeaveStatus::Approved),
            "REJECTED" => Some(LeaveStatus::Rejected),
            "CANCELLED" => Some(LeaveStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, to: LeaveStatus) -> bool {
        matches!(
            (self, to),
            (LeaveStatus::Pending, LeaveStatus::Approved)
                | (LeaveStatus::Pending, LeaveStatus::Rejected)
                | (LeaveStatus::Pending, LeaveStatus::Cancelled)
                | (LeaveStatus::Approved, LeaveStatus::Cancelled)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LeaveType {
    pub id: Uuid,
    pub name: String,
    pub is_paid: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LeavePolicy {
    pub id: Uuid,
    pub leave_type_id: Uuid,
    pub annual_quota: i32,
    pub carry_forward_cap: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub team_member_id: Uuid,
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requested_days: i32,
    pub reason: Option<String>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct LeaveRequestRow {
    pub id: Uuid,
    pub team_member_id: Uuid,
    pub member_name: String,
    pub leave_type_id: Uuid,
    pub leave_type_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requested_days: i32,
    pub reason: Option<String>,
    pub status: String,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    pub team_member_id: Uuid,
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

/// Per (member, type, year) aggregate the balances screen renders. Computed
/// from the policy plus request sums on demand, never stored.
#[derive(Debug, Serialize)]
pub struct LeaveBalance {
    pub leave_type_id: Uuid,
    pub leave_type_name: String,
    pub year: i32,
    pub quota: i32,
    pub carry_forward: i32,
    pub used: i64,
    pub pending: i64,
    pub available: i64,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityCheck {
    pub requested_days: i32,
    pub available: i64,
    pub sufficient: bool,
    pub shortfall: i64,
}

impl AvailabilityCheck {
    pub fn evaluate(requested_days: i32, available: i64) -> Self {
        let shortfall = (i64::from(requested_days) - available).max(0);
        Self {
            requested_days,
            available,
            sufficient: shortfall == 0,
            shortfall,
        }
    }
}

/// Weekdays in [start, end] inclusive; weekends don't consume quota.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> i32 {
    if end < start {
        return 0;
    }
    let mut days = 0;
    let mut current = start;
    while current <= end {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            days += 1;
        }
        current = current.succ_opt().expect("date overflow");
    }
    days
}

pub fn available_days(quota: i32, carry_forward: i32, used: i64, pending: i64) -> i64 {
    i64::from(quota) + i64::from(carry_forward) - used - pending
}

/// Unused quota rolls into the next year up to the policy cap.
pub fn carry_forward_days(quota: i32, prior_used: i64, cap: i32) -> i32 {
    let unused = (i64::from(quota) - prior_used).max(0);
    unused.min(i64::from(cap)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn pending_fans_out_approved_only_cancels() {
        use LeaveStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Cancelled));

        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Approved));
    }

    #[test]
    fn status_round_trips_through_storage_strings() {
        for status in [
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            assert_eq!(LeaveStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeaveStatus::parse("DELETED"), None);
    }

    #[test]
    fn working_days_skip_weekends() {
        // Mon 2026-08-03 .. Fri 2026-08-07
        assert_eq!(working_days(date("2026-08-03"), date("2026-08-07")), 5);
        // Fri .. Mon spans a weekend
        assert_eq!(working_days(date("2026-08-07"), date("2026-08-10")), 2);
        // Sat .. Sun is zero
        assert_eq!(working_days(date("2026-08-08"), date("2026-08-09")), 0);
        // single weekday
        assert_eq!(working_days(date("2026-08-05"), date("2026-08-05")), 1);
        // inverted range
        assert_eq!(working_days(date("2026-08-07"), date("2026-08-03")), 0);
    }

    #[test]
    fn availability_reports_shortfall() {
        let check = AvailabilityCheck::evaluate(5, 3);
        assert!(!check.sufficient);
        assert_eq!(check.shortfall, 2);

        let check = AvailabilityCheck::evaluate(3, 3);
        assert!(check.sufficient);
        assert_eq!(check.shortfall, 0);
    }

    #[test]
    fn balance_arithmetic() {
        assert_eq!(available_days(12, 4, 5, 2), 9);
        assert_eq!(available_days(8, 0, 8, 1), -1);
    }

    #[test]
    fn carry_forward_respects_cap() {
        assert_eq!(carry_forward_days(12, 5, 4), 4);
        assert_eq!(carry_forward_days(12, 10, 4), 2);
        assert_eq!(carry_forward_days(12, 14, 4), 0);
        assert_eq!(carry_forward_days(8, 0, 0), 0);
    }
}
