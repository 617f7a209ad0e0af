use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const EMPLOYMENT_TYPES: [&str; 4] = ["FULL_TIME", "PART_TIME", "CONTRACT", "INTERN"];

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_title: String,
    pub employment_type: String,
    pub base_salary: Decimal,
    pub joined_date: NaiveDate,
    pub status: String,
    pub onboarding_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the unauthenticated onboarding-link lookup is allowed to reveal.
#[derive(Debug, Serialize)]
pub struct OnboardingView {
    pub name: String,
    pub role_title: String,
    pub joined_date: NaiveDate,
}

impl From<TeamMember> for OnboardingView {
    fn from(member: TeamMember) -> Self {
        Self {
            name: member.name,
            role_title: member.role_title,
            joined_date: member.joined_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamMember {
    pub name: String,
    pub email: String,
    pub role_title: String,
    pub employment_type: Option<String>,
    #[serde(default)]
    pub base_salary: Decimal,
    pub joined_date: NaiveDate,
}

pub fn new_onboarding_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct JobRole {
    pub id: Uuid,
    pub title: String,
    pub department: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRole {
    pub title: String,
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SalaryPayment {
    pub id: Uuid,
    pub team_member_id: Uuid,
    pub month: NaiveDate,
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SalaryPaymentRow {
    pub id: Uuid,
    pub team_member_id: Uuid,
    pub member_name: String,
    pub month: NaiveDate,
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub status: String,
}

/// Accepts the `YYYY-MM` the client sends and pins it to the first of the
/// month, which is how payroll rows are keyed.
pub fn parse_month(s: &str) -> Option<NaiveDate> {
    let mut parts = s.splitn(2, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_strings_pin_to_first_day() {
        assert_eq!(
            parse_month("2026-02"),
            NaiveDate::from_ymd_opt(2026, 2, 1)
        );
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("not-a-month"), None);
        assert_eq!(parse_month("2026"), None);
    }

    #[test]
    fn onboarding_tokens_are_opaque_and_unique() {
        let a = new_onboarding_token();
        let b = new_onboarding_token();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
