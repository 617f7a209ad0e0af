use axum::{extract::State, response::Json};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{database::Database, error::ApiResult};

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub active_clients: i64,
    pub active_team_members: i64,
    pub outstanding_invoice_total: Decimal,
    pub open_proposals: i64,
    pub pending_leave_requests: i64,
    pub month_revenue: Decimal,
    pub month_expenses: Decimal,
}

pub async fn summary(State(db): State<Database>) -> ApiResult<Json<DashboardSummary>> {
    let active_clients =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE status = 'ACTIVE'")
            .fetch_one(&db)
            .await?;

    let active_team_members =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members WHERE status = 'ACTIVE'")
            .fetch_one(&db)
            .await?;

    let outstanding_invoice_total = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT SUM(balance_due) FROM invoices WHERE status NOT IN ('DRAFT', 'CANCELLED')",
    )
    .fetch_one(&db)
    .await?
    .unwrap_or(Decimal::ZERO);

    let open_proposals = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM proposals WHERE status IN ('DRAFT', 'SENT')",
    )
    .fetch_one(&db)
    .await?;

    let pending_leave_requests = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_requests WHERE status = 'PENDING'",
    )
    .fetch_one(&db)
    .await?;

    let today = Utc::now().date_naive();
    let month_start =
        NaiveDate::from_ymd_opt(today.year(), today.month(), 1).expect("valid month start");

    let month_revenue = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT SUM(amount) FROM invoice_payments WHERE payment_date >= $1",
    )
    .bind(month_start)
    .fetch_one(&db)
    .await?
    .unwrap_or(Decimal::ZERO);

    let month_expenses = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT SUM(amount) FROM expenses WHERE status = 'APPROVED' AND expense_date >= $1",
    )
    .bind(month_start)
    .fetch_one(&db)
    .await?
    .unwrap_or(Decimal::ZERO);

    Ok(Json(DashboardSummary {
        active_clients,
        active_team_members,
        outstanding_invoice_total,
        open_proposals,
        pending_leave_requests,
        month_revenue,
        month_expenses,
    }))
}
