use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{team::parse_month, SalaryPayment, SalaryPaymentRow},
};

#[derive(Deserialize)]
pub struct PayrollFilters {
    month: Option<String>,
    team_member_id: Option<Uuid>,
}

pub async fn list_salary_payments(
    State(db): State<Database>,
    Query(filters): Query<PayrollFilters>,
) -> ApiResult<Json<Vec<SalaryPaymentRow>>> {
    let month = match filters.month.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            parse_month(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid month '{}'", raw)))?,
        ),
        None => None,
    };

    let mut query_builder = sqlx::QueryBuilder::new(
        r#"
        SELECT sp.id, sp.team_member_id, tm.name AS member_name, sp.month,
               sp.amount, sp.payment_date, sp.status
        FROM salary_payments sp
        JOIN team_members tm ON sp.team_member_id = tm.id
        "#,
    );
    let mut has_where = false;

    if let Some(month) = month {
        query_builder.push(" WHERE sp.month = ").push_bind(month);
        has_where = true;
    }
    if let Some(member_id) = filters.team_member_id {
        query_builder.push(if has_where { " AND " } else { " WHERE " });
        query_builder.push("sp.team_member_id = ").push_bind(member_id);
    }
    query_builder.push(" ORDER BY sp.month DESC, tm.name");

    let rows = query_builder
        .build_query_as::<SalaryPaymentRow>()
        .fetch_all(&db)
        .await?;

    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct GenerateRun {
    pub month: String,
}

/// One PENDING row per active member at their base salary. Members that
/// already have a row for the month are left alone, so the run is repeatable.
pub async fn generate_salary_payments(
    State(db): State<Database>,
    Json(payload): Json<GenerateRun>,
) -> ApiResult<Json<serde_json::Value>> {
    let month = parse_month(&payload.month)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid month '{}'", payload.month)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO salary_payments (team_member_id, month, amount)
        SELECT id, $1, base_salary FROM team_members WHERE status = 'ACTIVE'
        ON CONFLICT (team_member_id, month) DO NOTHING
        "#,
    )
    .bind(month)
    .execute(&db)
    .await?;

    let active_members =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members WHERE status = 'ACTIVE'")
            .fetch_one(&db)
            .await?;
    let generated = result.rows_affected() as i64;

    log::info!(
        "payroll run for {}: {} generated, {} already present",
        payload.month,
        generated,
        active_members - generated
    );

    Ok(Json(json!({
        "month": payload.month,
        "generated": generated,
        "skipped": active_members - generated,
    })))
}

#[derive(Deserialize)]
pub struct MarkPaid {
    pub payment_date: Option<NaiveDate>,
}

pub async fn mark_salary_paid(
    State(db): State<Database>,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<MarkPaid>,
) -> ApiResult<Json<SalaryPayment>> {
    let payment_date = payload
        .payment_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let payment = sqlx::query_as::<_, SalaryPayment>(
        r#"
        UPDATE salary_payments
        SET status = 'PAID', payment_date = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(payment_date)
    .bind(payment_id)
    .fetch_optional(&db)
    .await?;

    match payment {
        Some(payment) => Ok(Json(payment)),
        None => {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM salary_payments WHERE id = $1")
                    .bind(payment_id)
                    .fetch_one(&db)
                    .await?;
            if exists == 0 {
                Err(ApiError::NotFound("salary payment"))
            } else {
                Err(ApiError::Conflict(
                    "This salary payment is already marked paid".to_string(),
                ))
            }
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateSalaryPayment {
    pub amount: Decimal,
}

pub async fn update_salary_payment(
    State(db): State<Database>,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<UpdateSalaryPayment>,
) -> ApiResult<Json<SalaryPayment>> {
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Salary amount must be positive".to_string(),
        ));
    }

    let payment = sqlx::query_as::<_, SalaryPayment>(
        r#"
        UPDATE salary_payments
        SET amount = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(payload.amount)
    .bind(payment_id)
    .fetch_optional(&db)
    .await?;

    match payment {
        Some(payment) => Ok(Json(payment)),
        None => {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM salary_payments WHERE id = $1")
                    .bind(payment_id)
                    .fetch_one(&db)
                    .await?;
            if exists == 0 {
                Err(ApiError::NotFound("salary payment"))
            } else {
                Err(ApiError::Conflict(
                    "Only pending salary payments can be edited".to_string(),
                ))
            }
        }
    }
}

pub async fn delete_salary_payment(
    State(db): State<Database>,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM salary_payments WHERE id = $1")
        .bind(payment_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("salary payment"));
    }
    Ok(StatusCode::NO_CONTENT)
}
