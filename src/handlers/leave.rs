use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::{
        leave::{available_days, carry_forward_days, working_days},
        AvailabilityCheck, CreateLeaveRequest, LeaveBalance, LeavePolicy, LeaveRequest,
        LeaveRequestRow, LeaveStatus, LeaveType,
    },
};

// Leave types and policies

pub async fn list_leave_types(State(db): State<Database>) -> ApiResult<Json<Vec<LeaveType>>> {
    let types = sqlx::query_as::<_, LeaveType>(
        "SELECT * FROM leave_types WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&db)
    .await?;
    Ok(Json(types))
}

#[derive(Deserialize)]
pub struct CreateLeaveType {
    pub name: String,
    pub is_paid: Option<bool>,
    pub annual_quota: i32,
    #[serde(default)]
    pub carry_forward_cap: i32,
}

pub async fn create_leave_type(
    State(db): State<Database>,
    Json(payload): Json<CreateLeaveType>,
) -> ApiResult<(StatusCode, Json<LeaveType>)> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Leave type name is required".to_string()));
    }
    if payload.annual_quota < 0 || payload.carry_forward_cap < 0 {
        return Err(ApiError::Validation(
            "Quota and carry-forward cap cannot be negative".to_string(),
        ));
    }

    let mut tx = db.begin().await?;

    let leave_type = sqlx::query_as::<_, LeaveType>(
        "INSERT INTO leave_types (name, is_paid) VALUES ($1, $2) RETURNING *",
    )
    .bind(payload.name.trim())
    .bind(payload.is_paid.unwrap_or(true))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO leave_policies (leave_type_id, annual_quota, carry_forward_cap) VALUES ($1, $2, $3)",
    )
    .bind(leave_type.id)
    .bind(payload.annual_quota)
    .bind(payload.carry_forward_cap)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(leave_type)))
}

#[derive(Deserialize)]
pub struct UpdateLeavePolicy {
    pub annual_quota: i32,
    pub carry_forward_cap: i32,
}

pub async fn update_leave_policy(
    State(db): State<Database>,
    Path(leave_type_id): Path<Uuid>,
    Json(payload): Json<UpdateLeavePolicy>,
) -> ApiResult<Json<LeavePolicy>> {
    if payload.annual_quota < 0 || payload.carry_forward_cap < 0 {
        return Err(ApiError::Validation(
            "Quota and carry-forward cap cannot be negative".to_string(),
        ));
    }

    let policy = sqlx::query_as::<_, LeavePolicy>(
        r#"
        UPDATE leave_policies
        SET annual_quota = $1, carry_forward_cap = $2, updated_at = NOW()
        WHERE leave_type_id = $3
        RETURNING *
        "#,
    )
    .bind(payload.annual_quota)
    .bind(payload.carry_forward_cap)
    .bind(leave_type_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("leave policy"))?;

    Ok(Json(policy))
}

// Balance arithmetic. Balances are never stored; they are the policy plus
// request sums for the year in question.

async fn year_days(
    db: &Database,
    member_id: Uuid,
    leave_type_id: Uuid,
    status: LeaveStatus,
    year: i32,
) -> Result<i64, sqlx::Error> {
    let from = NaiveDate::from_ymd_opt(year, 1, 1).expect("valid year start");
    let to = NaiveDate::from_ymd_opt(year, 12, 31).expect("valid year end");

    let days = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        SELECT SUM(requested_days)::BIGINT FROM leave_requests
        WHERE team_member_id = $1 AND leave_type_id = $2 AND status = $3
          AND start_date BETWEEN $4 AND $5
        "#,
    )
    .bind(member_id)
    .bind(leave_type_id)
    .bind(status.as_str())
    .bind(from)
    .bind(to)
    .fetch_one(db)
    .await?;

    Ok(days.unwrap_or(0))
}

async fn compute_balance(
    db: &Database,
    member_id: Uuid,
    leave_type: &LeaveType,
    year: i32,
) -> ApiResult<LeaveBalance> {
    let policy = sqlx::query_as::<_, LeavePolicy>(
        "SELECT * FROM leave_policies WHERE leave_type_id = $1",
    )
    .bind(leave_type.id)
    .fetch_optional(db)
    .await?
    .ok_or(ApiError::NotFound("leave policy"))?;

    let used = year_days(db, member_id, leave_type.id, LeaveStatus::Approved, year).await?;
    let pending = year_days(db, member_id, leave_type.id, LeaveStatus::Pending, year).await?;
    let prior_used =
        year_days(db, member_id, leave_type.id, LeaveStatus::Approved, year - 1).await?;
    let carry_forward =
        carry_forward_days(policy.annual_quota, prior_used, policy.carry_forward_cap);

    Ok(LeaveBalance {
        leave_type_id: leave_type.id,
        leave_type_name: leave_type.name.clone(),
        year,
        quota: policy.annual_quota,
        carry_forward,
        used,
        pending,
        available: available_days(policy.annual_quota, carry_forward, used, pending),
    })
}

#[derive(Deserialize)]
pub struct BalanceQuery {
    pub team_member_id: Uuid,
    pub year: Option<i32>,
}

pub async fn list_balances(
    State(db): State<Database>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Json<Vec<LeaveBalance>>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let types = sqlx::query_as::<_, LeaveType>(
        "SELECT * FROM leave_types WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&db)
    .await?;

    let mut balances = Vec::with_capacity(types.len());
    for leave_type in &types {
        balances.push(compute_balance(&db, query.team_member_id, leave_type, year).await?);
    }

    Ok(Json(balances))
}

// Requests

#[derive(Deserialize)]
pub struct RequestFilters {
    team_member_id: Option<Uuid>,
    status: Option<String>,
}

pub async fn list_requests(
    State(db): State<Database>,
    Query(filters): Query<RequestFilters>,
) -> ApiResult<Json<Vec<LeaveRequestRow>>> {
    let mut query_builder = sqlx::QueryBuilder::new(
        r#"
        SELECT lr.id, lr.team_member_id, tm.name AS member_name,
               lr.leave_type_id, lt.name AS leave_type_name,
               lr.start_date, lr.end_date, lr.requested_days, lr.reason,
               lr.status, lr.review_note, lr.created_at
        FROM leave_requests lr
        JOIN team_members tm ON lr.team_member_id = tm.id
        JOIN leave_types lt ON lr.leave_type_id = lt.id
        "#,
    );
    let mut has_where = false;

    if let Some(member_id) = filters.team_member_id {
        query_builder.push(" WHERE lr.team_member_id = ").push_bind(member_id);
        has_where = true;
    }
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        query_builder.push(if has_where { " AND " } else { " WHERE " });
        query_builder.push("lr.status = ").push_bind(status.to_string());
    }
    query_builder.push(" ORDER BY lr.created_at DESC");

    let rows = query_builder
        .build_query_as::<LeaveRequestRow>()
        .fetch_all(&db)
        .await?;

    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub team_member_id: Uuid,
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Advisory pre-check the request form calls while the user types. The same
/// arithmetic runs again inside create_request; this endpoint never reserves
/// anything.
pub async fn check_availability(
    State(db): State<Database>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityCheck>> {
    let requested = working_days(query.start_date, query.end_date);
    if requested == 0 {
        return Err(ApiError::Validation(
            "The requested range contains no working days".to_string(),
        ));
    }

    let leave_type = fetch_leave_type(&db, query.leave_type_id).await?;
    let balance =
        compute_balance(&db, query.team_member_id, &leave_type, query.start_date.year()).await?;

    Ok(Json(AvailabilityCheck::evaluate(requested, balance.available)))
}

async fn fetch_leave_type(db: &Database, leave_type_id: Uuid) -> ApiResult<LeaveType> {
    sqlx::query_as::<_, LeaveType>("SELECT * FROM leave_types WHERE id = $1 AND is_active = true")
        .bind(leave_type_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("leave type"))
}

pub async fn create_request(
    State(db): State<Database>,
    Json(payload): Json<CreateLeaveRequest>,
) -> ApiResult<(StatusCode, Json<LeaveRequest>)> {
    if payload.end_date < payload.start_date {
        return Err(ApiError::Validation(
            "Leave end date cannot precede its start date".to_string(),
        ));
    }
    let requested = working_days(payload.start_date, payload.end_date);
    if requested == 0 {
        return Err(ApiError::Validation(
            "The requested range contains no working days".to_string(),
        ));
    }

    let leave_type = fetch_leave_type(&db, payload.leave_type_id).await?;

    let member_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members WHERE id = $1")
            .bind(payload.team_member_id)
            .fetch_one(&db)
            .await?;
    if member_exists == 0 {
        return Err(ApiError::NotFound("team member"));
    }

    // A member cannot hold two open requests over the same days.
    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leave_requests
        WHERE team_member_id = $1 AND status IN ('PENDING', 'APPROVED')
          AND start_date <= $2 AND end_date >= $3
        "#,
    )
    .bind(payload.team_member_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(&db)
    .await?;
    if overlapping > 0 {
        return Err(ApiError::Conflict(
            "An open leave request already covers part of this range".to_string(),
        ));
    }

    // Authoritative balance check; the form's advisory pre-check is not trusted.
    let balance = compute_balance(
        &db,
        payload.team_member_id,
        &leave_type,
        payload.start_date.year(),
    )
    .await?;
    let check = AvailabilityCheck::evaluate(requested, balance.available);
    if !check.sufficient {
        return Err(ApiError::Validation(format!(
            "Insufficient {} balance: short by {} day(s)",
            leave_type.name, check.shortfall
        )));
    }

    let request = sqlx::query_as::<_, LeaveRequest>(
        r#"
        INSERT INTO leave_requests (
            team_member_id, leave_type_id, start_date, end_date, requested_days, reason
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.team_member_id)
    .bind(payload.leave_type_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(requested)
    .bind(&payload.reason)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Deserialize, Default)]
pub struct ReviewPayload {
    pub review_note: Option<String>,
}

async fn transition_request(
    db: &Database,
    request_id: Uuid,
    reviewer: Uuid,
    to: LeaveStatus,
    note: Option<String>,
) -> ApiResult<LeaveRequest> {
    let mut tx = db.begin().await?;

    let request =
        sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = $1 FOR UPDATE")
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("leave request"))?;

    let current = LeaveStatus::parse(&request.status)
        .ok_or_else(|| ApiError::Conflict("Leave request is in an unknown state".to_string()))?;
    if !current.can_transition_to(to) {
        return Err(ApiError::Conflict(format!(
            "A {} request cannot move to {}",
            current.as_str(),
            to.as_str()
        )));
    }

    let updated = sqlx::query_as::<_, LeaveRequest>(
        r#"
        UPDATE leave_requests
        SET status = $1, reviewed_by = $2, reviewed_at = NOW(), review_note = $3,
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(to.as_str())
    .bind(reviewer)
    .bind(&note)
    .bind(request_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!(
        "leave request {} moved {} -> {}",
        request_id,
        current.as_str(),
        to.as_str()
    );

    Ok(updated)
}

pub async fn approve_request(
    State(db): State<Database>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<ReviewPayload>>,
) -> ApiResult<Json<LeaveRequest>> {
    let note = payload.and_then(|Json(p)| p.review_note);
    Ok(Json(
        transition_request(&db, request_id, user.id, LeaveStatus::Approved, note).await?,
    ))
}

pub async fn reject_request(
    State(db): State<Database>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<ReviewPayload>>,
) -> ApiResult<Json<LeaveRequest>> {
    let note = payload.and_then(|Json(p)| p.review_note);
    Ok(Json(
        transition_request(&db, request_id, user.id, LeaveStatus::Rejected, note).await?,
    ))
}

pub async fn cancel_request(
    State(db): State<Database>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<ReviewPayload>>,
) -> ApiResult<Json<LeaveRequest>> {
    let note = payload.and_then(|Json(p)| p.review_note);
    Ok(Json(
        transition_request(&db, request_id, user.id, LeaveStatus::Cancelled, note).await?,
    ))
}

/// Only requests still waiting on review can be removed outright; everything
/// else stays for the audit trail.
pub async fn delete_request(
    State(db): State<Database>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM leave_requests WHERE id = $1 AND status = 'PENDING'")
        .bind(request_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_requests WHERE id = $1")
                .bind(request_id)
                .fetch_one(&db)
                .await?;
        return if exists == 0 {
            Err(ApiError::NotFound("leave request"))
        } else {
            Err(ApiError::Conflict(
                "Only pending requests can be deleted".to_string(),
            ))
        };
    }
    Ok(StatusCode::NO_CONTENT)
}
