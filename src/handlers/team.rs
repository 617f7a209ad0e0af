use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{
        client::is_valid_email,
        team::{new_onboarding_token, EMPLOYMENT_TYPES},
        CreateJobRole, CreateTeamMember, JobRole, OnboardingView, TeamMember,
    },
};

#[derive(Deserialize)]
pub struct MemberFilters {
    status: Option<String>,
}

pub async fn list_members(
    State(db): State<Database>,
    Query(filters): Query<MemberFilters>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    let members = match filters.status.as_deref().filter(|s| !s.is_empty()) {
        Some(status) => {
            sqlx::query_as::<_, TeamMember>(
                "SELECT * FROM team_members WHERE status = $1 ORDER BY name",
            )
            .bind(status)
            .fetch_all(&db)
            .await?
        }
        None => {
            sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members ORDER BY name")
                .fetch_all(&db)
                .await?
        }
    };

    Ok(Json(members))
}

fn validate_member(payload: &CreateTeamMember) -> Result<String, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Member name is required".to_string()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation(
            "A valid email address is required".to_string(),
        ));
    }
    if payload.role_title.trim().is_empty() {
        return Err(ApiError::Validation("Role title is required".to_string()));
    }
    let employment_type = payload
        .employment_type
        .clone()
        .unwrap_or_else(|| "FULL_TIME".to_string());
    if !EMPLOYMENT_TYPES.contains(&employment_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unknown employment type '{}'",
            employment_type
        )));
    }
    Ok(employment_type)
}

pub async fn create_member(
    State(db): State<Database>,
    Json(payload): Json<CreateTeamMember>,
) -> ApiResult<(StatusCode, Json<TeamMember>)> {
    let employment_type = validate_member(&payload)?;

    let duplicate =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members WHERE email = $1")
            .bind(payload.email.trim())
            .fetch_one(&db)
            .await?;
    if duplicate > 0 {
        return Err(ApiError::Conflict(
            "A team member with this email already exists".to_string(),
        ));
    }

    let member = sqlx::query_as::<_, TeamMember>(
        r#"
        INSERT INTO team_members (
            name, email, role_title, employment_type, base_salary, joined_date, onboarding_token
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(payload.role_title.trim())
    .bind(&employment_type)
    .bind(payload.base_salary)
    .bind(payload.joined_date)
    .bind(new_onboarding_token())
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member(
    State(db): State<Database>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Json<TeamMember>> {
    let member = sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE id = $1")
        .bind(member_id)
        .fetch_optional(&db)
        .await?
        .ok_or(ApiError::NotFound("team member"))?;

    Ok(Json(member))
}

pub async fn update_member(
    State(db): State<Database>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<CreateTeamMember>,
) -> ApiResult<Json<TeamMember>> {
    let employment_type = validate_member(&payload)?;

    let member = sqlx::query_as::<_, TeamMember>(
        r#"
        UPDATE team_members
        SET name = $1, email = $2, role_title = $3, employment_type = $4,
            base_salary = $5, joined_date = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(payload.role_title.trim())
    .bind(&employment_type)
    .bind(payload.base_salary)
    .bind(payload.joined_date)
    .bind(member_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("team member"))?;

    Ok(Json(member))
}

#[derive(Deserialize)]
pub struct MemberStatusChange {
    pub status: String,
}

pub async fn update_member_status(
    State(db): State<Database>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<MemberStatusChange>,
) -> ApiResult<Json<TeamMember>> {
    if !["ACTIVE", "INACTIVE"].contains(&payload.status.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unknown member status '{}'",
            payload.status
        )));
    }

    let member = sqlx::query_as::<_, TeamMember>(
        "UPDATE team_members SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&payload.status)
    .bind(member_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("team member"))?;

    Ok(Json(member))
}

pub async fn delete_member(
    State(db): State<Database>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
        .bind(member_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("team member"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rotate_onboarding_token(
    State(db): State<Database>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let token = new_onboarding_token();
    let result = sqlx::query(
        "UPDATE team_members SET onboarding_token = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(&token)
    .bind(member_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("team member"));
    }
    Ok(Json(json!({ "onboarding_token": token })))
}

/// Public lookup behind the onboarding link; reveals only what the welcome
/// screen needs.
pub async fn onboarding_lookup(
    State(db): State<Database>,
    Path(token): Path<String>,
) -> ApiResult<Json<OnboardingView>> {
    let member =
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE onboarding_token = $1")
            .bind(&token)
            .fetch_optional(&db)
            .await?
            .ok_or(ApiError::NotFound("onboarding link"))?;

    Ok(Json(OnboardingView::from(member)))
}

// Job role catalog

pub async fn list_job_roles(State(db): State<Database>) -> ApiResult<Json<Vec<JobRole>>> {
    let roles = sqlx::query_as::<_, JobRole>("SELECT * FROM job_roles ORDER BY title")
        .fetch_all(&db)
        .await?;
    Ok(Json(roles))
}

pub async fn create_job_role(
    State(db): State<Database>,
    Json(payload): Json<CreateJobRole>,
) -> ApiResult<(StatusCode, Json<JobRole>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Role title is required".to_string()));
    }

    let role = sqlx::query_as::<_, JobRole>(
        r#"
        INSERT INTO job_roles (title, department, is_active)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.department)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update_job_role(
    State(db): State<Database>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<CreateJobRole>,
) -> ApiResult<Json<JobRole>> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Role title is required".to_string()));
    }

    let role = sqlx::query_as::<_, JobRole>(
        r#"
        UPDATE job_roles
        SET title = $1, department = $2, is_active = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.department)
    .bind(payload.is_active.unwrap_or(true))
    .bind(role_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("job role"))?;

    Ok(Json(role))
}

pub async fn delete_job_role(
    State(db): State<Database>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM job_roles WHERE id = $1")
        .bind(role_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("job role"));
    }
    Ok(StatusCode::NO_CONTENT)
}
