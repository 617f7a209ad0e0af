use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{client::PROJECT_STATUSES, CreateProject, Project},
};

#[derive(Deserialize)]
pub struct ProjectFilters {
    client_id: Option<Uuid>,
    status: Option<String>,
}

pub async fn list_projects(
    State(db): State<Database>,
    Query(filters): Query<ProjectFilters>,
) -> ApiResult<Json<Vec<Project>>> {
    let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM projects");
    let mut has_where = false;

    if let Some(client_id) = filters.client_id {
        query_builder.push(" WHERE client_id = ").push_bind(client_id);
        has_where = true;
    }
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        query_builder.push(if has_where { " AND " } else { " WHERE " });
        query_builder.push("status = ").push_bind(status.to_string());
    }
    query_builder.push(" ORDER BY created_at DESC");

    let projects = query_builder
        .build_query_as::<Project>()
        .fetch_all(&db)
        .await?;

    Ok(Json(projects))
}

fn validate_project(payload: &CreateProject) -> Result<String, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Project name is required".to_string()));
    }
    if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
        if end < start {
            return Err(ApiError::Validation(
                "Project end date cannot precede its start date".to_string(),
            ));
        }
    }
    let status = payload.status.clone().unwrap_or_else(|| "PLANNED".to_string());
    if !PROJECT_STATUSES.contains(&status.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unknown project status '{}'",
            status
        )));
    }
    Ok(status)
}

pub async fn create_project(
    State(db): State<Database>,
    Json(payload): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let status = validate_project(&payload)?;

    let client_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE id = $1")
            .bind(payload.client_id)
            .fetch_one(&db)
            .await?;
    if client_exists == 0 {
        return Err(ApiError::NotFound("client"));
    }

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (client_id, name, scope, start_date, end_date, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.client_id)
    .bind(payload.name.trim())
    .bind(&payload.scope)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&status)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(&db)
        .await?
        .ok_or(ApiError::NotFound("project"))?;

    Ok(Json(project))
}

pub async fn update_project(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateProject>,
) -> ApiResult<Json<Project>> {
    let status = validate_project(&payload)?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET name = $1, scope = $2, start_date = $3, end_date = $4, status = $5, updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.scope)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&status)
    .bind(project_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("project"))?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("project"));
    }
    Ok(StatusCode::NO_CONTENT)
}
