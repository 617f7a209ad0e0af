use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{CreateService, Service},
};

pub async fn list_services(State(db): State<Database>) -> ApiResult<Json<Vec<Service>>> {
    let services = sqlx::query_as::<_, Service>("SELECT * FROM services ORDER BY name")
        .fetch_all(&db)
        .await?;
    Ok(Json(services))
}

fn validate_service(payload: &CreateService) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Service name is required".to_string()));
    }
    if payload.default_price < Decimal::ZERO {
        return Err(ApiError::Validation(
            "Service price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_service(
    State(db): State<Database>,
    Json(payload): Json<CreateService>,
) -> ApiResult<(StatusCode, Json<Service>)> {
    validate_service(&payload)?;

    let service = sqlx::query_as::<_, Service>(
        r#"
        INSERT INTO services (name, category, default_price, description, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.category)
    .bind(payload.default_price)
    .bind(&payload.description)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update_service(
    State(db): State<Database>,
    Path(service_id): Path<Uuid>,
    Json(payload): Json<CreateService>,
) -> ApiResult<Json<Service>> {
    validate_service(&payload)?;

    let service = sqlx::query_as::<_, Service>(
        r#"
        UPDATE services
        SET name = $1, category = $2, default_price = $3, description = $4,
            is_active = $5, updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.category)
    .bind(payload.default_price)
    .bind(&payload.description)
    .bind(payload.is_active.unwrap_or(true))
    .bind(service_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("service"))?;

    Ok(Json(service))
}

pub async fn delete_service(
    State(db): State<Database>,
    Path(service_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(service_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("service"));
    }
    Ok(StatusCode::NO_CONTENT)
}
