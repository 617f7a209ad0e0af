use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{client::CLIENT_STATUSES, Client, ClientDetail, CreateClient, Project},
};

#[derive(Deserialize)]
pub struct ClientFilters {
    status: Option<String>,
    search: Option<String>,
}

pub async fn list_clients(
    State(db): State<Database>,
    Query(filters): Query<ClientFilters>,
) -> ApiResult<Json<Vec<Client>>> {
    let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM clients");
    let mut has_where = false;

    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        query_builder.push(" WHERE status = ").push_bind(status.to_string());
        has_where = true;
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query_builder.push(if has_where { " AND " } else { " WHERE " });
        let pattern = format!("%{}%", search.trim());
        query_builder
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    query_builder.push(" ORDER BY name");

    let clients = query_builder
        .build_query_as::<Client>()
        .fetch_all(&db)
        .await?;

    Ok(Json(clients))
}

pub async fn create_client(
    State(db): State<Database>,
    Json(payload): Json<CreateClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    payload.validate().map_err(ApiError::Validation)?;

    let client = sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (name, contact_name, email, phone, address, state, gstin, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.contact_name.trim())
    .bind(payload.email.trim())
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.state)
    .bind(&payload.gstin)
    .bind(&payload.notes)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(db): State<Database>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<Json<ClientDetail>> {
    let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
        .bind(client_id)
        .fetch_optional(&db)
        .await?
        .ok_or(ApiError::NotFound("client"))?;

    let projects = sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE client_id = $1 ORDER BY created_at DESC",
    )
    .bind(client_id)
    .fetch_all(&db)
    .await?;

    let invoice_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(&db)
            .await?;

    let outstanding_balance = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT SUM(balance_due) FROM invoices WHERE client_id = $1 AND status NOT IN ('DRAFT', 'CANCELLED')",
    )
    .bind(client_id)
    .fetch_one(&db)
    .await?
    .unwrap_or(Decimal::ZERO);

    Ok(Json(ClientDetail {
        client,
        projects,
        invoice_count,
        outstanding_balance,
    }))
}

pub async fn update_client(
    State(db): State<Database>,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<CreateClient>,
) -> ApiResult<Json<Client>> {
    payload.validate().map_err(ApiError::Validation)?;

    let client = sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients
        SET name = $1, contact_name = $2, email = $3, phone = $4, address = $5,
            state = $6, gstin = $7, notes = $8, updated_at = NOW()
        WHERE id = $9
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.contact_name.trim())
    .bind(payload.email.trim())
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.state)
    .bind(&payload.gstin)
    .bind(&payload.notes)
    .bind(client_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("client"))?;

    Ok(Json(client))
}

#[derive(Deserialize)]
pub struct StatusChange {
    pub status: String,
}

pub async fn update_client_status(
    State(db): State<Database>,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> ApiResult<Json<Client>> {
    if !CLIENT_STATUSES.contains(&payload.status.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unknown client status '{}'",
            payload.status
        )));
    }

    let client = sqlx::query_as::<_, Client>(
        "UPDATE clients SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&payload.status)
    .bind(client_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("client"))?;

    Ok(Json(client))
}

// Projects and invoices go with the client (FK cascade).
pub async fn delete_client(
    State(db): State<Database>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(client_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("client"));
    }
    Ok(StatusCode::NO_CONTENT)
}
