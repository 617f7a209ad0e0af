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
        proposal::{apply_schedule, compute_pricing, proposal_transition_allowed, DiscountType},
        CreateProposal, Proposal,
    },
};

#[derive(Deserialize)]
pub struct ProposalFilters {
    client_id: Option<Uuid>,
    status: Option<String>,
}

pub async fn list_proposals(
    State(db): State<Database>,
    Query(filters): Query<ProposalFilters>,
) -> ApiResult<Json<Vec<Proposal>>> {
    let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM proposals");
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

    let proposals = query_builder
        .build_query_as::<Proposal>()
        .fetch_all(&db)
        .await?;

    Ok(Json(proposals))
}

struct PricedPayload {
    services: serde_json::Value,
    schedule: serde_json::Value,
    pricing: crate::models::proposal::ProposalPricing,
    discount_type: DiscountType,
}

/// Shared by create and update: totals and milestone amounts always come from
/// the server-side arithmetic, whatever the client previewed.
fn price_payload(payload: &CreateProposal) -> Result<PricedPayload, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Proposal title is required".to_string()));
    }
    if payload.services.is_empty() {
        return Err(ApiError::Validation(
            "A proposal needs at least one service line".to_string(),
        ));
    }
    let discount_type = DiscountType::parse(&payload.discount_type).ok_or_else(|| {
        ApiError::Validation(format!("Unknown discount type '{}'", payload.discount_type))
    })?;

    let pricing = compute_pricing(
        &payload.services,
        discount_type,
        payload.discount_value,
        payload.tax_rate,
    );
    let schedule =
        apply_schedule(&payload.payment_schedule, pricing.total_amount).map_err(ApiError::Validation)?;

    Ok(PricedPayload {
        services: json!(payload.services),
        schedule: json!(schedule),
        pricing,
        discount_type,
    })
}

pub async fn create_proposal(
    State(db): State<Database>,
    Json(payload): Json<CreateProposal>,
) -> ApiResult<(StatusCode, Json<Proposal>)> {
    let priced = price_payload(&payload)?;

    let client_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE id = $1")
            .bind(payload.client_id)
            .fetch_one(&db)
            .await?;
    if client_exists == 0 {
        return Err(ApiError::NotFound("client"));
    }

    let proposal = sqlx::query_as::<_, Proposal>(
        r#"
        INSERT INTO proposals (
            client_id, title, services, discount_type, discount_value, tax_rate,
            subtotal, discount_amount, tax_amount, total_amount,
            payment_schedule, validity_days, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(payload.client_id)
    .bind(payload.title.trim())
    .bind(&priced.services)
    .bind(priced.discount_type.as_str())
    .bind(payload.discount_value)
    .bind(payload.tax_rate)
    .bind(priced.pricing.subtotal)
    .bind(priced.pricing.discount_amount)
    .bind(priced.pricing.tax_amount)
    .bind(priced.pricing.total_amount)
    .bind(&priced.schedule)
    .bind(payload.validity_days.unwrap_or(30))
    .bind(&payload.notes)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn get_proposal(
    State(db): State<Database>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<Proposal>> {
    let proposal = sqlx::query_as::<_, Proposal>("SELECT * FROM proposals WHERE id = $1")
        .bind(proposal_id)
        .fetch_optional(&db)
        .await?
        .ok_or(ApiError::NotFound("proposal"))?;

    Ok(Json(proposal))
}

pub async fn update_proposal(
    State(db): State<Database>,
    Path(proposal_id): Path<Uuid>,
    Json(payload): Json<CreateProposal>,
) -> ApiResult<Json<Proposal>> {
    let current = sqlx::query_as::<_, Proposal>("SELECT * FROM proposals WHERE id = $1")
        .bind(proposal_id)
        .fetch_optional(&db)
        .await?
        .ok_or(ApiError::NotFound("proposal"))?;

    if current.status != "DRAFT" {
        return Err(ApiError::Conflict(
            "Only draft proposals can be edited".to_string(),
        ));
    }

    let priced = price_payload(&payload)?;

    let proposal = sqlx::query_as::<_, Proposal>(
        r#"
        UPDATE proposals
        SET title = $1, services = $2, discount_type = $3, discount_value = $4,
            tax_rate = $5, subtotal = $6, discount_amount = $7, tax_amount = $8,
            total_amount = $9, payment_schedule = $10, validity_days = $11,
            notes = $12, updated_at = NOW()
        WHERE id = $13
        RETURNING *
        "#,
    )
    .bind(payload.title.trim())
    .bind(&priced.services)
    .bind(priced.discount_type.as_str())
    .bind(payload.discount_value)
    .bind(payload.tax_rate)
    .bind(priced.pricing.subtotal)
    .bind(priced.pricing.discount_amount)
    .bind(priced.pricing.tax_amount)
    .bind(priced.pricing.total_amount)
    .bind(&priced.schedule)
    .bind(payload.validity_days.unwrap_or(current.validity_days))
    .bind(&payload.notes)
    .bind(proposal_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(proposal))
}

async fn transition(db: &Database, proposal_id: Uuid, to: &str) -> ApiResult<Proposal> {
    let current = sqlx::query_as::<_, Proposal>("SELECT * FROM proposals WHERE id = $1")
        .bind(proposal_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("proposal"))?;

    if !proposal_transition_allowed(&current.status, to) {
        return Err(ApiError::Conflict(format!(
            "A {} proposal cannot move to {}",
            current.status, to
        )));
    }

    let proposal = sqlx::query_as::<_, Proposal>(
        "UPDATE proposals SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(to)
    .bind(proposal_id)
    .fetch_one(db)
    .await?;

    Ok(proposal)
}

pub async fn send_proposal(
    State(db): State<Database>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<Proposal>> {
    Ok(Json(transition(&db, proposal_id, "SENT").await?))
}

pub async fn accept_proposal(
    State(db): State<Database>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<Proposal>> {
    Ok(Json(transition(&db, proposal_id, "ACCEPTED").await?))
}

pub async fn reject_proposal(
    State(db): State<Database>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<Proposal>> {
    Ok(Json(transition(&db, proposal_id, "REJECTED").await?))
}

pub async fn delete_proposal(
    State(db): State<Database>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM proposals WHERE id = $1")
        .bind(proposal_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("proposal"));
    }
    Ok(StatusCode::NO_CONTENT)
}
