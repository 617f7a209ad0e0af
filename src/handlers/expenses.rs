use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::Multipart;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{CreateExpenseCategory, Expense, ExpenseCategory, ExpenseRow},
};

const RECEIPT_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];

#[derive(Deserialize)]
pub struct ExpenseFilters {
    category_id: Option<Uuid>,
    client_id: Option<Uuid>,
    status: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

pub async fn list_expenses(
    State(db): State<Database>,
    Query(filters): Query<ExpenseFilters>,
) -> ApiResult<Json<Vec<ExpenseRow>>> {
    let mut query_builder = sqlx::QueryBuilder::new(
        r#"
        SELECT e.id, ec.name AS category_name, c.name AS client_name,
               e.amount, e.gst_amount, e.description, e.receipt_url,
               e.expense_date, e.status, e.created_at
        FROM expenses e
        JOIN expense_categories ec ON e.category_id = ec.id
        LEFT JOIN clients c ON e.client_id = c.id
        "#,
    );
    let mut conditions_started = false;
    let mut push_condition = |qb: &mut sqlx::QueryBuilder<sqlx::Postgres>| {
        if conditions_started {
            qb.push(" AND ");
        } else {
            qb.push(" WHERE ");
            conditions_started = true;
        }
    };

    if let Some(category_id) = filters.category_id {
        push_condition(&mut query_builder);
        query_builder.push("e.category_id = ").push_bind(category_id);
    }
    if let Some(client_id) = filters.client_id {
        push_condition(&mut query_builder);
        query_builder.push("e.client_id = ").push_bind(client_id);
    }
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        push_condition(&mut query_builder);
        query_builder.push("e.status = ").push_bind(status.to_string());
    }
    if let Some(date_from) = filters.date_from {
        push_condition(&mut query_builder);
        query_builder.push("e.expense_date >= ").push_bind(date_from);
    }
    if let Some(date_to) = filters.date_to {
        push_condition(&mut query_builder);
        query_builder.push("e.expense_date <= ").push_bind(date_to);
    }
    query_builder.push(" ORDER BY e.expense_date DESC");

    let expenses = query_builder
        .build_query_as::<ExpenseRow>()
        .fetch_all(&db)
        .await?;

    Ok(Json(expenses))
}

#[derive(Deserialize)]
pub struct ExpensePayload {
    pub category_id: Uuid,
    pub client_id: Option<Uuid>,
    pub amount: Decimal,
    #[serde(default)]
    pub gst_amount: Decimal,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
}

fn validate_expense(payload: &ExpensePayload) -> Result<(), ApiError> {
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Expense amount must be positive".to_string(),
        ));
    }
    if payload.gst_amount < Decimal::ZERO || payload.gst_amount > payload.amount {
        return Err(ApiError::Validation(
            "GST amount must be between zero and the expense amount".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_expense(
    State(db): State<Database>,
    Json(payload): Json<ExpensePayload>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    validate_expense(&payload)?;

    let category = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM expense_categories WHERE id = $1 AND is_active = true",
    )
    .bind(payload.category_id)
    .fetch_one(&db)
    .await?;
    if category == 0 {
        return Err(ApiError::NotFound("expense category"));
    }

    let expense = sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses (category_id, client_id, amount, gst_amount, description, expense_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.category_id)
    .bind(payload.client_id)
    .bind(payload.amount)
    .bind(payload.gst_amount)
    .bind(&payload.description)
    .bind(payload.expense_date)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn update_expense(
    State(db): State<Database>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpensePayload>,
) -> ApiResult<Json<Expense>> {
    validate_expense(&payload)?;

    let expense = sqlx::query_as::<_, Expense>(
        r#"
        UPDATE expenses
        SET category_id = $1, client_id = $2, amount = $3, gst_amount = $4,
            description = $5, expense_date = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(payload.category_id)
    .bind(payload.client_id)
    .bind(payload.amount)
    .bind(payload.gst_amount)
    .bind(&payload.description)
    .bind(payload.expense_date)
    .bind(expense_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("expense"))?;

    Ok(Json(expense))
}

async fn review_expense(db: &Database, expense_id: Uuid, status: &str) -> ApiResult<Expense> {
    let expense = sqlx::query_as::<_, Expense>(
        r#"
        UPDATE expenses
        SET status = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(expense_id)
    .fetch_optional(db)
    .await?;

    match expense {
        Some(expense) => Ok(expense),
        None => {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses WHERE id = $1")
                .bind(expense_id)
                .fetch_one(db)
                .await?;
            if exists == 0 {
                Err(ApiError::NotFound("expense"))
            } else {
                Err(ApiError::Conflict(
                    "This expense has already been reviewed".to_string(),
                ))
            }
        }
    }
}

pub async fn approve_expense(
    State(db): State<Database>,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<Expense>> {
    Ok(Json(review_expense(&db, expense_id, "APPROVED").await?))
}

pub async fn deny_expense(
    State(db): State<Database>,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<Expense>> {
    Ok(Json(review_expense(&db, expense_id, "DENIED").await?))
}

/// Multipart upload of the receipt image; the stored file is renamed to a
/// fresh UUID and served from static/.
pub async fn upload_receipt(
    State(db): State<Database>,
    Path(expense_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<Expense>> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses WHERE id = $1")
        .bind(expense_id)
        .fetch_one(&db)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("expense"));
    }

    let mut receipt_url = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed upload".to_string()))?
    {
        if field.name() != Some("receipt") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Malformed upload".to_string()))?;
        if data.is_empty() {
            continue;
        }
        receipt_url = Some(save_upload("static/receipts", &filename, &data, &RECEIPT_EXTENSIONS).await?);
    }

    let receipt_url = receipt_url
        .ok_or_else(|| ApiError::BadRequest("No receipt file in the upload".to_string()))?;

    let expense = sqlx::query_as::<_, Expense>(
        "UPDATE expenses SET receipt_url = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&receipt_url)
    .bind(expense_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(expense))
}

pub(crate) async fn save_upload(
    dir: &str,
    filename: &str,
    data: &[u8],
    allowed: &[&str],
) -> ApiResult<String> {
    let extension = PathBuf::from(filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !allowed.contains(&extension.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unsupported file type '.{}'",
            extension
        )));
    }

    let target_dir = PathBuf::from(dir);
    if !target_dir.exists() {
        fs::create_dir_all(&target_dir)
            .await
            .map_err(|err| ApiError::BadRequest(format!("Could not store upload: {}", err)))?;
    }

    let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
    let file_path = target_dir.join(&stored_name);
    fs::write(&file_path, data)
        .await
        .map_err(|err| ApiError::BadRequest(format!("Could not store upload: {}", err)))?;

    Ok(format!("/{}/{}", dir, stored_name))
}

pub async fn delete_expense(
    State(db): State<Database>,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(expense_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("expense"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Categories

pub async fn list_categories(State(db): State<Database>) -> ApiResult<Json<Vec<ExpenseCategory>>> {
    let categories =
        sqlx::query_as::<_, ExpenseCategory>("SELECT * FROM expense_categories ORDER BY name")
            .fetch_all(&db)
            .await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(db): State<Database>,
    Json(payload): Json<CreateExpenseCategory>,
) -> ApiResult<(StatusCode, Json<ExpenseCategory>)> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Category name is required".to_string()));
    }

    let category = sqlx::query_as::<_, ExpenseCategory>(
        r#"
        INSERT INTO expense_categories (name, description, is_active)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(db): State<Database>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CreateExpenseCategory>,
) -> ApiResult<Json<ExpenseCategory>> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Category name is required".to_string()));
    }

    let category = sqlx::query_as::<_, ExpenseCategory>(
        r#"
        UPDATE expense_categories
        SET name = $1, description = $2, is_active = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.is_active.unwrap_or(true))
    .bind(category_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("expense category"))?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(db): State<Database>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let in_use = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses WHERE category_id = $1")
        .bind(category_id)
        .fetch_one(&db)
        .await?;
    if in_use > 0 {
        return Err(ApiError::Conflict(
            "Category is in use by recorded expenses".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM expense_categories WHERE id = $1")
        .bind(category_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("expense category"));
    }
    Ok(StatusCode::NO_CONTENT)
}
