use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::{
        invoice::{compute_amounts, derive_status, format_invoice_number},
        CreateInvoice, Invoice, InvoiceListRow, InvoicePayment, RecordPayment,
    },
};

/// Stored status is lifecycle + payment state; aging into OVERDUE happens at
/// read time so a GET never mutates the row.
const STATUS_AT_READ: &str = r#"
    CASE WHEN i.status IN ('SENT', 'PARTIALLY_PAID')
              AND i.due_date < CURRENT_DATE
              AND i.balance_due > 0
         THEN 'OVERDUE'
         ELSE i.status
    END AS status
"#;

#[derive(Deserialize)]
pub struct InvoiceFilters {
    client_id: Option<Uuid>,
    status: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

pub async fn list_invoices(
    State(db): State<Database>,
    Query(filters): Query<InvoiceFilters>,
) -> ApiResult<Json<Vec<InvoiceListRow>>> {
    let mut query_builder = sqlx::QueryBuilder::new(format!(
        r#"
        SELECT
            i.id, i.client_id, c.name AS client_name, i.invoice_number,
            i.issue_date, i.due_date, i.total_amount, i.amount_paid, i.balance_due,
            {}
        FROM invoices i
        JOIN clients c ON i.client_id = c.id
        "#,
        STATUS_AT_READ
    ));

    let mut conditions_started = false;
    let mut push_condition = |qb: &mut sqlx::QueryBuilder<sqlx::Postgres>| {
        if conditions_started {
            qb.push(" AND ");
        } else {
            qb.push(" WHERE ");
            conditions_started = true;
        }
    };

    if let Some(client_id) = filters.client_id {
        push_condition(&mut query_builder);
        query_builder.push("i.client_id = ").push_bind(client_id);
    }
    if let Some(date_from) = filters.date_from {
        push_condition(&mut query_builder);
        query_builder.push("i.issue_date >= ").push_bind(date_from);
    }
    if let Some(date_to) = filters.date_to {
        push_condition(&mut query_builder);
        query_builder.push("i.issue_date <= ").push_bind(date_to);
    }
    query_builder.push(" ORDER BY i.issue_date DESC, i.invoice_number DESC");

    let mut rows = query_builder
        .build_query_as::<InvoiceListRow>()
        .fetch_all(&db)
        .await?;

    // Status is derived in SQL, so the filter applies after the fetch.
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        rows.retain(|row| row.status == status);
    }

    Ok(Json(rows))
}

pub async fn create_invoice(
    State(db): State<Database>,
    Json(payload): Json<CreateInvoice>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    if payload.subtotal <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Invoice subtotal must be positive".to_string(),
        ));
    }
    if payload.due_date < payload.issue_date {
        return Err(ApiError::Validation(
            "Due date cannot precede the issue date".to_string(),
        ));
    }

    let client_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE id = $1")
            .bind(payload.client_id)
            .fetch_one(&db)
            .await?;
    if client_exists == 0 {
        return Err(ApiError::NotFound("client"));
    }

    let amounts = compute_amounts(payload.subtotal, payload.tax_rate);

    let mut tx = db.begin().await?;

    let year = payload.issue_date.year();
    let seq = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) + 1 FROM invoices WHERE invoice_number LIKE $1",
    )
    .bind(format!("INV-{}-%", year))
    .fetch_one(&mut *tx)
    .await?;
    let invoice_number = format_invoice_number(year, seq);

    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices (
            client_id, project_id, invoice_number, issue_date, due_date,
            subtotal, tax_rate, tax_amount, total_amount, amount_paid, balance_due, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $9, $10)
        RETURNING *
        "#,
    )
    .bind(payload.client_id)
    .bind(payload.project_id)
    .bind(&invoice_number)
    .bind(payload.issue_date)
    .bind(payload.due_date)
    .bind(payload.subtotal)
    .bind(payload.tax_rate)
    .bind(amounts.tax_amount)
    .bind(amounts.total_amount)
    .bind(&payload.notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

#[derive(Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payments: Vec<InvoicePayment>,
}

pub async fn get_invoice(
    State(db): State<Database>,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<InvoiceDetail>> {
    let invoice = fetch_invoice(&db, invoice_id).await?;

    let payments = sqlx::query_as::<_, InvoicePayment>(
        "SELECT * FROM invoice_payments WHERE invoice_id = $1 ORDER BY payment_date, created_at",
    )
    .bind(invoice_id)
    .fetch_all(&db)
    .await?;

    Ok(Json(InvoiceDetail { invoice, payments }))
}

async fn fetch_invoice(db: &Database, invoice_id: Uuid) -> ApiResult<Invoice> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT i.id, i.client_id, i.project_id, i.invoice_number, i.issue_date, i.due_date, \
         i.subtotal, i.tax_rate, i.tax_amount, i.total_amount, i.amount_paid, i.balance_due, \
         {}, i.notes, i.created_at, i.updated_at FROM invoices i WHERE i.id = $1",
        STATUS_AT_READ
    ))
    .bind(invoice_id)
    .fetch_optional(db)
    .await?
    .ok_or(ApiError::NotFound("invoice"))
}

/// Amounts are editable until a payment lands; afterwards only notes and the
/// due date may change.
#[derive(Deserialize)]
pub struct UpdateInvoice {
    pub due_date: NaiveDate,
    pub subtotal: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

pub async fn update_invoice(
    State(db): State<Database>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoice>,
) -> ApiResult<Json<Invoice>> {
    let current = fetch_invoice(&db, invoice_id).await?;

    let amount_change = payload.subtotal.is_some() || payload.tax_rate.is_some();
    if amount_change && current.amount_paid > Decimal::ZERO {
        return Err(ApiError::Conflict(
            "Invoice amounts cannot change after a payment has been recorded".to_string(),
        ));
    }

    let subtotal = payload.subtotal.unwrap_or(current.subtotal);
    let tax_rate = payload.tax_rate.unwrap_or(current.tax_rate);
    if subtotal <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Invoice subtotal must be positive".to_string(),
        ));
    }
    let amounts = compute_amounts(subtotal, tax_rate);
    let balance_due = amounts.total_amount - current.amount_paid;

    sqlx::query(
        r#"
        UPDATE invoices
        SET due_date = $1, subtotal = $2, tax_rate = $3, tax_amount = $4,
            total_amount = $5, balance_due = $6, notes = $7, updated_at = NOW()
        WHERE id = $8
        "#,
    )
    .bind(payload.due_date)
    .bind(subtotal)
    .bind(tax_rate)
    .bind(amounts.tax_amount)
    .bind(amounts.total_amount)
    .bind(balance_due)
    .bind(&payload.notes)
    .bind(invoice_id)
    .execute(&db)
    .await?;

    Ok(Json(fetch_invoice(&db, invoice_id).await?))
}

pub async fn record_payment(
    State(db): State<Database>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<RecordPayment>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Payment amount must be positive".to_string(),
        ));
    }

    let mut tx = db.begin().await?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound("invoice"))?;

    if invoice.status == "DRAFT" {
        return Err(ApiError::Conflict(
            "Send the invoice before recording payments".to_string(),
        ));
    }
    if invoice.status == "CANCELLED" {
        return Err(ApiError::Conflict(
            "Cancelled invoices cannot take payments".to_string(),
        ));
    }
    if payload.amount > invoice.balance_due {
        return Err(ApiError::Validation(format!(
            "Payment of {} exceeds the open balance of {}",
            payload.amount, invoice.balance_due
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO invoice_payments (invoice_id, amount, payment_date, method, reference)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(invoice_id)
    .bind(payload.amount)
    .bind(payload.payment_date)
    .bind(&payload.method)
    .bind(&payload.reference)
    .execute(&mut *tx)
    .await?;

    let amount_paid = invoice.amount_paid + payload.amount;
    let balance_due = invoice.total_amount - amount_paid;
    let status = derive_status(
        "SENT",
        invoice.total_amount,
        amount_paid,
        invoice.due_date,
        Utc::now().date_naive(),
    );

    sqlx::query(
        r#"
        UPDATE invoices
        SET amount_paid = $1, balance_due = $2, status = $3, updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(amount_paid)
    .bind(balance_due)
    .bind(&status)
    .bind(invoice_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(fetch_invoice(&db, invoice_id).await?)))
}

pub async fn send_invoice(
    State(db): State<Database>,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    let result = sqlx::query(
        "UPDATE invoices SET status = 'SENT', updated_at = NOW() WHERE id = $1 AND status = 'DRAFT'",
    )
    .bind(invoice_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish a missing invoice from an illegal transition.
        fetch_invoice(&db, invoice_id).await?;
        return Err(ApiError::Conflict(
            "Only draft invoices can be sent".to_string(),
        ));
    }

    Ok(Json(fetch_invoice(&db, invoice_id).await?))
}

pub async fn cancel_invoice(
    State(db): State<Database>,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    let invoice = fetch_invoice(&db, invoice_id).await?;
    if invoice.status == "PAID" {
        return Err(ApiError::Conflict(
            "A fully paid invoice cannot be cancelled".to_string(),
        ));
    }

    sqlx::query("UPDATE invoices SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1")
        .bind(invoice_id)
        .execute(&db)
        .await?;

    Ok(Json(fetch_invoice(&db, invoice_id).await?))
}

pub async fn delete_invoice(
    State(db): State<Database>,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("invoice"));
    }
    Ok(StatusCode::NO_CONTENT)
}
