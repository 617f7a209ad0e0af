use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ExpenseCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub category_id: Uuid,
    pub client_id: Option<Uuid>,
    pub amount: Decimal,
    pub gst_amount: Decimal,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub expense_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List-view row with category and client names joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct ExpenseRow {
    pub id: Uuid,
    pub category_name: String,
    pub client_name: Option<String>,
    pub amount: Decimal,
    pub gst_amount: Decimal,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub expense_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseCategory {
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
