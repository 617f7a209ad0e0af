use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub client_id: Uuid,
    pub project_id: Option<Uuid>,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List-view row with the client name joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct InvoiceListRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct InvoicePayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub client_id: Uuid,
    pub project_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPayment {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: Option<String>,
    pub reference: Option<String>,
}

/// Amounts derived from a subtotal and a percentage tax rate. The client may
/// preview these but the stored values always come from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceAmounts {
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

pub fn compute_amounts(subtotal: Decimal, tax_rate: Decimal) -> InvoiceAmounts {
    let tax_amount = (subtotal * tax_rate / Decimal::from(100)).round_dp(2);
    InvoiceAmounts {
        tax_amount,
        total_amount: subtotal + tax_amount,
    }
}

/// Payment-derived status. The stored lifecycle status (DRAFT, SENT,
/// CANCELLED) is the base; payments and the due date override it.
pub fn derive_status(
    lifecycle: &str,
    total: Decimal,
    paid: Decimal,
    due_date: NaiveDate,
    today: NaiveDate,
) -> String {
    match lifecycle {
        "CANCELLED" => "CANCELLED".to_string(),
        "DRAFT" => "DRAFT".to_string(),
        _ => {
            if paid >= total && total > Decimal::ZERO {
                "PAID".to_string()
            } else if today > due_date {
                "OVERDUE".to_string()
            } else if paid > Decimal::ZERO {
                "PARTIALLY_PAID".to_string()
            } else {
                "SENT".to_string()
            }
        }
    }
}

pub fn format_invoice_number(year: i32, seq: i64) -> String {
    format!("INV-{}-{:04}", year, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn amounts_apply_percentage_tax() {
        let amounts = compute_amounts(dec("90000"), dec("18"));
        assert_eq!(amounts.tax_amount, dec("16200.00"));
        assert_eq!(amounts.total_amount, dec("106200.00"));
    }

    #[test]
    fn zero_rate_leaves_total_at_subtotal() {
        let amounts = compute_amounts(dec("1500.50"), Decimal::ZERO);
        assert_eq!(amounts.tax_amount, Decimal::ZERO);
        assert_eq!(amounts.total_amount, dec("1500.50"));
    }

    #[test]
    fn status_tracks_payments_and_due_date() {
        let total = dec("1000");
        let due = date("2026-03-31");

        assert_eq!(
            derive_status("SENT", total, Decimal::ZERO, due, date("2026-03-01")),
            "SENT"
        );
        assert_eq!(
            derive_status("SENT", total, dec("400"), due, date("2026-03-01")),
            "PARTIALLY_PAID"
        );
        assert_eq!(
            derive_status("SENT", total, dec("400"), due, date("2026-04-02")),
            "OVERDUE"
        );
        assert_eq!(
            derive_status("SENT", total, dec("1000"), due, date("2026-04-02")),
            "PAID"
        );
    }

    #[test]
    fn cancelled_and_draft_are_sticky() {
        let due = date("2026-03-31");
        assert_eq!(
            derive_status("CANCELLED", dec("1000"), dec("1000"), due, date("2026-05-01")),
            "CANCELLED"
        );
        assert_eq!(
            derive_status("DRAFT", dec("1000"), Decimal::ZERO, due, date("2026-05-01")),
            "DRAFT"
        );
    }

    #[test]
    fn invoice_numbers_are_zero_padded_per_year() {
        assert_eq!(format_invoice_number(2026, 7), "INV-2026-0007");
        assert_eq!(format_invoice_number(2026, 1234), "INV-2026-1234");
    }
}
