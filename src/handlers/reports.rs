use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
};

#[derive(Deserialize)]
pub struct ReportRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// Defaults to the current Indian fiscal year (April 1 through March 31).
fn resolve_range(range: &ReportRange) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let fy_start_year = if today.month() >= 4 {
        today.year()
    } else {
        today.year() - 1
    };
    let default_from = NaiveDate::from_ymd_opt(fy_start_year, 4, 1).expect("valid fiscal start");
    let default_to = NaiveDate::from_ymd_opt(fy_start_year + 1, 3, 31).expect("valid fiscal end");

    (range.from.unwrap_or(default_from), range.to.unwrap_or(default_to))
}

// Profit & loss

#[derive(Debug, Serialize)]
pub struct MonthlyRow {
    pub month: NaiveDate,
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub salaries: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ProfitLossReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub revenue: Decimal,
    pub expense_total: Decimal,
    pub salary_total: Decimal,
    pub net_profit: Decimal,
    pub monthly: Vec<MonthlyRow>,
}

async fn profit_loss_report(
    db: &Database,
    from: NaiveDate,
    to: NaiveDate,
) -> ApiResult<ProfitLossReport> {
    let revenue_rows = sqlx::query_as::<_, (NaiveDate, Decimal)>(
        r#"
        SELECT date_trunc('month', payment_date)::date AS month, SUM(amount)
        FROM invoice_payments
        WHERE payment_date BETWEEN $1 AND $2
        GROUP BY 1
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;

    let expense_rows = sqlx::query_as::<_, (NaiveDate, Decimal)>(
        r#"
        SELECT date_trunc('month', expense_date)::date AS month, SUM(amount)
        FROM expenses
        WHERE status = 'APPROVED' AND expense_date BETWEEN $1 AND $2
        GROUP BY 1
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;

    let salary_rows = sqlx::query_as::<_, (NaiveDate, Decimal)>(
        r#"
        SELECT date_trunc('month', payment_date)::date AS month, SUM(amount)
        FROM salary_payments
        WHERE status = 'PAID' AND payment_date BETWEEN $1 AND $2
        GROUP BY 1
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;

    #[derive(Default)]
    struct Bucket {
        revenue: Decimal,
        expenses: Decimal,
        salaries: Decimal,
    }

    let mut months: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for (month, amount) in revenue_rows {
        months.entry(month).or_default().revenue += amount;
    }
    for (month, amount) in expense_rows {
        months.entry(month).or_default().expenses += amount;
    }
    for (month, amount) in salary_rows {
        months.entry(month).or_default().salaries += amount;
    }

    let monthly: Vec<MonthlyRow> = months
        .into_iter()
        .map(|(month, bucket)| MonthlyRow {
            month,
            revenue: bucket.revenue,
            expenses: bucket.expenses,
            salaries: bucket.salaries,
            net: bucket.revenue - bucket.expenses - bucket.salaries,
        })
        .collect();

    let revenue: Decimal = monthly.iter().map(|row| row.revenue).sum();
    let expense_total: Decimal = monthly.iter().map(|row| row.expenses).sum();
    let salary_total: Decimal = monthly.iter().map(|row| row.salaries).sum();

    Ok(ProfitLossReport {
        from,
        to,
        revenue,
        expense_total,
        salary_total,
        net_profit: revenue - expense_total - salary_total,
        monthly,
    })
}

pub async fn profit_loss(
    State(db): State<Database>,
    Query(range): Query<ReportRange>,
) -> ApiResult<Json<ProfitLossReport>> {
    let (from, to) = resolve_range(&range);
    Ok(Json(profit_loss_report(&db, from, to).await?))
}

// GST summary

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GstSplit {
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
}

/// Intra-state supplies split the tax into equal CGST and SGST halves;
/// inter-state supplies book the whole amount as IGST. The halves are summed
/// back exactly even when the tax is an odd number of paise.
pub fn split_gst(tax_amount: Decimal, intra_state: bool) -> GstSplit {
    if intra_state {
        let cgst = (tax_amount / Decimal::from(2)).round_dp(2);
        GstSplit {
            cgst,
            sgst: tax_amount - cgst,
            igst: Decimal::ZERO,
        }
    } else {
        GstSplit {
            cgst: Decimal::ZERO,
            sgst: Decimal::ZERO,
            igst: tax_amount,
        }
    }
}

fn same_state(company: Option<&str>, client: Option<&str>) -> bool {
    match (company, client) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()) && !a.trim().is_empty(),
        _ => false,
    }
}

#[derive(Debug, Serialize)]
pub struct GstInvoiceRow {
    pub invoice_number: String,
    pub client_name: String,
    pub client_state: Option<String>,
    pub issue_date: NaiveDate,
    pub taxable_value: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
}

#[derive(Debug, Serialize)]
pub struct GstSummaryReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub company_state: Option<String>,
    pub taxable_value: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub output_tax: Decimal,
    pub input_tax_credit: Decimal,
    pub net_liability: Decimal,
    pub invoices: Vec<GstInvoiceRow>,
}

async fn gst_summary_report(
    db: &Database,
    from: NaiveDate,
    to: NaiveDate,
) -> ApiResult<GstSummaryReport> {
    let company_state =
        sqlx::query_scalar::<_, Option<String>>("SELECT state FROM company_profile WHERE id = 1")
            .fetch_one(db)
            .await?;

    let rows = sqlx::query_as::<_, (String, String, Option<String>, NaiveDate, Decimal, Decimal)>(
        r#"
        SELECT i.invoice_number, c.name, c.state, i.issue_date, i.subtotal, i.tax_amount
        FROM invoices i
        JOIN clients c ON i.client_id = c.id
        WHERE i.status NOT IN ('DRAFT', 'CANCELLED')
          AND i.tax_amount > 0
          AND i.issue_date BETWEEN $1 AND $2
        ORDER BY i.issue_date, i.invoice_number
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;

    let mut invoices = Vec::with_capacity(rows.len());
    let mut taxable_value = Decimal::ZERO;
    let mut totals = GstSplit {
        cgst: Decimal::ZERO,
        sgst: Decimal::ZERO,
        igst: Decimal::ZERO,
    };

    for (invoice_number, client_name, client_state, issue_date, subtotal, tax_amount) in rows {
        let split = split_gst(
            tax_amount,
            same_state(company_state.as_deref(), client_state.as_deref()),
        );
        taxable_value += subtotal;
        totals.cgst += split.cgst;
        totals.sgst += split.sgst;
        totals.igst += split.igst;
        invoices.push(GstInvoiceRow {
            invoice_number,
            client_name,
            client_state,
            issue_date,
            taxable_value: subtotal,
            cgst: split.cgst,
            sgst: split.sgst,
            igst: split.igst,
        });
    }

    let input_tax_credit = sqlx::query_scalar::<_, Option<Decimal>>(
        r#"
        SELECT SUM(gst_amount) FROM expenses
        WHERE status = 'APPROVED' AND gst_amount > 0 AND expense_date BETWEEN $1 AND $2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(db)
    .await?
    .unwrap_or(Decimal::ZERO);

    let output_tax = totals.cgst + totals.sgst + totals.igst;

    Ok(GstSummaryReport {
        from,
        to,
        company_state,
        taxable_value,
        cgst: totals.cgst,
        sgst: totals.sgst,
        igst: totals.igst,
        output_tax,
        input_tax_credit,
        net_liability: output_tax - input_tax_credit,
        invoices,
    })
}

pub async fn gst_summary(
    State(db): State<Database>,
    Query(range): Query<ReportRange>,
) -> ApiResult<Json<GstSummaryReport>> {
    let (from, to) = resolve_range(&range);
    Ok(Json(gst_summary_report(&db, from, to).await?))
}

// Invoice aging

pub const AGING_BUCKETS: [&str; 5] = ["CURRENT", "1-30", "31-60", "61-90", "90+"];

pub fn aging_bucket(due_date: NaiveDate, today: NaiveDate) -> &'static str {
    let days_past = (today - due_date).num_days();
    if days_past <= 0 {
        "CURRENT"
    } else if days_past <= 30 {
        "1-30"
    } else if days_past <= 60 {
        "31-60"
    } else if days_past <= 90 {
        "61-90"
    } else {
        "90+"
    }
}

#[derive(Debug, Serialize)]
pub struct AgingRow {
    pub invoice_number: String,
    pub client_name: String,
    pub due_date: NaiveDate,
    pub balance_due: Decimal,
    pub bucket: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AgingReport {
    pub buckets: BTreeMap<&'static str, Decimal>,
    pub invoices: Vec<AgingRow>,
}

async fn invoice_aging_report(db: &Database) -> ApiResult<AgingReport> {
    let rows = sqlx::query_as::<_, (String, String, NaiveDate, Decimal)>(
        r#"
        SELECT i.invoice_number, c.name, i.due_date, i.balance_due
        FROM invoices i
        JOIN clients c ON i.client_id = c.id
        WHERE i.status NOT IN ('DRAFT', 'CANCELLED') AND i.balance_due > 0
        ORDER BY i.due_date
        "#,
    )
    .fetch_all(db)
    .await?;

    let today = Utc::now().date_naive();
    let mut buckets: BTreeMap<&'static str, Decimal> =
        AGING_BUCKETS.iter().map(|b| (*b, Decimal::ZERO)).collect();

    let invoices: Vec<AgingRow> = rows
        .into_iter()
        .map(|(invoice_number, client_name, due_date, balance_due)| {
            let bucket = aging_bucket(due_date, today);
            *buckets.entry(bucket).or_default() += balance_due;
            AgingRow {
                invoice_number,
                client_name,
                due_date,
                balance_due,
                bucket,
            }
        })
        .collect();

    Ok(AgingReport { buckets, invoices })
}

pub async fn invoice_aging(State(db): State<Database>) -> ApiResult<Json<AgingReport>> {
    Ok(Json(invoice_aging_report(&db).await?))
}

// CSV export. The original product rendered PDF/XLSX downloads; the same rows
// go out as text/csv here.

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn csv_response(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn export_csv(
    State(db): State<Database>,
    Path(report): Path<String>,
    Query(range): Query<ReportRange>,
) -> ApiResult<Response> {
    let (from, to) = resolve_range(&range);

    match report.as_str() {
        "profit-loss" => {
            let report = profit_loss_report(&db, from, to).await?;
            let mut lines = vec![csv_line(&[
                "month".to_string(),
                "revenue".to_string(),
                "expenses".to_string(),
                "salaries".to_string(),
                "net".to_string(),
            ])];
            for row in &report.monthly {
                lines.push(csv_line(&[
                    row.month.format("%Y-%m").to_string(),
                    row.revenue.to_string(),
                    row.expenses.to_string(),
                    row.salaries.to_string(),
                    row.net.to_string(),
                ]));
            }
            lines.push(csv_line(&[
                "TOTAL".to_string(),
                report.revenue.to_string(),
                report.expense_total.to_string(),
                report.salary_total.to_string(),
                report.net_profit.to_string(),
            ]));
            Ok(csv_response(
                &format!("profit-loss-{}-to-{}.csv", from, to),
                lines.join("\n"),
            ))
        }
        "gst-summary" => {
            let report = gst_summary_report(&db, from, to).await?;
            let mut lines = vec![csv_line(&[
                "invoice_number".to_string(),
                "client".to_string(),
                "state".to_string(),
                "issue_date".to_string(),
                "taxable_value".to_string(),
                "cgst".to_string(),
                "sgst".to_string(),
                "igst".to_string(),
            ])];
            for row in &report.invoices {
                lines.push(csv_line(&[
                    row.invoice_number.clone(),
                    row.client_name.clone(),
                    row.client_state.clone().unwrap_or_default(),
                    row.issue_date.to_string(),
                    row.taxable_value.to_string(),
                    row.cgst.to_string(),
                    row.sgst.to_string(),
                    row.igst.to_string(),
                ]));
            }
            lines.push(csv_line(&[
                "TOTAL".to_string(),
                String::new(),
                String::new(),
                String::new(),
                report.taxable_value.to_string(),
                report.cgst.to_string(),
                report.sgst.to_string(),
                report.igst.to_string(),
            ]));
            lines.push(csv_line(&[
                "INPUT_TAX_CREDIT".to_string(),
                report.input_tax_credit.to_string(),
            ]));
            lines.push(csv_line(&[
                "NET_LIABILITY".to_string(),
                report.net_liability.to_string(),
            ]));
            Ok(csv_response(
                &format!("gst-summary-{}-to-{}.csv", from, to),
                lines.join("\n"),
            ))
        }
        "invoice-aging" => {
            let report = invoice_aging_report(&db).await?;
            let mut lines = vec![csv_line(&[
                "invoice_number".to_string(),
                "client".to_string(),
                "due_date".to_string(),
                "balance_due".to_string(),
                "bucket".to_string(),
            ])];
            for row in &report.invoices {
                lines.push(csv_line(&[
                    row.invoice_number.clone(),
                    row.client_name.clone(),
                    row.due_date.to_string(),
                    row.balance_due.to_string(),
                    row.bucket.to_string(),
                ]));
            }
            Ok(csv_response("invoice-aging.csv", lines.join("\n")))
        }
        _ => Err(ApiError::NotFound("report")),
    }
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
    fn intra_state_splits_into_equal_halves() {
        let split = split_gst(dec("16200"), true);
        assert_eq!(split.cgst, dec("8100.00"));
        assert_eq!(split.sgst, dec("8100.00"));
        assert_eq!(split.igst, Decimal::ZERO);
    }

    #[test]
    fn odd_paise_still_sum_back_exactly() {
        let split = split_gst(dec("100.01"), true);
        assert_eq!(split.cgst + split.sgst, dec("100.01"));
        assert_eq!(split.igst, Decimal::ZERO);
    }

    #[test]
    fn inter_state_books_igst_only() {
        let split = split_gst(dec("16200"), false);
        assert_eq!(split.igst, dec("16200"));
        assert_eq!(split.cgst, Decimal::ZERO);
        assert_eq!(split.sgst, Decimal::ZERO);
    }

    #[test]
    fn state_comparison_ignores_case_and_whitespace() {
        assert!(same_state(Some("Karnataka"), Some(" karnataka ")));
        assert!(!same_state(Some("Karnataka"), Some("Kerala")));
        assert!(!same_state(None, Some("Karnataka")));
        assert!(!same_state(Some(""), Some("")));
    }

    #[test]
    fn aging_buckets_cover_the_boundaries() {
        let today = date("2026-08-07");
        assert_eq!(aging_bucket(date("2026-08-07"), today), "CURRENT");
        assert_eq!(aging_bucket(date("2026-09-01"), today), "CURRENT");
        assert_eq!(aging_bucket(date("2026-08-06"), today), "1-30");
        assert_eq!(aging_bucket(date("2026-07-08"), today), "1-30");
        assert_eq!(aging_bucket(date("2026-07-07"), today), "31-60");
        assert_eq!(aging_bucket(date("2026-05-09"), today), "61-90");
        assert_eq!(aging_bucket(date("2026-05-08"), today), "90+");
    }

    #[test]
    fn csv_fields_escape_quotes_and_commas() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
