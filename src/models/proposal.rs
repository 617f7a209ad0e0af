use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Proposal {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub services: serde_json::Value,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_schedule: serde_json::Value,
    pub status: String,
    pub validity_days: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of the services table on a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalService {
    pub service_type: String,
    pub price: Decimal,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<String>,
    #[serde(default)]
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMilestone {
    pub milestone: String,
    pub percentage: Decimal,
    /// Recomputed from the proposal total; any client-supplied value is
    /// discarded.
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountType {
    Flat,
    Percent,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Flat => "FLAT",
            DiscountType::Percent => "PERCENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FLAT" => Some(DiscountType::Flat),
            "PERCENT" => Some(DiscountType::Percent),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProposal {
    pub client_id: Uuid,
    pub title: String,
    pub services: Vec<ProposalService>,
    #[serde(default = "default_discount_type")]
    pub discount_type: String,
    #[serde(default)]
    pub discount_value: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub payment_schedule: Vec<PaymentMilestone>,
    pub validity_days: Option<i32>,
    pub notes: Option<String>,
}

fn default_discount_type() -> String {
    "FLAT".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalPricing {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Authoritative pricing. The client previews the same arithmetic, but what is
/// stored and sent always comes from here.
pub fn compute_pricing(
    services: &[ProposalService],
    discount_type: DiscountType,
    discount_value: Decimal,
    tax_rate: Decimal,
) -> ProposalPricing {
    let subtotal: Decimal = services.iter().map(|s| s.price).sum();

    let discount_amount = match discount_type {
        DiscountType::Flat => discount_value,
        DiscountType::Percent => (subtotal * discount_value / Decimal::from(100)).round_dp(2),
    }
    .min(subtotal)
    .max(Decimal::ZERO);

    let after_discount = subtotal - discount_amount;
    let tax_amount = (after_discount * tax_rate / Decimal::from(100)).round_dp(2);

    ProposalPricing {
        subtotal,
        discount_amount,
        tax_amount,
        total_amount: after_discount + tax_amount,
    }
}

/// Milestone amounts follow the total; percentages must cover the whole total.
pub fn apply_schedule(
    schedule: &[PaymentMilestone],
    total: Decimal,
) -> Result<Vec<PaymentMilestone>, String> {
    if schedule.is_empty() {
        return Ok(Vec::new());
    }
    let pct_sum: Decimal = schedule.iter().map(|m| m.percentage).sum();
    if pct_sum != Decimal::from(100) {
        return Err(format!(
            "Payment schedule percentages must total 100, got {}",
            pct_sum
        ));
    }
    Ok(schedule
        .iter()
        .map(|m| PaymentMilestone {
            milestone: m.milestone.clone(),
            percentage: m.percentage,
            amount: (total * m.percentage / Decimal::from(100)).round_dp(2),
        })
        .collect())
}

pub fn proposal_transition_allowed(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("DRAFT", "SENT") | ("SENT", "ACCEPTED") | ("SENT", "REJECTED")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn svc(price: &str) -> ProposalService {
        ProposalService {
            service_type: "Retainer".to_string(),
            price: dec(price),
            deliverables: Vec::new(),
            kpis: Vec::new(),
            timeline: None,
        }
    }

    #[test]
    fn flat_discount_then_tax() {
        // 100000 - 10000 flat = 90000; 18% GST = 16200; total 106200.
        let pricing = compute_pricing(
            &[svc("60000"), svc("40000")],
            DiscountType::Flat,
            dec("10000"),
            dec("18"),
        );
        assert_eq!(pricing.subtotal, dec("100000"));
        assert_eq!(pricing.discount_amount, dec("10000"));
        assert_eq!(pricing.tax_amount, dec("16200.00"));
        assert_eq!(pricing.total_amount, dec("106200.00"));
    }

    #[test]
    fn percent_discount_applies_to_subtotal() {
        let pricing = compute_pricing(&[svc("100000")], DiscountType::Percent, dec("10"), dec("18"));
        assert_eq!(pricing.discount_amount, dec("10000.00"));
        assert_eq!(pricing.total_amount, dec("106200.0000"));
    }

    #[test]
    fn discount_never_exceeds_subtotal() {
        let pricing = compute_pricing(&[svc("5000")], DiscountType::Flat, dec("9000"), dec("18"));
        assert_eq!(pricing.discount_amount, dec("5000"));
        assert_eq!(pricing.total_amount, Decimal::ZERO);
    }

    #[test]
    fn schedule_amounts_follow_total() {
        let schedule = vec![
            PaymentMilestone {
                milestone: "Kickoff".to_string(),
                percentage: dec("40"),
                amount: Decimal::ZERO,
            },
            PaymentMilestone {
                milestone: "Delivery".to_string(),
                percentage: dec("60"),
                amount: dec("999999"), // client-supplied, ignored
            },
        ];
        let applied = apply_schedule(&schedule, dec("106200")).unwrap();
        assert_eq!(applied[0].amount, dec("42480.00"));
        assert_eq!(applied[1].amount, dec("63720.00"));
    }

    #[test]
    fn schedule_must_sum_to_hundred() {
        let schedule = vec![PaymentMilestone {
            milestone: "Kickoff".to_string(),
            percentage: dec("50"),
            amount: Decimal::ZERO,
        }];
        assert!(apply_schedule(&schedule, dec("1000")).is_err());
        assert!(apply_schedule(&[], dec("1000")).unwrap().is_empty());
    }

    #[test]
    fn only_forward_transitions_allowed() {
        assert!(proposal_transition_allowed("DRAFT", "SENT"));
        assert!(proposal_transition_allowed("SENT", "ACCEPTED"));
        assert!(proposal_transition_allowed("SENT", "REJECTED"));
        assert!(!proposal_transition_allowed("DRAFT", "ACCEPTED"));
        assert!(!proposal_transition_allowed("ACCEPTED", "SENT"));
        assert!(!proposal_transition_allowed("REJECTED", "ACCEPTED"));
    }
}
