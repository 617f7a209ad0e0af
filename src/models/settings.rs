use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct CompanyProfile {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub gstin: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub bank_ifsc: Option<String>,
    pub invoice_terms: Option<String>,
    pub logo_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompanyProfile {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub gstin: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub bank_ifsc: Option<String>,
    pub invoice_terms: Option<String>,
}

// app_settings keys. Secrets only ever leave the server masked.
pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const GEMINI_API_KEY: &str = "gemini_api_key";
pub const RESEND_API_KEY: &str = "resend_api_key";
pub const SLACK_BOT_TOKEN: &str = "slack_bot_token";
pub const SLACK_SIGNING_SECRET: &str = "slack_signing_secret";
pub const SLACK_DEFAULT_CHANNEL: &str = "slack_default_channel";
pub const SLACK_NOTIFICATIONS_ENABLED: &str = "slack_notifications_enabled";
pub const GATEWAY_PROVIDER: &str = "payment_gateway_provider";
pub const GATEWAY_PUBLISHABLE_KEY: &str = "payment_gateway_publishable_key";
pub const GATEWAY_SECRET_KEY: &str = "payment_gateway_secret_key";

const MASK: &str = "\u{2022}\u{2022}\u{2022}\u{2022}";

/// Display form of a stored secret: bullet run plus the last four characters,
/// enough for the user to recognize which key is configured.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    if secret.chars().count() <= 4 {
        return MASK.to_string();
    }
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}{}", MASK, tail)
}

/// A PUT that echoes back the masked display value must not overwrite the
/// stored secret.
pub fn is_masked(value: &str) -> bool {
    value.contains('\u{2022}')
}

#[derive(Debug, Serialize)]
pub struct ApiKeySettings {
    pub openai_api_key: String,
    pub gemini_api_key: String,
    pub resend_api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApiKeys {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub resend_api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SlackSettings {
    pub bot_token: String,
    pub signing_secret: String,
    pub default_channel: String,
    pub notifications_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSlackSettings {
    pub bot_token: Option<String>,
    pub signing_secret: Option<String>,
    pub default_channel: Option<String>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PaymentGatewaySettings {
    pub provider: String,
    pub publishable_key: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentGateway {
    pub provider: Option<String>,
    pub publishable_key: Option<String>,
    pub secret_key: Option<String>,
}

pub const GATEWAY_PROVIDERS: [&str; 2] = ["STRIPE", "RAZORPAY"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_keep_only_the_tail() {
        assert_eq!(mask_secret("sk-abcdef123456wxyz"), "\u{2022}\u{2022}\u{2022}\u{2022}wxyz");
        assert_eq!(mask_secret("abcd"), "\u{2022}\u{2022}\u{2022}\u{2022}");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn masked_values_are_recognized() {
        assert!(is_masked(&mask_secret("sk-abcdef123456wxyz")));
        assert!(!is_masked("sk-abcdef123456wxyz"));
        assert!(!is_masked(""));
    }
}
