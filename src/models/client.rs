use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const CLIENT_STATUSES: [&str; 3] = ["ACTIVE", "INACTIVE", "ARCHIVED"];
pub const PROJECT_STATUSES: [&str; 5] =
    ["PLANNED", "IN_PROGRESS", "ON_HOLD", "COMPLETED", "CANCELLED"];

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub address: Option<String>,
    pub state: Option<String>,
    pub gstin: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub state: Option<String>,
    pub gstin: Option<String>,
    pub notes: Option<String>,
}

impl CreateClient {
    /// Server-side mirror of the quick-add form rules: company name, contact
    /// name and a plausible email are the only hard requirements.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Company name is required".to_string());
        }
        if self.contact_name.trim().is_empty() {
            return Err("Contact name is required".to_string());
        }
        if !is_valid_email(&self.email) {
            return Err("A valid email address is required".to_string());
        }
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some(at) = email.find('@') else {
        return false;
    };
    // Local part non-empty, domain contains a dot past the '@'.
    at > 0 && email[at + 1..].contains('.') && !email.ends_with('.') && !email[at + 1..].starts_with('.')
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub scope: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub client_id: Uuid,
    pub name: String,
    pub scope: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Client detail page payload: the client row plus what the detail view shows
/// alongside it.
#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub projects: Vec<Project>,
    pub invoice_count: i64,
    pub outstanding_balance: rust_decimal::Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_complete_quick_add() {
        let form = CreateClient {
            name: "Acme Studio".to_string(),
            contact_name: "Priya Nair".to_string(),
            email: "priya@acme.studio".to_string(),
            phone: None,
            address: None,
            state: None,
            gstin: None,
            notes: None,
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn rejects_blank_required_fields() {
        let mut form = CreateClient {
            name: "  ".to_string(),
            contact_name: "Priya Nair".to_string(),
            email: "priya@acme.studio".to_string(),
            phone: None,
            address: None,
            state: None,
            gstin: None,
            notes: None,
        };
        assert!(form.validate().is_err());

        form.name = "Acme Studio".to_string();
        form.contact_name = String::new();
        assert!(form.validate().is_err());
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(!is_valid_email("priya"));
        assert!(!is_valid_email("priya@acme"));
        assert!(!is_valid_email("@acme.studio"));
        assert!(!is_valid_email("priya@.studio"));
        assert!(is_valid_email("priya@acme.studio"));
    }
}
