use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{database::Database, error::ApiError, models::User, utils::verify_token};

#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// The client sends the JWT either as `Authorization: Bearer <token>` or in
/// the `auth_token` cookie set at login; both are accepted.
fn extract_token(request: &Request<Body>, cookies: &Cookies) -> Option<String> {
    if let Some(value) = request.headers().get(AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    cookies.get("auth_token").map(|c| c.value().to_string())
}

pub async fn get_current_user(token: &str, db: &Database) -> Option<CurrentUser> {
    let claims = verify_token(token).ok()?;
    let user_id = Uuid::parse_str(&claims.sub).ok()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(user_id)
        .fetch_optional(db)
        .await
        .ok()??;

    Some(CurrentUser::from(user))
}

/// Router-level guard for everything under /api except login, register and the
/// onboarding-token lookup. Inserts the resolved user as a request extension.
pub async fn require_auth(
    State(db): State<Database>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&request, &cookies).ok_or(ApiError::Unauthorized)?;
    let user = get_current_user(&token, &db)
        .await
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
