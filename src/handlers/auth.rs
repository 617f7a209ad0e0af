use axum::{extract::State, http::StatusCode, response::Json, Extension};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::{CreateUser, LoginRequest, User, UserResponse},
    utils::{create_token, hash_password, verify_password},
};

pub async fn register(
    State(db): State<Database>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    if payload.email.trim().is_empty() || payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "Email and a password of at least 8 characters are required".to_string(),
        ));
    }

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_one(&db)
        .await?;
    if existing > 0 {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|_| ApiError::BadRequest("Failed to process password".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    State(db): State<Database>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = $1 AND is_active = true",
    )
    .bind(&payload.email)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash).unwrap_or(false) {
        return Err(ApiError::Unauthorized);
    }

    let token = create_token(user.id, user.email.clone())
        .map_err(|_| ApiError::BadRequest("Failed to issue session token".to_string()))?;

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&db)
        .await?;

    let cookie = Cookie::build(("auth_token", token.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(24))
        .build();
    cookies.add(cookie);

    log::info!("user {} logged in", user.email);

    Ok(Json(json!({
        "token": token,
        "user": UserResponse::from(user),
    })))
}

pub async fn logout(cookies: Cookies) -> Json<serde_json::Value> {
    cookies.remove(Cookie::from("auth_token"));
    Json(json!({ "ok": true }))
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}
