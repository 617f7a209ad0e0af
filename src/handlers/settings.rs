use axum::{extract::State, response::Json};
use axum_extra::extract::Multipart;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    handlers::expenses::save_upload,
    models::{
        settings::{self, is_masked, mask_secret, GATEWAY_PROVIDERS},
        ApiKeySettings, CompanyProfile, PaymentGatewaySettings, SlackSettings, UpdateApiKeys,
        UpdateCompanyProfile, UpdatePaymentGateway, UpdateSlackSettings,
    },
};

const LOGO_MAX_BYTES: usize = 1024 * 1024;
const LOGO_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// Company profile (singleton row)

pub async fn get_company(State(db): State<Database>) -> ApiResult<Json<CompanyProfile>> {
    let profile =
        sqlx::query_as::<_, CompanyProfile>("SELECT * FROM company_profile WHERE id = 1")
            .fetch_one(&db)
            .await?;
    Ok(Json(profile))
}

pub async fn update_company(
    State(db): State<Database>,
    Json(payload): Json<UpdateCompanyProfile>,
) -> ApiResult<Json<CompanyProfile>> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Company name is required".to_string()));
    }

    let profile = sqlx::query_as::<_, CompanyProfile>(
        r#"
        UPDATE company_profile
        SET name = $1, address = $2, city = $3, state = $4, postal_code = $5,
            gstin = $6, phone = $7, email = $8, bank_name = $9, bank_account = $10,
            bank_ifsc = $11, invoice_terms = $12, updated_at = NOW()
        WHERE id = 1
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.address)
    .bind(&payload.city)
    .bind(&payload.state)
    .bind(&payload.postal_code)
    .bind(&payload.gstin)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.bank_name)
    .bind(&payload.bank_account)
    .bind(&payload.bank_ifsc)
    .bind(&payload.invoice_terms)
    .fetch_one(&db)
    .await?;

    Ok(Json(profile))
}

pub async fn upload_logo(
    State(db): State<Database>,
    mut multipart: Multipart,
) -> ApiResult<Json<CompanyProfile>> {
    let mut logo_url = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed upload".to_string()))?
    {
        if field.name() != Some("logo") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Malformed upload".to_string()))?;
        if data.len() > LOGO_MAX_BYTES {
            return Err(ApiError::Validation(
                "Logo must be 1MB or smaller".to_string(),
            ));
        }
        if data.is_empty() {
            continue;
        }
        logo_url = Some(save_upload("static/uploads", &filename, &data, &LOGO_EXTENSIONS).await?);
    }

    let logo_url =
        logo_url.ok_or_else(|| ApiError::BadRequest("No logo file in the upload".to_string()))?;

    let profile = sqlx::query_as::<_, CompanyProfile>(
        "UPDATE company_profile SET logo_url = $1, updated_at = NOW() WHERE id = 1 RETURNING *",
    )
    .bind(&logo_url)
    .fetch_one(&db)
    .await?;

    Ok(Json(profile))
}

// Key/value settings storage. Secrets go out masked and a masked value coming
// back in is treated as "unchanged".

async fn get_setting(db: &Database, key: &str) -> Result<String, sqlx::Error> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM app_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(db)
        .await?;
    Ok(value.unwrap_or_default())
}

async fn put_setting(db: &Database, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO app_settings (key, value) VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await?;
    Ok(())
}

async fn store_secret(db: &Database, key: &str, incoming: Option<&str>) -> Result<(), sqlx::Error> {
    if let Some(value) = incoming {
        if !is_masked(value) {
            put_setting(db, key, value.trim()).await?;
        }
    }
    Ok(())
}

pub async fn get_api_keys(State(db): State<Database>) -> ApiResult<Json<ApiKeySettings>> {
    Ok(Json(ApiKeySettings {
        openai_api_key: mask_secret(&get_setting(&db, settings::OPENAI_API_KEY).await?),
        gemini_api_key: mask_secret(&get_setting(&db, settings::GEMINI_API_KEY).await?),
        resend_api_key: mask_secret(&get_setting(&db, settings::RESEND_API_KEY).await?),
    }))
}

pub async fn update_api_keys(
    State(db): State<Database>,
    Json(payload): Json<UpdateApiKeys>,
) -> ApiResult<Json<ApiKeySettings>> {
    store_secret(&db, settings::OPENAI_API_KEY, payload.openai_api_key.as_deref()).await?;
    store_secret(&db, settings::GEMINI_API_KEY, payload.gemini_api_key.as_deref()).await?;
    store_secret(&db, settings::RESEND_API_KEY, payload.resend_api_key.as_deref()).await?;

    get_api_keys(State(db)).await
}

pub async fn get_slack(State(db): State<Database>) -> ApiResult<Json<SlackSettings>> {
    Ok(Json(SlackSettings {
        bot_token: mask_secret(&get_setting(&db, settings::SLACK_BOT_TOKEN).await?),
        signing_secret: mask_secret(&get_setting(&db, settings::SLACK_SIGNING_SECRET).await?),
        default_channel: get_setting(&db, settings::SLACK_DEFAULT_CHANNEL).await?,
        notifications_enabled: get_setting(&db, settings::SLACK_NOTIFICATIONS_ENABLED).await?
            == "true",
    }))
}

pub async fn update_slack(
    State(db): State<Database>,
    Json(payload): Json<UpdateSlackSettings>,
) -> ApiResult<Json<SlackSettings>> {
    store_secret(&db, settings::SLACK_BOT_TOKEN, payload.bot_token.as_deref()).await?;
    store_secret(
        &db,
        settings::SLACK_SIGNING_SECRET,
        payload.signing_secret.as_deref(),
    )
    .await?;
    if let Some(channel) = &payload.default_channel {
        put_setting(&db, settings::SLACK_DEFAULT_CHANNEL, channel.trim()).await?;
    }
    if let Some(enabled) = payload.notifications_enabled {
        put_setting(
            &db,
            settings::SLACK_NOTIFICATIONS_ENABLED,
            if enabled { "true" } else { "false" },
        )
        .await?;
    }

    get_slack(State(db)).await
}

pub async fn get_payment_gateway(
    State(db): State<Database>,
) -> ApiResult<Json<PaymentGatewaySettings>> {
    Ok(Json(PaymentGatewaySettings {
        provider: get_setting(&db, settings::GATEWAY_PROVIDER).await?,
        // Publishable keys are client-visible by design; only the secret key
        // is masked.
        publishable_key: get_setting(&db, settings::GATEWAY_PUBLISHABLE_KEY).await?,
        secret_key: mask_secret(&get_setting(&db, settings::GATEWAY_SECRET_KEY).await?),
    }))
}

pub async fn update_payment_gateway(
    State(db): State<Database>,
    Json(payload): Json<UpdatePaymentGateway>,
) -> ApiResult<Json<PaymentGatewaySettings>> {
    if let Some(provider) = &payload.provider {
        if !GATEWAY_PROVIDERS.contains(&provider.as_str()) {
            return Err(ApiError::Validation(format!(
                "Unknown payment gateway '{}'",
                provider
            )));
        }
        put_setting(&db, settings::GATEWAY_PROVIDER, provider).await?;
    }
    if let Some(key) = &payload.publishable_key {
        put_setting(&db, settings::GATEWAY_PUBLISHABLE_KEY, key.trim()).await?;
    }
    store_secret(&db, settings::GATEWAY_SECRET_KEY, payload.secret_key.as_deref()).await?;

    get_payment_gateway(State(db)).await
}
