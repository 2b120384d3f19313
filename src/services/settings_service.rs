use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    db::OrmConn,
    dto::settings::UpdateSettingsRequest,
    entity::{
        Products,
        app_settings::{ActiveModel as SettingsActive, Entity as AppSettings, Model as SettingsModel},
    },
    error::{AppError, AppResult},
    mailer::{EmailError, SmtpConfig},
    middleware::auth::AdminUser,
    models::{AdminSettings, PublicSettings, admin_settings_from_entity, public_settings_from_entity},
    response::ApiResponse,
    state::AppState,
};

pub const DEFAULT_SMTP_PORT: u16 = 465;

/// The singleton settings row, if one has been saved.
pub async fn find_settings(orm: &OrmConn) -> AppResult<Option<SettingsModel>> {
    Ok(AppSettings::find().one(orm).await?)
}

pub async fn public_settings(state: &AppState) -> AppResult<ApiResponse<PublicSettings>> {
    if let Some(cached) = state.public_settings.value() {
        return Ok(ApiResponse::ok("Settings", cached));
    }

    let row = find_settings(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("settings"))?;
    let public = public_settings_from_entity(&row);
    state.public_settings.set(public.clone());

    Ok(ApiResponse::ok("Settings", public))
}

pub async fn admin_settings(
    state: &AppState,
    _admin: &AdminUser,
) -> AppResult<ApiResponse<AdminSettings>> {
    let row = find_settings(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("settings"))?;
    Ok(ApiResponse::ok("Settings", admin_settings_from_entity(&row)))
}

pub async fn update_settings(
    state: &AppState,
    admin: &AdminUser,
    payload: UpdateSettingsRequest,
) -> AppResult<ApiResponse<AdminSettings>> {
    if let Some(product_id) = payload.product_id {
        Products::find_by_id(product_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::not_found("product"))?;
    }

    let existing = find_settings(&state.orm).await?;
    let is_new = existing.is_none();

    let mut active: SettingsActive = match existing {
        Some(model) => model.into(),
        None => blank_settings(),
    };
    apply_update(&mut active, payload);
    active.updated_at = Set(Utc::now().into());

    let saved = if is_new {
        active.insert(&state.orm).await?
    } else {
        active.update(&state.orm).await?
    };

    state.public_settings.set(public_settings_from_entity(&saved));

    audit::record(
        state,
        Some(admin.user_id),
        "settings_update",
        "app_settings",
        serde_json::json!({ "settings_id": saved.id, "created": is_new }),
    )
    .await;
    tracing::info!(settings_id = %saved.id, created = is_new, "settings saved");

    Ok(ApiResponse::ok("Settings updated", admin_settings_from_entity(&saved)))
}

fn blank_settings() -> SettingsActive {
    SettingsActive {
        id: Set(Uuid::new_v4()),
        payment_gateway: Set("stripe".into()),
        payment_public_key: Set(None),
        payment_secret_key: Set(None),
        currency: Set("USD".into()),
        success_url: Set(String::new()),
        cancel_url: Set(String::new()),
        product_id: Set(None),
        sender_email: Set(None),
        admin_email: Set(None),
        smtp_host: Set(None),
        smtp_user: Set(None),
        smtp_pass: Set(None),
        smtp_port: Set(None),
        website_name: Set(None),
        logo_url: Set(None),
        favicon_url: Set(None),
        updated_at: Set(Utc::now().into()),
    }
}

fn apply_update(active: &mut SettingsActive, payload: UpdateSettingsRequest) {
    set_required(&mut active.payment_gateway, payload.payment_gateway);
    set_required(&mut active.currency, payload.currency);
    set_required(&mut active.success_url, payload.success_url);
    set_required(&mut active.cancel_url, payload.cancel_url);

    set_optional(&mut active.payment_public_key, payload.payment_public_key);
    set_optional(&mut active.sender_email, payload.sender_email);
    set_optional(&mut active.admin_email, payload.admin_email);
    set_optional(&mut active.smtp_host, payload.smtp_host);
    set_optional(&mut active.smtp_user, payload.smtp_user);
    set_optional(&mut active.website_name, payload.website_name);
    set_optional(&mut active.logo_url, payload.logo_url);
    set_optional(&mut active.favicon_url, payload.favicon_url);

    if let Some(port) = payload.smtp_port {
        active.smtp_port = Set(Some(port));
    }
    if let Some(product_id) = payload.product_id {
        active.product_id = Set(Some(product_id));
    }

    set_secret(&mut active.payment_secret_key, payload.payment_secret_key);
    set_secret(&mut active.smtp_pass, payload.smtp_pass);
}

fn set_required(field: &mut ActiveValue<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = Set(value.trim().to_string());
    }
}

fn set_optional(field: &mut ActiveValue<Option<String>>, value: Option<String>) {
    if let Some(value) = value {
        *field = Set(non_blank(Some(value)));
    }
}

// Secrets are never cleared by omission or by an empty value.
fn set_secret(field: &mut ActiveValue<Option<String>>, value: Option<String>) {
    if let Some(value) = non_blank(value) {
        *field = Set(Some(value));
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Processor secret: settings row first, then `STRIPE_SECRET_KEY`.
pub fn resolve_secret_key(config: &AppConfig, settings: Option<&SettingsModel>) -> AppResult<String> {
    settings
        .and_then(|s| non_blank(s.payment_secret_key.clone()))
        .or_else(|| config.stripe.secret_key.clone())
        .ok_or_else(|| AppError::internal("Stripe secret key missing."))
}

/// Redirect URL: explicit request value, then settings, then the site default.
pub fn resolve_redirect_url(
    requested: Option<String>,
    configured: Option<&str>,
    site_url: &str,
    default_path: &str,
) -> String {
    non_blank(requested)
        .or_else(|| non_blank(configured.map(str::to_string)))
        .unwrap_or_else(|| format!("{site_url}{default_path}"))
}

pub fn resolve_admin_email(config: &AppConfig, settings: Option<&SettingsModel>) -> Option<String> {
    settings
        .and_then(|s| non_blank(s.admin_email.clone()))
        .or_else(|| config.admin_notification_email.clone())
}

/// SMTP credentials: settings row first, then the `SMTP_*` environment.
pub fn resolve_smtp(
    config: &AppConfig,
    settings: Option<&SettingsModel>,
) -> Result<SmtpConfig, EmailError> {
    let from_settings = |pick: fn(&SettingsModel) -> Option<String>| {
        settings.and_then(|s| non_blank(pick(s)))
    };

    let host = from_settings(|s| s.smtp_host.clone()).or_else(|| config.smtp.host.clone());
    let user = from_settings(|s| s.smtp_user.clone()).or_else(|| config.smtp.user.clone());
    let pass = from_settings(|s| s.smtp_pass.clone()).or_else(|| config.smtp.pass.clone());
    let port = settings
        .and_then(|s| s.smtp_port)
        .and_then(|p| u16::try_from(p).ok())
        .or(config.smtp.port)
        .unwrap_or(DEFAULT_SMTP_PORT);

    let (Some(host), Some(user), Some(pass)) = (host, user, pass) else {
        return Err(EmailError::NotConfigured);
    };

    let from = from_settings(|s| s.sender_email.clone())
        .or_else(|| config.smtp.from.clone())
        .unwrap_or_else(|| user.clone());

    Ok(SmtpConfig {
        host,
        port,
        user,
        pass,
        from,
    })
}
