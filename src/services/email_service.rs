use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;

use crate::{
    audit,
    dto::emails::{SendEmailRequest, SendEmailResponse, TemplateList, UpdateTemplateRequest},
    entity::{
        app_settings::Model as SettingsModel,
        email_templates::{ActiveModel as TemplateActive, Column, Entity as EmailTemplates},
    },
    error::{AppError, AppResult},
    mailer::{OutgoingEmail, render_template},
    middleware::auth::AdminUser,
    models::{EmailTemplate, template_from_entity},
    response::ApiResponse,
    services::settings_service::{find_settings, resolve_admin_email, resolve_smtp},
    state::AppState,
};

pub const CUSTOMER_RECEIPT: &str = "customer_receipt";
pub const ADMIN_NOTIFICATION: &str = "admin_notification";

pub async fn send_email(
    state: &AppState,
    payload: SendEmailRequest,
) -> AppResult<ApiResponse<SendEmailResponse>> {
    let template = payload
        .template
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing template".into()))?;

    let settings = find_settings(&state.orm).await?;
    let to = payload
        .to
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| resolve_admin_email(&state.config, settings.as_ref()))
        .ok_or_else(|| AppError::internal("Recipient email missing."))?;

    send_template_email(state, settings.as_ref(), &template, &to, &payload.data).await?;

    Ok(ApiResponse::ok(
        "Email sent",
        SendEmailResponse {
            status: "sent".into(),
        },
    ))
}

/// Render the named template with `data` and deliver it to `to`.
pub async fn send_template_email(
    state: &AppState,
    settings: Option<&SettingsModel>,
    template: &str,
    to: &str,
    data: &Value,
) -> AppResult<()> {
    let template = EmailTemplates::find()
        .filter(Column::Name.eq(template))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(format!("email template {template}")))?;

    let smtp = resolve_smtp(&state.config, settings)?;
    let email = OutgoingEmail {
        to: to.to_string(),
        subject: render_template(&template.subject, data),
        html: render_template(&template.html, data),
    };

    state.mailer.send(&smtp, &email).await?;
    tracing::debug!(template = %template.name, to, "template email delivered");
    Ok(())
}

pub async fn list_templates(
    state: &AppState,
    _admin: &AdminUser,
) -> AppResult<ApiResponse<TemplateList>> {
    let items: Vec<EmailTemplate> = EmailTemplates::find()
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(template_from_entity)
        .collect();

    Ok(ApiResponse::ok("Email templates", TemplateList { items }))
}

pub async fn update_template(
    state: &AppState,
    admin: &AdminUser,
    name: &str,
    payload: UpdateTemplateRequest,
) -> AppResult<ApiResponse<EmailTemplate>> {
    if payload.subject.trim().is_empty() {
        return Err(AppError::BadRequest("subject is required".into()));
    }

    let existing = EmailTemplates::find()
        .filter(Column::Name.eq(name))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(format!("email template {name}")))?;

    let mut active: TemplateActive = existing.into();
    active.subject = Set(payload.subject);
    active.html = Set(payload.html);
    let saved = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(admin.user_id),
        "email_template_update",
        "email_templates",
        serde_json::json!({ "name": saved.name }),
    )
    .await;

    Ok(ApiResponse::ok("Email template updated", template_from_entity(saved)))
}
