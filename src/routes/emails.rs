use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::emails::{SendEmailRequest, SendEmailResponse},
    error::AppResult,
    response::ApiResponse,
    services::email_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/send", post(send_email))
}

#[utoipa::path(
    post,
    path = "/api/emails/send",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Email sent", body = ApiResponse<SendEmailResponse>),
        (status = 400, description = "Missing template"),
        (status = 404, description = "Template not found"),
        (status = 500, description = "SMTP not configured or delivery failed"),
    ),
    tag = "Emails"
)]
pub async fn send_email(
    State(state): State<AppState>,
    Json(payload): Json<SendEmailRequest>,
) -> AppResult<Json<ApiResponse<SendEmailResponse>>> {
    let resp = email_service::send_email(&state, payload).await?;
    Ok(Json(resp))
}
