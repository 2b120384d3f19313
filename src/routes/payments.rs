use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};

use crate::{
    dto::payments::{
        ConfirmPaymentRequest, CreatePaymentSessionRequest, PaymentConfirmation,
        PaymentSessionResponse,
    },
    error::AppResult,
    gateway::webhook::SIGNATURE_HEADER,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/confirm", post(confirm_payment))
        .route("/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/api/payments/session",
    request_body = CreatePaymentSessionRequest,
    responses(
        (status = 200, description = "Hosted checkout session", body = ApiResponse<PaymentSessionResponse>),
        (status = 400, description = "Missing orderId"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Settings or secret key missing"),
    ),
    tag = "Payments"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentSessionRequest>,
) -> AppResult<Json<ApiResponse<PaymentSessionResponse>>> {
    let resp = payment_service::create_payment_session(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Reconciled payment", body = ApiResponse<PaymentConfirmation>),
        (status = 400, description = "Missing session_id"),
        (status = 404, description = "Session or order not found"),
    ),
    tag = "Payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentConfirmation>>> {
    let resp = payment_service::confirm_payment(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, description = "Raw signed event body"),
    params(
        ("stripe-signature" = String, Header, description = "t=<unix>,v1=<hex>"),
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = String),
        (status = 400, description = "Missing or invalid signature", body = String),
        (status = 500, description = "Reconciliation failed", body = String),
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match payment_service::handle_webhook(&state, signature, &body).await {
        Ok(_) => (StatusCode::OK, "ok".to_string()),
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(error = ?err, "webhook processing failed");
            } else {
                tracing::warn!(error = %err, "webhook rejected");
            }
            (status, format!("Webhook error: {}", err.public_message()))
        }
    }
}
