use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::AppResult,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created; follow checkoutUrl to pay", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid checkout form"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Payment processor or configuration error"),
    ),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = checkout_service::checkout(&state, payload).await?;
    Ok(Json(resp))
}
