use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::{AppError, AppResult},
    response::ApiResponse,
    services::{
        order_service::{self, NewOrder},
        payment_service,
        product_service::find_product,
        settings_service::find_settings,
    },
    state::AppState,
};

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 999;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\s-]{7,}$").expect("valid phone regex"));

/// Missing quantities mean one; anything else is pulled into `1..=999`.
pub fn clamp_quantity(quantity: Option<i64>) -> i32 {
    quantity.unwrap_or(MIN_QUANTITY).clamp(MIN_QUANTITY, MAX_QUANTITY) as i32
}

/// Names of the checkout fields that fail validation, in form order.
pub fn invalid_fields(payload: &CheckoutRequest) -> Vec<&'static str> {
    let mut invalid = Vec::new();
    if payload.full_name.trim().chars().count() < 2 {
        invalid.push("fullName");
    }
    if !EMAIL_RE.is_match(payload.email.trim()) {
        invalid.push("email");
    }
    if !PHONE_RE.is_match(payload.phone.trim()) {
        invalid.push("phone");
    }
    if payload.billing_address.trim().chars().count() < 10 {
        invalid.push("billingAddress");
    }
    if payload.country.trim().is_empty() {
        invalid.push("country");
    }
    if !payload.accept_terms {
        invalid.push("acceptTerms");
    }
    invalid
}

pub fn validate_checkout(payload: &CheckoutRequest) -> AppResult<()> {
    let invalid = invalid_fields(payload);
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid checkout fields: {}",
            invalid.join(", ")
        )))
    }
}

/// Create a pending order for one product and hand the buyer to the processor.
///
/// The writes are sequential and not wrapped in a transaction: if the session
/// cannot be opened the pending order and its item stay behind.
pub async fn checkout(
    state: &AppState,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    validate_checkout(&payload)?;

    let settings = find_settings(&state.orm).await?;
    let product_id = payload
        .product_id
        .or_else(|| settings.as_ref().and_then(|s| s.product_id))
        .ok_or_else(|| AppError::BadRequest("No product selected".into()))?;
    let product = find_product(&state.orm, product_id, payload.allow_inactive)
        .await?
        .ok_or_else(|| AppError::not_found("product"))?;

    let quantity = clamp_quantity(payload.quantity);
    let total = product.price * Decimal::from(quantity);

    let order = order_service::create_order(
        &state.orm,
        NewOrder {
            full_name: payload.full_name.trim().to_string(),
            email: payload.email.trim().to_string(),
            phone: payload.phone.trim().to_string(),
            billing_address: payload.billing_address.trim().to_string(),
            country: payload.country.trim().to_string(),
            total_amount: total,
            currency: product.currency.clone(),
        },
    )
    .await?;
    order_service::create_order_item(&state.orm, order.id, product.id, quantity, product.price)
        .await?;

    tracing::info!(order_id = %order.id, product_id = %product.id, quantity, %total, "order created");

    let session = match payment_service::open_session(
        state,
        &order,
        payload.success_url,
        payload.cancel_url,
    )
    .await
    {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(order_id = %order.id, error = %err, "payment session failed; order left pending");
            return Err(err);
        }
    };

    Ok(ApiResponse::ok(
        "Checkout started",
        CheckoutResponse {
            order_id: order.id,
            session_id: session.session_id,
            checkout_url: session.checkout_url,
        },
    ))
}
