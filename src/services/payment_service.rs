use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{
        ConfirmPaymentRequest, CreatePaymentSessionRequest, PaymentConfirmation,
        PaymentSessionResponse,
    },
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    gateway::{
        CheckoutSession, CheckoutSessionRequest, GatewayError, LineItem,
        webhook::{self, CHECKOUT_SESSION_COMPLETED, DEFAULT_TOLERANCE_SECS, Event},
    },
    models::{OrderStatus, PaymentStatus},
    response::ApiResponse,
    services::{
        email_service::{ADMIN_NOTIFICATION, CUSTOMER_RECEIPT, send_template_email},
        order_service::find_active_order,
        settings_service::{find_settings, resolve_admin_email, resolve_redirect_url, resolve_secret_key},
    },
    state::AppState,
};

const SESSION_ID_PLACEHOLDER: &str = "session_id={CHECKOUT_SESSION_ID}";

static SESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cs_[A-Za-z0-9_]+$").expect("valid session id regex"));

/// What the webhook did with a verified event.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Not a completed checkout, or no order reference on the session.
    Ignored,
    /// The referenced order does not exist; acknowledged so the processor stops retrying.
    OrderMissing,
    Reconciled(PaymentConfirmation),
}

pub async fn create_payment_session(
    state: &AppState,
    payload: CreatePaymentSessionRequest,
) -> AppResult<ApiResponse<PaymentSessionResponse>> {
    let order_id = payload
        .order_id
        .ok_or_else(|| AppError::BadRequest("Missing orderId".into()))?;
    let order = find_active_order(&state.orm, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;
    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest(format!(
            "Order is {}; only pending orders can be paid",
            order.status
        )));
    }

    let session = open_session(state, &order, payload.success_url, payload.cancel_url).await?;
    Ok(ApiResponse::ok("Payment session created", session))
}

/// Open a hosted checkout session for `order` and record it as a `created` payment.
pub async fn open_session(
    state: &AppState,
    order: &OrderModel,
    success_url: Option<String>,
    cancel_url: Option<String>,
) -> AppResult<PaymentSessionResponse> {
    let settings = find_settings(&state.orm)
        .await?
        .ok_or_else(|| AppError::internal("Settings not configured."))?;
    let secret_key = resolve_secret_key(&state.config, Some(&settings))?;

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .find_also_related(Products)
        .all(&state.orm)
        .await?;
    if rows.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }

    let currency = order.currency.to_lowercase();
    let line_items = rows
        .into_iter()
        .map(|(item, product)| {
            let (name, description) = match product {
                Some(p) => (p.name, Some(p.description).filter(|d| !d.is_empty())),
                None => ("Product".to_string(), None),
            };
            Ok(LineItem {
                name,
                description,
                unit_amount: minor_units(item.unit_price)?,
                currency: currency.clone(),
                quantity: item.quantity,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let success = resolve_redirect_url(
        success_url,
        Some(&settings.success_url),
        &state.config.site_url,
        "/payment/success",
    );
    let cancel = resolve_redirect_url(
        cancel_url,
        Some(&settings.cancel_url),
        &state.config.site_url,
        "/payment/failure",
    );

    let request = CheckoutSessionRequest {
        customer_email: order.email.clone(),
        client_reference_id: order.id.to_string(),
        line_items,
        success_url: with_session_placeholder(&success),
        cancel_url: cancel,
    };

    let session = state
        .payments
        .create_checkout_session(&secret_key, &request)
        .await?;
    let checkout_url = session
        .url
        .clone()
        .ok_or(GatewayError::MissingField("url"))?;

    let provider = Some(settings.payment_gateway.trim())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.payments.provider());
    let now = Utc::now();
    PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        provider: Set(provider.to_string()),
        status: Set(PaymentStatus::Created.as_str().into()),
        session_id: Set(session.id.clone()),
        transaction_id: Set(None),
        amount: Set(order.total_amount),
        currency: Set(order.currency.clone()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(order_id = %order.id, session_id = %session.id, "checkout session created");

    Ok(PaymentSessionResponse {
        session_id: session.id,
        checkout_url,
    })
}

/// Price in the currency's minor unit, rounded half away from zero.
pub fn minor_units(price: Decimal) -> AppResult<i64> {
    (price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::internal("Price out of range."))
}

/// Ask the processor to append the session id to the success redirect.
pub fn with_session_placeholder(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{SESSION_ID_PLACEHOLDER}")
}

pub async fn confirm_payment(
    state: &AppState,
    payload: ConfirmPaymentRequest,
) -> AppResult<ApiResponse<PaymentConfirmation>> {
    let session_id = payload
        .session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing session_id".into()))?;
    if !SESSION_ID_RE.is_match(&session_id) {
        return Err(AppError::BadRequest("Invalid session_id".into()));
    }

    let settings = find_settings(&state.orm).await?;
    let secret_key = resolve_secret_key(&state.config, settings.as_ref())?;

    let session = state
        .payments
        .retrieve_checkout_session(&secret_key, &session_id)
        .await?;
    let confirmation = reconcile(state, &session).await?;

    Ok(ApiResponse::ok("Payment confirmed", confirmation))
}

/// Bring the payment record and order in line with the processor's session.
///
/// Both updates are guarded so that a paid record or order never moves back,
/// and notifications go out only from the call that actually marks the order paid.
pub async fn reconcile(state: &AppState, session: &CheckoutSession) -> AppResult<PaymentConfirmation> {
    let order_id = session
        .order_reference()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| AppError::not_found("order reference"))?;
    let order = find_active_order(&state.orm, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;

    let paid = session.is_paid();
    let transaction_id = session.transaction_id();
    let payment_status = if paid {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Processing
    };
    let order_status = if paid {
        OrderStatus::Paid
    } else {
        OrderStatus::Pending
    };
    let now = Utc::now().fixed_offset();

    let payment_update = Payments::update_many()
        .col_expr(PaymentCol::Status, Expr::value(payment_status.as_str()))
        .col_expr(PaymentCol::TransactionId, Expr::value(transaction_id.clone()))
        .col_expr(PaymentCol::UpdatedAt, Expr::value(now))
        .filter(PaymentCol::SessionId.eq(session.id.as_str()))
        .filter(PaymentCol::Status.ne(PaymentStatus::Paid.as_str()))
        .exec(&state.orm)
        .await?;
    if payment_update.rows_affected == 0 {
        tracing::debug!(session_id = %session.id, "payment record unchanged");
    }

    let mut order_update = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(order_status.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now));
    if let Some(tx) = &transaction_id {
        order_update = order_update.col_expr(OrderCol::TransactionId, Expr::value(tx.clone()));
    }
    let order_update = order_update
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::Status.is_in([
            OrderStatus::Pending.as_str(),
            OrderStatus::Processing.as_str(),
        ]))
        .exec(&state.orm)
        .await?;

    let newly_paid = paid && order_update.rows_affected > 0;
    tracing::info!(
        order_id = %order.id,
        session_id = %session.id,
        paid,
        newly_paid,
        "payment reconciled"
    );

    // The stored transaction reference wins once the order is settled.
    let current = find_active_order(&state.orm, order.id)
        .await?
        .unwrap_or(order);

    if newly_paid {
        audit::record(
            state,
            None,
            "order_paid",
            "orders",
            serde_json::json!({ "order_id": current.id, "session_id": session.id }),
        )
        .await;
        dispatch_paid_notifications(state.clone(), current.clone());
    }

    // A guarded-out write leaves the stored state authoritative.
    let status = if current.status == OrderStatus::Paid.as_str() {
        PaymentStatus::Paid
    } else {
        payment_status
    };

    Ok(PaymentConfirmation {
        order_id: current.id,
        status,
        transaction_id: current.transaction_id.or(transaction_id),
        amount: current.total_amount,
        currency: current.currency,
        customer_email: current.email,
    })
}

/// Send the customer receipt and the admin notification in the background.
/// Failures are logged and never reach the caller.
pub fn dispatch_paid_notifications(state: AppState, order: OrderModel) {
    tokio::spawn(async move {
        let settings = match find_settings(&state.orm).await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "notification settings unavailable");
                None
            }
        };
        let data = serde_json::json!({
            "orderId": order.id.to_string(),
            "amount": format!("{:.2}", order.total_amount),
            "currency": order.currency,
        });

        if let Err(err) =
            send_template_email(&state, settings.as_ref(), CUSTOMER_RECEIPT, &order.email, &data).await
        {
            tracing::warn!(order_id = %order.id, error = %err, "customer receipt failed");
        }

        match resolve_admin_email(&state.config, settings.as_ref()) {
            Some(admin_email) => {
                if let Err(err) =
                    send_template_email(&state, settings.as_ref(), ADMIN_NOTIFICATION, &admin_email, &data)
                        .await
                {
                    tracing::warn!(order_id = %order.id, error = %err, "admin notification failed");
                }
            }
            None => tracing::warn!(order_id = %order.id, "no admin email configured"),
        }
    });
}

/// Verify a signed processor event and reconcile it if it completes a checkout.
/// Nothing is written unless the signature checks out.
pub async fn handle_webhook(
    state: &AppState,
    signature: Option<&str>,
    body: &[u8],
) -> AppResult<WebhookOutcome> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Webhook secret missing".into()))?;
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing signature".into()))?;

    webhook::verify_signature(body, signature, secret, Utc::now().timestamp(), DEFAULT_TOLERANCE_SECS)
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let event: Event = serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid event payload: {err}")))?;

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "webhook event ignored");
        return Ok(WebhookOutcome::Ignored);
    }
    let session = event
        .completed_session()
        .ok_or_else(|| AppError::BadRequest("Invalid checkout session payload".into()))?;
    if session.order_reference().is_none() {
        tracing::warn!(event_id = %event.id, session_id = %session.id, "completed session without order reference");
        return Ok(WebhookOutcome::Ignored);
    }

    match reconcile(state, &session).await {
        Ok(confirmation) => Ok(WebhookOutcome::Reconciled(confirmation)),
        Err(AppError::NotFound(what)) => {
            tracing::warn!(event_id = %event.id, session_id = %session.id, missing = %what, "webhook for unknown order");
            Ok(WebhookOutcome::OrderMissing)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_rounds_to_cents() {
        assert_eq!(minor_units(Decimal::new(24900, 2)).unwrap(), 24900);
        assert_eq!(minor_units(Decimal::new(19995, 3)).unwrap(), 2000);
        assert_eq!(minor_units(Decimal::new(5, 0)).unwrap(), 500);
    }

    #[test]
    fn placeholder_respects_existing_query() {
        assert_eq!(
            with_session_placeholder("https://shop.test/payment/success"),
            "https://shop.test/payment/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            with_session_placeholder("https://shop.test/ok?src=mail"),
            "https://shop.test/ok?src=mail&session_id={CHECKOUT_SESSION_ID}"
        );
    }
}
