mod common;

use std::collections::HashMap;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use storefront_api::{
    dto::payments::ConfirmPaymentRequest,
    entity::{Orders, Payments},
    error::AppError,
    gateway::CheckoutSession,
    middleware::auth::AdminUser,
    models::{OrderStatus, PaymentStatus},
    services::{checkout_service, order_service, payment_service},
};

use tower::ServiceExt;

use common::{ADMIN_EMAIL, TestApp, checkout_form, seed_store, setup};

async fn start_checkout(app: &TestApp) -> anyhow::Result<(uuid::Uuid, String)> {
    let product_id = seed_store(&app.state.orm).await?;
    let resp = checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(2))).await?;
    let data = resp.data.expect("checkout data");
    Ok((data.order_id, data.session_id))
}

fn confirm(session_id: &str) -> ConfirmPaymentRequest {
    ConfirmPaymentRequest {
        session_id: Some(session_id.to_string()),
    }
}

#[tokio::test]
async fn paid_session_marks_order_paid_and_notifies() -> anyhow::Result<()> {
    let mut app = setup().await?;
    let (order_id, session_id) = start_checkout(&app).await?;
    app.gateway.mark_paid(&session_id, "pi_123");

    let resp = payment_service::confirm_payment(&app.state, confirm(&session_id)).await?;
    let data = resp.data.expect("confirmation");
    assert_eq!(data.order_id, order_id);
    assert_eq!(data.status, PaymentStatus::Paid);
    assert_eq!(data.transaction_id.as_deref(), Some("pi_123"));
    assert_eq!(data.amount, Decimal::new(49800, 2));
    assert_eq!(data.currency, "USD");
    assert_eq!(data.customer_email, "ada@example.com");

    let order = Orders::find_by_id(order_id).one(&app.state.orm).await?.expect("order");
    assert_eq!(order.status, OrderStatus::Paid.as_str());
    assert_eq!(order.transaction_id.as_deref(), Some("pi_123"));

    let payment = Payments::find().one(&app.state.orm).await?.expect("payment");
    assert_eq!(payment.status, PaymentStatus::Paid.as_str());
    assert_eq!(payment.transaction_id.as_deref(), Some("pi_123"));

    let mut emails = vec![app.next_email().await, app.next_email().await];
    emails.sort_by(|a, b| a.to.cmp(&b.to));
    assert_eq!(emails[0].to, "ada@example.com");
    assert_eq!(emails[0].subject, format!("Receipt for {order_id}"));
    assert_eq!(emails[0].html, format!("<p>{order_id}: 498.00 USD</p>"));
    assert_eq!(emails[1].to, ADMIN_EMAIL);
    assert_eq!(emails[1].subject, format!("New order {order_id}"));
    Ok(())
}

#[tokio::test]
async fn repeated_confirmation_is_idempotent() -> anyhow::Result<()> {
    let mut app = setup().await?;
    let (order_id, session_id) = start_checkout(&app).await?;
    app.gateway.mark_paid(&session_id, "pi_123");

    payment_service::confirm_payment(&app.state, confirm(&session_id)).await?;
    assert_eq!(app.drain_emails().await.len(), 2);

    let again = payment_service::confirm_payment(&app.state, confirm(&session_id))
        .await?
        .data
        .expect("confirmation");
    assert_eq!(again.status, PaymentStatus::Paid);
    assert_eq!(again.transaction_id.as_deref(), Some("pi_123"));

    let order = Orders::find_by_id(order_id).one(&app.state.orm).await?.expect("order");
    assert_eq!(order.status, OrderStatus::Paid.as_str());
    assert_eq!(order.transaction_id.as_deref(), Some("pi_123"));
    assert!(app.drain_emails().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn paid_order_never_reverts() -> anyhow::Result<()> {
    let mut app = setup().await?;
    let (order_id, session_id) = start_checkout(&app).await?;
    app.gateway.mark_paid(&session_id, "pi_123");
    payment_service::confirm_payment(&app.state, confirm(&session_id)).await?;
    app.drain_emails().await;

    let stale = CheckoutSession {
        id: session_id.clone(),
        payment_status: Some("unpaid".into()),
        client_reference_id: Some(order_id.to_string()),
        metadata: HashMap::new(),
        ..Default::default()
    };
    let reported = payment_service::reconcile(&app.state, &stale).await?;
    assert_eq!(reported.status, PaymentStatus::Paid);
    assert_eq!(reported.transaction_id.as_deref(), Some("pi_123"));

    let order = Orders::find_by_id(order_id).one(&app.state.orm).await?.expect("order");
    assert_eq!(order.status, OrderStatus::Paid.as_str());
    assert_eq!(order.transaction_id.as_deref(), Some("pi_123"));

    let payment = Payments::find().one(&app.state.orm).await?.expect("payment");
    assert_eq!(payment.status, PaymentStatus::Paid.as_str());
    assert_eq!(payment.transaction_id.as_deref(), Some("pi_123"));
    assert!(app.drain_emails().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn unpaid_session_keeps_order_pending() -> anyhow::Result<()> {
    let mut app = setup().await?;
    let (order_id, session_id) = start_checkout(&app).await?;

    let data = payment_service::confirm_payment(&app.state, confirm(&session_id))
        .await?
        .data
        .expect("confirmation");
    assert_eq!(data.status, PaymentStatus::Processing);
    assert_eq!(data.transaction_id, None);

    let order = Orders::find_by_id(order_id).one(&app.state.orm).await?.expect("order");
    assert_eq!(order.status, OrderStatus::Pending.as_str());
    let payment = Payments::find().one(&app.state.orm).await?.expect("payment");
    assert_eq!(payment.status, PaymentStatus::Processing.as_str());
    assert!(app.drain_emails().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn confirmation_errors_map_to_statuses() -> anyhow::Result<()> {
    let app = setup().await?;
    start_checkout(&app).await?;

    let missing = payment_service::confirm_payment(
        &app.state,
        ConfirmPaymentRequest { session_id: Some("  ".into()) },
    )
    .await
    .unwrap_err();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = payment_service::confirm_payment(&app.state, confirm("cs_unknown"))
        .await
        .unwrap_err();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    for malformed in ["../../customers/cus_123", "cs_1?expand[]=customer", "cs_1#x", "pi_123"] {
        let err = payment_service::confirm_payment(&app.state, confirm(malformed))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{malformed}");
    }
    Ok(())
}

#[tokio::test]
async fn confirm_route_rejects_path_like_session_ids() -> anyhow::Result<()> {
    let app = setup().await?;
    start_checkout(&app).await?;

    let body = serde_json::json!({ "sessionId": "../../customers/cus_123" });
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/confirm")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(json["data"]["error"], "Bad Request Invalid session_id");
    Ok(())
}

#[tokio::test]
async fn soft_deleted_order_is_not_reconciled() -> anyhow::Result<()> {
    let app = setup().await?;
    let (order_id, session_id) = start_checkout(&app).await?;
    let admin_id = common::create_user(&app.state.orm, "admin@shop.test", true).await?;
    order_service::delete_order(&app.state, &AdminUser { user_id: admin_id }, order_id).await?;
    app.gateway.mark_paid(&session_id, "pi_123");

    let err = payment_service::confirm_payment(&app.state, confirm(&session_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let order = Orders::find_by_id(order_id).one(&app.state.orm).await?.expect("order");
    assert_eq!(order.status, OrderStatus::Pending.as_str());
    Ok(())
}
