mod common;

use std::sync::atomic::Ordering;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use storefront_api::{
    dto::{
        payments::{ConfirmPaymentRequest, CreatePaymentSessionRequest},
        products::UpdateProductRequest,
    },
    entity::{OrderItems, Orders, Payments},
    error::AppError,
    middleware::auth::AdminUser,
    models::{OrderStatus, PaymentStatus},
    services::{checkout_service, payment_service, product_service},
};
use tower::ServiceExt;

use common::{checkout_form, count, seed_store, setup};

#[tokio::test]
async fn checkout_two_units_creates_order_item_and_session() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;

    let resp = checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(2))).await?;
    let data = resp.data.expect("checkout data");
    assert_eq!(data.session_id, "cs_test_1");
    assert_eq!(data.checkout_url, "https://checkout.test/pay/cs_test_1");

    let order = Orders::find_by_id(data.order_id)
        .one(&app.state.orm)
        .await?
        .expect("order persisted");
    assert_eq!(order.status, OrderStatus::Pending.as_str());
    assert_eq!(order.total_amount, Decimal::new(49800, 2));
    assert_eq!(order.currency, "USD");
    assert_eq!(order.email, "ada@example.com");

    let items = OrderItems::find().all(&app.state.orm).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].order_id, order.id);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].unit_price, Decimal::new(24900, 2));

    let payments = Payments::find().all(&app.state.orm).await?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].session_id, "cs_test_1");
    assert_eq!(payments[0].status, PaymentStatus::Created.as_str());
    assert_eq!(payments[0].provider, "stripe");
    assert_eq!(payments[0].amount, Decimal::new(49800, 2));

    let request = app.gateway.last_request();
    assert_eq!(request.client_reference_id, order.id.to_string());
    assert_eq!(request.customer_email, "ada@example.com");
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.line_items[0].unit_amount, 24900);
    assert_eq!(request.line_items[0].quantity, 2);
    assert_eq!(request.line_items[0].currency, "usd");
    assert_eq!(
        request.success_url,
        "https://shop.test/payment/success?session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(request.cancel_url, "https://shop.test/payment/failure");
    Ok(())
}

#[tokio::test]
async fn order_item_keeps_price_after_product_changes() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;
    let admin_id = common::create_user(&app.state.orm, "admin@shop.test", true).await?;

    checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(1))).await?;

    product_service::update_product(
        &app.state,
        &AdminUser { user_id: admin_id },
        product_id,
        UpdateProductRequest {
            price: Some(Decimal::new(30000, 2)),
            ..Default::default()
        },
    )
    .await?;

    let items = OrderItems::find().all(&app.state.orm).await?;
    assert_eq!(items[0].unit_price, Decimal::new(24900, 2));
    Ok(())
}

#[tokio::test]
async fn quantity_is_clamped_before_pricing() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;

    checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(1000))).await?;
    assert_eq!(app.gateway.last_request().line_items[0].quantity, 999);

    checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(0))).await?;
    assert_eq!(app.gateway.last_request().line_items[0].quantity, 1);

    checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(-3))).await?;
    assert_eq!(app.gateway.last_request().line_items[0].quantity, 1);

    let mut totals: Vec<Decimal> = Orders::find()
        .all(&app.state.orm)
        .await?
        .into_iter()
        .map(|o| o.total_amount)
        .collect();
    totals.sort();
    assert_eq!(
        totals,
        vec![
            Decimal::new(24900, 2),
            Decimal::new(24900, 2),
            Decimal::new(24875100, 2)
        ]
    );
    Ok(())
}

#[tokio::test]
async fn falls_back_to_configured_product() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;

    checkout_service::checkout(&app.state, checkout_form(None, None)).await?;

    let items = OrderItems::find().all(&app.state.orm).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, product_id);
    assert_eq!(items[0].quantity, 1);
    Ok(())
}

#[tokio::test]
async fn invalid_form_writes_nothing() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;

    let mut form = checkout_form(Some(product_id), Some(1));
    form.email = "nope".into();
    form.accept_terms = false;

    let err = checkout_service::checkout(&app.state, form).await.unwrap_err();
    match err {
        AppError::BadRequest(message) => {
            assert!(message.contains("email"));
            assert!(message.contains("acceptTerms"));
        }
        other => panic!("expected bad request, got {other:?}"),
    }
    assert_eq!(count::<Orders>(&app.state.orm).await, 0);
    Ok(())
}

#[tokio::test]
async fn inactive_product_needs_preview_flag() -> anyhow::Result<()> {
    let app = setup().await?;
    seed_store(&app.state.orm).await?;
    let hidden = common::seed_product(&app.state.orm, Decimal::new(1000, 2), false).await?;

    let err = checkout_service::checkout(&app.state, checkout_form(Some(hidden), Some(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(count::<Orders>(&app.state.orm).await, 0);

    let mut preview = checkout_form(Some(hidden), Some(1));
    preview.allow_inactive = true;
    checkout_service::checkout(&app.state, preview).await?;
    assert_eq!(count::<Orders>(&app.state.orm).await, 1);
    Ok(())
}

#[tokio::test]
async fn processor_failure_leaves_pending_order() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;
    app.gateway.fail_create.store(true, Ordering::SeqCst);

    let err = checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let orders = Orders::find().all(&app.state.orm).await?;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending.as_str());
    assert_eq!(count::<OrderItems>(&app.state.orm).await, 1);
    assert_eq!(count::<Payments>(&app.state.orm).await, 0);
    Ok(())
}

#[tokio::test]
async fn checkout_route_returns_camel_case_envelope() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;

    let body = serde_json::json!({
        "productId": product_id,
        "quantity": 2,
        "fullName": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": "+44 20 7946 0958",
        "billingAddress": "12 Analytical Row, London",
        "country": "GB",
        "acceptTerms": true,
        "successUrl": "https://shop.test/thanks?src=mail"
    });
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/checkout")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(json["data"]["sessionId"], "cs_test_1");
    assert_eq!(json["data"]["checkoutUrl"], "https://checkout.test/pay/cs_test_1");
    assert!(json["data"]["orderId"].is_string());

    assert_eq!(
        app.gateway.last_request().success_url,
        "https://shop.test/thanks?src=mail&session_id={CHECKOUT_SESSION_ID}"
    );
    Ok(())
}

#[tokio::test]
async fn payment_session_requires_order_id() -> anyhow::Result<()> {
    let app = setup().await?;
    seed_store(&app.state.orm).await?;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "orderId": uuid::Uuid::new_v4() }).to_string(),
                ))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn processor_error_text_stays_out_of_response() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;
    app.gateway.fail_create.store(true, Ordering::SeqCst);

    let body = serde_json::json!({
        "productId": product_id,
        "fullName": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": "+44 20 7946 0958",
        "billingAddress": "12 Analytical Row, London",
        "country": "GB",
        "acceptTerms": true
    });
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/checkout")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let text = String::from_utf8(bytes.to_vec())?;
    assert!(!text.contains("processor unavailable"), "{text}");
    assert!(text.contains("Payment processor error"));
    Ok(())
}

#[tokio::test]
async fn paid_order_gets_no_new_session() -> anyhow::Result<()> {
    let app = setup().await?;
    let product_id = seed_store(&app.state.orm).await?;
    let data = checkout_service::checkout(&app.state, checkout_form(Some(product_id), Some(1)))
        .await?
        .data
        .expect("checkout data");
    app.gateway.mark_paid(&data.session_id, "pi_paid");
    payment_service::confirm_payment(
        &app.state,
        ConfirmPaymentRequest {
            session_id: Some(data.session_id.clone()),
        },
    )
    .await?;

    let err = payment_service::create_payment_session(
        &app.state,
        CreatePaymentSessionRequest {
            order_id: Some(data.order_id),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(count::<Payments>(&app.state.orm).await, 1);
    assert_eq!(app.gateway.requests.lock().unwrap().len(), 1);
    Ok(())
}
