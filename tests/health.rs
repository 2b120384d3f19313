mod common;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode},
};
use storefront_api::routes::health::health_check;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_reports_database() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let (status, response) = health_check(State(app.state.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
    Ok(())
}

#[tokio::test]
async fn health_route_is_mounted() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let response = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(json["data"]["database"], "up");
    Ok(())
}
