use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod checkout;
pub mod doc;
pub mod emails;
pub mod health;
pub mod params;
pub mod payments;
pub mod products;
pub mod settings;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/auth", auth::router())
        .nest("/checkout", checkout::router())
        .nest("/payments", payments::router())
        .nest("/settings", settings::router())
        .nest("/emails", emails::router())
        .nest("/admin", admin::router())
}
