use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Storefront checkout form plus the selected product and quantity.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Falls back to the product configured in settings.
    pub product_id: Option<Uuid>,
    /// Clamped to 1..=999.
    pub quantity: Option<i64>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub accept_terms: bool,
    /// Admin preview of an inactive product.
    #[serde(default)]
    pub allow_inactive: bool,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub session_id: String,
    pub checkout_url: String,
}
