use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::PaymentStatus;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionRequest {
    pub order_id: Option<Uuid>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionResponse {
    pub session_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub customer_email: String,
}
