use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Partial settings update. Absent fields are left untouched; an empty string
/// clears an optional field. Secrets are write-only and ignored when blank.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub payment_gateway: Option<String>,
    pub payment_public_key: Option<String>,
    pub payment_secret_key: Option<String>,
    pub currency: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub product_id: Option<Uuid>,
    pub sender_email: Option<String>,
    pub admin_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub smtp_port: Option<i32>,
    pub website_name: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
}
