use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SendEmailRequest {
    pub template: Option<String>,
    /// Defaults to the admin email from settings.
    pub to: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendEmailResponse {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTemplateRequest {
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateList {
    pub items: Vec<crate::models::EmailTemplate>,
}
