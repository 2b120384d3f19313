use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    app_settings::Model as SettingsModel, email_templates::Model as TemplateModel,
    order_items::Model as OrderItemModel, orders::Model as OrderModel,
    payments::Model as PaymentModel, products::Model as ProductModel,
};

/// Lifecycle of an order. Reconciliation only ever produces `Pending` or `Paid`;
/// `Failed` and `Refunded` belong to admin tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Processing,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "249.00")]
    pub price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub features: Vec<String>,
    pub about: Vec<String>,
    pub is_active: bool,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub billing_address: String,
    pub country: String,
    pub status: String,
    #[schema(value_type = String, example = "498.00")]
    pub total_amount: Decimal,
    pub currency: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = String, example = "249.00")]
    pub unit_price: Decimal,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub status: String,
    pub session_id: String,
    pub transaction_id: Option<String>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Settings any storefront visitor may read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicSettings {
    pub payment_gateway: String,
    pub payment_public_key: Option<String>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub product_id: Option<Uuid>,
    pub website_name: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
}

/// Admin view. Secret fields are always blanked on the way out.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminSettings {
    #[serde(flatten)]
    pub public: PublicSettings,
    pub sender_email: Option<String>,
    pub admin_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_pass: Option<String>,
    pub payment_secret_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub html: String,
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        currency: model.currency,
        image_url: model.image_url,
        image_urls: string_list(model.image_urls),
        features: string_list(model.features),
        about: string_list(model.about),
        is_active: model.is_active,
        size: model.size,
        color: model.color,
        material: model.material,
        brand: model.brand,
        rating: model.rating,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        full_name: model.full_name,
        email: model.email,
        phone: model.phone,
        billing_address: model.billing_address,
        country: model.country,
        status: model.status,
        total_amount: model.total_amount,
        currency: model.currency,
        transaction_id: model.transaction_id,
        created_at: model.created_at.with_timezone(&Utc),
        deleted_at: model.deleted_at.map(|dt| dt.with_timezone(&Utc)),
    }
}

pub fn order_item_from_entity(model: OrderItemModel, product_name: Option<String>) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        product_name,
    }
}

pub fn payment_from_entity(model: PaymentModel) -> PaymentRecord {
    PaymentRecord {
        id: model.id,
        order_id: model.order_id,
        provider: model.provider,
        status: model.status,
        session_id: model.session_id,
        transaction_id: model.transaction_id,
        amount: model.amount,
        currency: model.currency,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn public_settings_from_entity(model: &SettingsModel) -> PublicSettings {
    PublicSettings {
        payment_gateway: model.payment_gateway.clone(),
        payment_public_key: model.payment_public_key.clone(),
        currency: model.currency.clone(),
        success_url: model.success_url.clone(),
        cancel_url: model.cancel_url.clone(),
        product_id: model.product_id,
        website_name: model.website_name.clone(),
        logo_url: model.logo_url.clone(),
        favicon_url: model.favicon_url.clone(),
    }
}

pub fn admin_settings_from_entity(model: &SettingsModel) -> AdminSettings {
    AdminSettings {
        public: public_settings_from_entity(model),
        sender_email: model.sender_email.clone(),
        admin_email: model.admin_email.clone(),
        smtp_host: model.smtp_host.clone(),
        smtp_user: model.smtp_user.clone(),
        smtp_port: model.smtp_port,
        smtp_pass: None,
        payment_secret_key: None,
    }
}

pub fn template_from_entity(model: TemplateModel) -> EmailTemplate {
    EmailTemplate {
        id: model.id,
        name: model.name,
        subject: model.subject,
        html: model.html,
    }
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}
