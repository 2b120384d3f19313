use sea_orm::entity::prelude::*;

/// Singleton settings row. `payment_secret_key` and `smtp_pass` never leave the server.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "app_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub payment_gateway: String,
    pub payment_public_key: Option<String>,
    pub payment_secret_key: Option<String>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
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
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
