use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub about: Vec<String>,
    pub is_active: Option<bool>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub about: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
