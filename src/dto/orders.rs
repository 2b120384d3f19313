use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, PaymentRecord};
use crate::routes::params::Pagination;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<PaymentRecord>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderFilters {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl OrderFilters {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteOrdersRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedOrders {
    pub deleted: u64,
}
