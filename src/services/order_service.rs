use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::orders::{DeletedOrders, OrderDetail, OrderFilters, OrderList, OrderWithItems},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{OrderItem, OrderStatus, order_from_entity, order_item_from_entity, payment_from_entity},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Customer fields captured at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub billing_address: String,
    pub country: String,
    pub total_amount: Decimal,
    pub currency: String,
}

pub async fn create_order(orm: &OrmConn, new_order: NewOrder) -> AppResult<OrderModel> {
    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        full_name: Set(new_order.full_name),
        email: Set(new_order.email),
        phone: Set(new_order.phone),
        billing_address: Set(new_order.billing_address),
        country: Set(new_order.country),
        status: Set(OrderStatus::Pending.as_str().into()),
        total_amount: Set(new_order.total_amount),
        currency: Set(new_order.currency),
        transaction_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(orm)
    .await?;

    Ok(order)
}

/// Record one line of an order. `unit_price` is the price at order time and is
/// never re-read from the product afterwards.
pub async fn create_order_item(
    orm: &OrmConn,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
) -> AppResult<OrderItemModel> {
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be positive".into()));
    }

    let item = OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    Ok(item)
}

/// An order that has not been soft-deleted.
pub async fn find_active_order(orm: &OrmConn, id: Uuid) -> AppResult<Option<OrderModel>> {
    Ok(Orders::find_by_id(id)
        .filter(OrderCol::DeletedAt.is_null())
        .one(orm)
        .await?)
}

/// Items of each order, with the product name joined in.
pub async fn items_for_orders(
    orm: &OrmConn,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(OrderItemCol::CreatedAt)
        .find_also_related(Products)
        .all(orm)
        .await?;

    for (item, product) in rows {
        let name = product.map(|p| p.name);
        grouped
            .entry(item.order_id)
            .or_default()
            .push(order_item_from_entity(item, name));
    }

    Ok(grouped)
}

pub async fn list_orders(
    state: &AppState,
    _admin: &AdminUser,
    filters: OrderFilters,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = filters.pagination().normalize();
    let condition = filter_condition(&filters)?;

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = items_for_orders(&state.orm, &ids).await?;

    let data = orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: items.remove(&order.id).unwrap_or_default(),
            order: order_from_entity(order),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: data },
        Some(meta),
    ))
}

fn filter_condition(filters: &OrderFilters) -> AppResult<Condition> {
    let mut condition = Condition::all().add(OrderCol::DeletedAt.is_null());

    if let Some(status) = filters.status.as_ref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(email) = filters.email.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(contains_ci(OrderCol::Email, email));
    }
    if let Some(name) = filters.full_name.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(contains_ci(OrderCol::FullName, name));
    }
    if let Some(start) = filters.start_date {
        condition = condition.add(OrderCol::CreatedAt.gte(start.fixed_offset()));
    }
    if let Some(end) = filters.end_date {
        condition = condition.add(OrderCol::CreatedAt.lte(end.fixed_offset()));
    }

    Ok(condition)
}

// Case-insensitive substring match that works on every backend.
fn contains_ci(col: OrderCol, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", needle.to_lowercase()))
}

pub async fn get_order(
    state: &AppState,
    _admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = find_active_order(&state.orm, id)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;

    let items = items_for_orders(&state.orm, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();

    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_desc(PaymentCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect();

    Ok(ApiResponse::ok(
        "Order found",
        OrderDetail {
            order: order_from_entity(order),
            items,
            payments,
        },
    ))
}

pub async fn delete_order(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedOrders>> {
    let deleted = soft_delete(&state.orm, &[id]).await?;
    if deleted == 0 {
        return Err(AppError::not_found("order"));
    }

    audit::record(
        state,
        Some(admin.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Order deleted", DeletedOrders { deleted }))
}

pub async fn delete_orders(
    state: &AppState,
    admin: &AdminUser,
    ids: Vec<Uuid>,
) -> AppResult<ApiResponse<DeletedOrders>> {
    let deleted = soft_delete(&state.orm, &ids).await?;

    if deleted > 0 {
        audit::record(
            state,
            Some(admin.user_id),
            "order_bulk_delete",
            "orders",
            serde_json::json!({ "order_ids": ids, "deleted": deleted }),
        )
        .await;
    }

    Ok(ApiResponse::ok("Orders deleted", DeletedOrders { deleted }))
}

/// Stamp `deleted_at` on active orders; already-deleted rows are left alone.
async fn soft_delete(orm: &OrmConn, ids: &[Uuid]) -> AppResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let result = Orders::update_many()
        .col_expr(OrderCol::DeletedAt, Expr::value(Some(now.fixed_offset())))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now.fixed_offset()))
        .filter(OrderCol::Id.is_in(ids.iter().copied()))
        .filter(OrderCol::DeletedAt.is_null())
        .exec(orm)
        .await?;

    Ok(result.rows_affected)
}
