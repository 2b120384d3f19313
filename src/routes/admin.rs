use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        emails::{TemplateList, UpdateTemplateRequest},
        orders::{DeleteOrdersRequest, DeletedOrders, OrderDetail, OrderFilters, OrderList},
        products::{CreateProductRequest, UpdateProductRequest},
        settings::UpdateSettingsRequest,
    },
    error::AppResult,
    middleware::auth::AdminUser,
    models::{AdminSettings, EmailTemplate, Product},
    response::ApiResponse,
    services::{email_service, order_service, product_service, settings_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/bulk-delete", post(bulk_delete_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
        .route("/products", post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/email-templates", get(list_templates))
        .route("/email-templates/{name}", put(update_template))
        .route("/settings", get(get_settings).put(update_settings))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("email" = Option<String>, Query, description = "Case-insensitive email substring"),
        ("full_name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("start_date" = Option<String>, Query, description = "Created at or after (RFC 3339)"),
        ("end_date" = Option<String>, Query, description = "Created at or before (RFC 3339)")
    ),
    responses(
        (status = 200, description = "Active orders, newest first", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(filters): Query<OrderFilters>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &admin, filters).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items and payments", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order soft-deleted", body = ApiResponse<DeletedOrders>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletedOrders>>> {
    let resp = order_service::delete_order(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/bulk-delete",
    request_body = DeleteOrdersRequest,
    responses(
        (status = 200, description = "Orders soft-deleted", body = ApiResponse<DeletedOrders>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn bulk_delete_orders(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<DeleteOrdersRequest>,
) -> AppResult<Json<ApiResponse<DeletedOrders>>> {
    let resp = order_service::delete_orders(&state, &admin, payload.ids).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state, &admin, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 400, description = "Product has orders"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/email-templates",
    responses(
        (status = 200, description = "Email templates by name", body = ApiResponse<TemplateList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<TemplateList>>> {
    let resp = email_service::list_templates(&state, &admin).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/email-templates/{name}",
    params(
        ("name" = String, Path, description = "Template name, e.g. customer_receipt")
    ),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Updated template", body = ApiResponse<EmailTemplate>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> AppResult<Json<ApiResponse<EmailTemplate>>> {
    let resp = email_service::update_template(&state, &admin, &name, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "Settings with secrets blanked", body = ApiResponse<AdminSettings>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Settings not configured"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<AdminSettings>>> {
    let resp = settings_service::admin_settings(&state, &admin).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Saved settings with secrets blanked", body = ApiResponse<AdminSettings>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> AppResult<Json<ApiResponse<AdminSettings>>> {
    let resp = settings_service::update_settings(&state, &admin, payload).await?;
    Ok(Json(resp))
}
