use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{Product, product_from_entity},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

/// Look up a product, hiding inactive ones unless asked not to.
pub async fn find_product(
    orm: &OrmConn,
    id: Uuid,
    include_inactive: bool,
) -> AppResult<Option<ProductModel>> {
    let mut finder = Products::find_by_id(id);
    if !include_inactive {
        finder = finder.filter(Column::IsActive.eq(true));
    }
    Ok(finder.one(orm).await?)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut finder = Products::find().order_by_desc(Column::CreatedAt);
    if !query.include_inactive {
        finder = finder.filter(Column::IsActive.eq(true));
    }

    let items: Vec<Product> = finder
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let total = items.len() as i64;
    let meta = Meta::total(total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(
    state: &AppState,
    id: Uuid,
    include_inactive: bool,
) -> AppResult<ApiResponse<Product>> {
    let product = find_product(&state.orm, id, include_inactive)
        .await?
        .ok_or_else(|| AppError::not_found("product"))?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    admin: &AdminUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if payload.price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    let now = Utc::now();
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        currency: Set(payload.currency.unwrap_or_else(|| "USD".into())),
        image_url: Set(payload.image_url),
        image_urls: Set(serde_json::json!(payload.image_urls)),
        features: Set(serde_json::json!(payload.features)),
        about: Set(serde_json::json!(payload.about)),
        is_active: Set(payload.is_active.unwrap_or(true)),
        size: Set(payload.size),
        color: Set(payload.color),
        material: Set(payload.material),
        brand: Set(payload.brand),
        rating: Set(payload.rating),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let product = active.insert(&state.orm).await?;

    audit::record(
        state,
        Some(admin.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::ok("Product created", product_from_entity(product)))
}

pub async fn update_product(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("product"))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        if price.is_sign_negative() {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(currency) = payload.currency {
        active.currency = Set(currency);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url).filter(|u| !u.is_empty()));
    }
    if let Some(image_urls) = payload.image_urls {
        active.image_urls = Set(serde_json::json!(image_urls));
    }
    if let Some(features) = payload.features {
        active.features = Set(serde_json::json!(features));
    }
    if let Some(about) = payload.about {
        active.about = Set(serde_json::json!(about));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(size) = payload.size {
        active.size = Set(Some(size));
    }
    if let Some(color) = payload.color {
        active.color = Set(Some(color));
    }
    if let Some(material) = payload.material {
        active.material = Set(Some(material));
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(Some(brand));
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(Some(rating));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(admin.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::ok("Updated", product_from_entity(product)))
}

pub async fn delete_product(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    // Ordered products keep their row so order items stay resolvable.
    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::BadRequest(
            "product has orders; deactivate it instead".into(),
        ));
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("product"));
    }

    audit::record(
        state,
        Some(admin.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Deleted", serde_json::json!({})))
}
