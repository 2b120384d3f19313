use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        checkout::{CheckoutRequest, CheckoutResponse},
        emails::{SendEmailRequest, SendEmailResponse, TemplateList, UpdateTemplateRequest},
        orders::{DeleteOrdersRequest, DeletedOrders, OrderDetail, OrderList, OrderWithItems},
        payments::{
            ConfirmPaymentRequest, CreatePaymentSessionRequest, PaymentConfirmation,
            PaymentSessionResponse,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        settings::UpdateSettingsRequest,
    },
    models::{
        AdminSettings, EmailTemplate, Order, OrderItem, OrderStatus, PaymentRecord,
        PaymentStatus, Product, PublicSettings,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, checkout, emails, health, params, payments, products, settings},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        products::list_products,
        products::get_product,
        checkout::checkout,
        payments::create_session,
        payments::confirm_payment,
        payments::webhook,
        settings::public_settings,
        emails::send_email,
        admin::list_orders,
        admin::get_order,
        admin::delete_order,
        admin::bulk_delete_orders,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_templates,
        admin::update_template,
        admin::get_settings,
        admin::update_settings
    ),
    components(
        schemas(
            Product,
            Order,
            OrderItem,
            OrderStatus,
            PaymentRecord,
            PaymentStatus,
            PublicSettings,
            AdminSettings,
            EmailTemplate,
            LoginRequest,
            LoginResponse,
            CheckoutRequest,
            CheckoutResponse,
            CreatePaymentSessionRequest,
            PaymentSessionResponse,
            ConfirmPaymentRequest,
            PaymentConfirmation,
            SendEmailRequest,
            SendEmailResponse,
            UpdateTemplateRequest,
            TemplateList,
            OrderList,
            OrderWithItems,
            OrderDetail,
            DeleteOrdersRequest,
            DeletedOrders,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            UpdateSettingsRequest,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<PaymentSessionResponse>,
            ApiResponse<PaymentConfirmation>,
            ApiResponse<OrderList>,
            ApiResponse<OrderDetail>,
            ApiResponse<AdminSettings>,
            ApiResponse<PublicSettings>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Storefront product endpoints"),
        (name = "Checkout", description = "Checkout orchestrator"),
        (name = "Payments", description = "Payment sessions, confirmation and webhook"),
        (name = "Settings", description = "Public storefront settings"),
        (name = "Emails", description = "Transactional email"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
