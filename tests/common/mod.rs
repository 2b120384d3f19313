#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, EntityTrait, Schema, Set,
};
use storefront_api::{
    config::{AppConfig, SmtpEnv, StripeEnv},
    db::OrmConn,
    entity::{
        self, admin_users::ActiveModel as AdminActive, app_settings::ActiveModel as SettingsActive,
        email_templates::ActiveModel as TemplateActive, products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    gateway::{
        CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway, PaymentIntentRef,
    },
    mailer::{EmailError, Mailer, OutgoingEmail, SmtpConfig},
    routes::{create_api_router, health},
    services::{
        auth_service::issue_token,
        email_service::{ADMIN_NOTIFICATION, CUSTOMER_RECEIPT},
    },
    state::AppState,
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const ADMIN_EMAIL: &str = "owner@shop.test";

/// Payment processor double. Sessions live in memory and start unpaid.
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    pub requests: Mutex<Vec<CheckoutSessionRequest>>,
    pub fail_create: AtomicBool,
    counter: AtomicUsize,
}

impl FakeGateway {
    pub fn mark_paid(&self, session_id: &str, transaction_id: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(session_id).expect("known session");
        session.payment_status = Some("paid".into());
        session.payment_intent = Some(PaymentIntentRef::Expanded {
            id: transaction_id.into(),
        });
    }

    pub fn session(&self, session_id: &str) -> CheckoutSession {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .expect("known session")
    }

    pub fn last_request(&self) -> CheckoutSessionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a session request")
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout_session(
        &self,
        _secret_key: &str,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 500,
                message: "processor unavailable".into(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), request.client_reference_id.clone());
        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.test/pay/{id}")),
            payment_status: Some("unpaid".into()),
            client_reference_id: Some(request.client_reference_id.clone()),
            metadata,
            payment_intent: None,
        };
        self.sessions.lock().unwrap().insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        _secret_key: &str,
        session_id: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))
    }
}

/// Mailer double that forwards every message to a channel.
pub struct FakeMailer {
    tx: mpsc::UnboundedSender<OutgoingEmail>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, _smtp: &SmtpConfig, email: &OutgoingEmail) -> Result<(), EmailError> {
        let _ = self.tx.send(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub outbox: mpsc::UnboundedReceiver<OutgoingEmail>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", axum::routing::get(health::health_check))
            .nest("/api", create_api_router())
            .with_state(self.state.clone())
    }

    /// Wait for the next email sent by a background task.
    pub async fn next_email(&mut self) -> OutgoingEmail {
        tokio::time::timeout(Duration::from_secs(5), self.outbox.recv())
            .await
            .expect("email within timeout")
            .expect("mailer channel open")
    }

    /// Give spawned tasks a chance to run, then drain whatever they sent.
    pub async fn drain_emails(&mut self) -> Vec<OutgoingEmail> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut sent = Vec::new();
        while let Ok(email) = self.outbox.try_recv() {
            sent.push(email);
        }
        sent
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        site_url: "https://shop.test".into(),
        http_timeout_secs: 5,
        stripe: StripeEnv {
            api_base: "http://stripe.invalid".into(),
            secret_key: Some("sk_test_env".into()),
            webhook_secret: Some(WEBHOOK_SECRET.into()),
        },
        smtp: SmtpEnv {
            host: Some("smtp.test".into()),
            user: Some("mailer@shop.test".into()),
            pass: Some("smtp-pass".into()),
            port: Some(587),
            from: None,
        },
        admin_notification_email: None,
    }
}

pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with(test_config()).await
}

pub async fn setup_with(config: AppConfig) -> anyhow::Result<TestApp> {
    let orm = sqlite_conn().await?;
    let gateway = Arc::new(FakeGateway::default());
    let (tx, outbox) = mpsc::unbounded_channel();
    let state = AppState::new(orm, config, gateway.clone(), Arc::new(FakeMailer { tx }));
    Ok(TestApp {
        state,
        gateway,
        outbox,
    })
}

async fn sqlite_conn() -> anyhow::Result<OrmConn> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;

    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    let tables = [
        schema.create_table_from_entity(entity::Users),
        schema.create_table_from_entity(entity::AdminUsers),
        schema.create_table_from_entity(entity::Products),
        schema.create_table_from_entity(entity::Orders),
        schema.create_table_from_entity(entity::OrderItems),
        schema.create_table_from_entity(entity::Payments),
        schema.create_table_from_entity(entity::AppSettings),
        schema.create_table_from_entity(entity::EmailTemplates),
        schema.create_table_from_entity(entity::AuditLogs),
    ];
    for table in tables {
        orm.execute(backend.build(&table)).await?;
    }
    Ok(orm)
}

pub async fn seed_product(orm: &OrmConn, price: Decimal, is_active: bool) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Aurora Desk Lamp".into()),
        description: Set("Dimmable LED desk lamp".into()),
        price: Set(price),
        currency: Set("USD".into()),
        image_url: Set(None),
        image_urls: Set(serde_json::json!([])),
        features: Set(serde_json::json!(["Five brightness levels"])),
        about: Set(serde_json::json!([])),
        is_active: Set(is_active),
        size: Set(None),
        color: Set(None),
        material: Set(None),
        brand: Set(None),
        rating: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(orm)
    .await?;
    Ok(product.id)
}

pub async fn seed_settings(orm: &OrmConn, product_id: Option<Uuid>) -> anyhow::Result<()> {
    SettingsActive {
        id: Set(Uuid::new_v4()),
        payment_gateway: Set("stripe".into()),
        payment_public_key: Set(Some("pk_test_public".into())),
        payment_secret_key: Set(Some("sk_test_settings".into())),
        currency: Set("USD".into()),
        success_url: Set("https://shop.test/payment/success".into()),
        cancel_url: Set("https://shop.test/payment/failure".into()),
        product_id: Set(product_id),
        sender_email: Set(Some("shop@shop.test".into())),
        admin_email: Set(Some(ADMIN_EMAIL.into())),
        smtp_host: Set(Some("smtp.shop.test".into())),
        smtp_user: Set(Some("shop@shop.test".into())),
        smtp_pass: Set(Some("original-smtp-pass".into())),
        smtp_port: Set(Some(465)),
        website_name: Set(Some("Aurora".into())),
        logo_url: Set(None),
        favicon_url: Set(None),
        updated_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(())
}

pub async fn seed_templates(orm: &OrmConn) -> anyhow::Result<()> {
    for (name, subject) in [
        (CUSTOMER_RECEIPT, "Receipt for {{orderId}}"),
        (ADMIN_NOTIFICATION, "New order {{orderId}}"),
    ] {
        TemplateActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            subject: Set(subject.into()),
            html: Set("<p>{{orderId}}: {{amount}} {{currency}}</p>".into()),
        }
        .insert(orm)
        .await?;
    }
    Ok(())
}

/// Product, settings and templates: everything a checkout needs.
pub async fn seed_store(orm: &OrmConn) -> anyhow::Result<Uuid> {
    let product_id = seed_product(orm, Decimal::new(24900, 2), true).await?;
    seed_settings(orm, Some(product_id)).await?;
    seed_templates(orm).await?;
    Ok(product_id)
}

pub async fn create_user(orm: &OrmConn, email: &str, admin: bool) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.into()),
        password_hash: Set("not-a-real-hash".into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    if admin {
        AdminActive {
            user_id: Set(user.id),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }
    Ok(user.id)
}

pub fn bearer(user_id: Uuid) -> String {
    let token = issue_token(user_id, JWT_SECRET).expect("token");
    format!("Bearer {token}")
}

pub async fn count<E>(orm: &OrmConn) -> u64
where
    E: EntityTrait,
    E::Model: Sync,
{
    use sea_orm::PaginatorTrait;
    E::find().count(orm).await.expect("count")
}

pub fn checkout_form(product_id: Option<Uuid>, quantity: Option<i64>) -> storefront_api::dto::checkout::CheckoutRequest {
    storefront_api::dto::checkout::CheckoutRequest {
        product_id,
        quantity,
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "+44 20 7946 0958".into(),
        billing_address: "12 Analytical Row, London".into(),
        country: "GB".into(),
        accept_terms: true,
        ..Default::default()
    }
}
