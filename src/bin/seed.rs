use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        admin_users::ActiveModel as AdminActive,
        app_settings::{ActiveModel as SettingsActive, Entity as AppSettings},
        email_templates::{ActiveModel as TemplateActive, Column as TemplateCol, Entity as EmailTemplates},
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
        AdminUsers,
    },
    services::{
        auth_service::hash_password,
        email_service::{ADMIN_NOTIFICATION, CUSTOMER_RECEIPT},
    },
};
use uuid::Uuid;

const PRODUCT_NAME: &str = "Aurora Desk Lamp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let admin_password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());

    let admin_id = ensure_admin(&orm, &admin_email, &admin_password).await?;
    let product_id = ensure_product(&orm).await?;
    ensure_settings(&orm, &config, product_id, &admin_email).await?;
    ensure_templates(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, Product ID: {product_id}");
    Ok(())
}

async fn ensure_admin(orm: &OrmConn, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let existing = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?;

    let user_id = match existing {
        Some(user) => user.id,
        None => {
            let user = UserActive {
                id: Set(Uuid::new_v4()),
                email: Set(email.to_string()),
                password_hash: Set(hash_password(password)?),
                created_at: Set(Utc::now().into()),
            }
            .insert(orm)
            .await?;
            user.id
        }
    };

    if AdminUsers::find_by_id(user_id).one(orm).await?.is_none() {
        AdminActive {
            user_id: Set(user_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Ensured admin {email}");
    Ok(user_id)
}

async fn ensure_product(orm: &OrmConn) -> anyhow::Result<Uuid> {
    if let Some(product) = Products::find()
        .filter(ProductCol::Name.eq(PRODUCT_NAME))
        .one(orm)
        .await?
    {
        return Ok(product.id);
    }

    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(PRODUCT_NAME.into()),
        description: Set("Dimmable LED desk lamp with a brushed aluminium arm.".into()),
        price: Set(Decimal::new(24900, 2)),
        currency: Set("USD".into()),
        image_url: Set(None),
        image_urls: Set(serde_json::json!([])),
        features: Set(serde_json::json!([
            "Five brightness levels",
            "USB-C charging port in the base",
            "Warm to cool colour temperature"
        ])),
        about: Set(serde_json::json!([
            "Designed for long evenings at the desk."
        ])),
        is_active: Set(true),
        size: Set(Some("45 cm".into())),
        color: Set(Some("Silver".into())),
        material: Set(Some("Aluminium".into())),
        brand: Set(Some("Aurora".into())),
        rating: Set(Some("4.8".into())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(orm)
    .await?;

    println!("Seeded product {PRODUCT_NAME}");
    Ok(product.id)
}

async fn ensure_settings(
    orm: &OrmConn,
    config: &AppConfig,
    product_id: Uuid,
    admin_email: &str,
) -> anyhow::Result<()> {
    if AppSettings::find().one(orm).await?.is_some() {
        return Ok(());
    }

    SettingsActive {
        id: Set(Uuid::new_v4()),
        payment_gateway: Set("stripe".into()),
        payment_public_key: Set(None),
        payment_secret_key: Set(None),
        currency: Set("USD".into()),
        success_url: Set(format!("{}/payment/success", config.site_url)),
        cancel_url: Set(format!("{}/payment/failure", config.site_url)),
        product_id: Set(Some(product_id)),
        sender_email: Set(config.smtp.from.clone()),
        admin_email: Set(Some(admin_email.to_string())),
        smtp_host: Set(None),
        smtp_user: Set(None),
        smtp_pass: Set(None),
        smtp_port: Set(None),
        website_name: Set(Some("Aurora".into())),
        logo_url: Set(None),
        favicon_url: Set(None),
        updated_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Seeded settings");
    Ok(())
}

async fn ensure_templates(orm: &OrmConn) -> anyhow::Result<()> {
    let templates = [
        (
            CUSTOMER_RECEIPT,
            "Your order {{orderId}} is confirmed",
            "<p>Thank you for your purchase.</p><p>Order <strong>{{orderId}}</strong> was paid: {{amount}} {{currency}}.</p>",
        ),
        (
            ADMIN_NOTIFICATION,
            "New paid order {{orderId}}",
            "<p>Order <strong>{{orderId}}</strong> was paid: {{amount}} {{currency}}.</p>",
        ),
    ];

    for (name, subject, html) in templates {
        let exists = EmailTemplates::find()
            .filter(TemplateCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        TemplateActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            subject: Set(subject.into()),
            html: Set(html.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded email templates");
    Ok(())
}
