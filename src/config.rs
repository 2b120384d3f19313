use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Public origin of the storefront, used for default payment redirect URLs.
    pub site_url: String,
    pub http_timeout_secs: u64,
    pub stripe: StripeEnv,
    pub smtp: SmtpEnv,
    pub admin_notification_email: Option<String>,
}

/// Fallback processor credentials, used when the settings row leaves them blank.
#[derive(Debug, Clone, Default)]
pub struct StripeEnv {
    pub api_base: String,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Fallback SMTP configuration.
#[derive(Debug, Clone, Default)]
pub struct SmtpEnv {
    pub host: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub port: Option<u16>,
    pub from: Option<String>,
}

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let site_url = optional("SITE_URL").unwrap_or_else(|| format!("http://{host}:{port}"));
        let http_timeout_secs = optional("HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let stripe = StripeEnv {
            api_base: optional("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
            secret_key: optional("STRIPE_SECRET_KEY"),
            webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
        };

        let smtp = SmtpEnv {
            host: optional("SMTP_HOST"),
            user: optional("SMTP_USER"),
            pass: optional("SMTP_PASS"),
            port: optional("SMTP_PORT").and_then(|p| p.parse::<u16>().ok()),
            from: optional("SMTP_FROM"),
        };

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            site_url: site_url.trim_end_matches('/').to_string(),
            http_timeout_secs,
            stripe,
            smtp,
            admin_notification_email: optional("ADMIN_NOTIFICATION_EMAIL"),
        })
    }
}

// Empty variables count as unset.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
