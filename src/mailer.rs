//! Transactional email over SMTP.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("SMTP configuration missing")]
    NotConfigured,
}

/// Resolved SMTP credentials for one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, smtp: &SmtpConfig, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Mailer backed by lettre. Settings can change between sends, so the transport is
/// built per message.
#[derive(Clone, Default)]
pub struct SmtpMailer;

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, smtp: &SmtpConfig, email: &OutgoingEmail) -> Result<(), EmailError> {
        let credentials = Credentials::new(smtp.user.clone(), smtp.pass.clone());
        // 465 is implicit TLS, anything else negotiates STARTTLS.
        let builder = if smtp.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
        };
        let transport = builder.port(smtp.port).credentials(credentials).build();

        let message = Message::builder()
            .from(
                smtp.from
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(smtp.from.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.html.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;

        transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Replace every `{{key}}` in `template` with the matching value from `data`.
/// Strings are inserted bare; other JSON values use their JSON text.
pub fn render_template(template: &str, data: &Value) -> String {
    let Some(map) = data.as_object() else {
        return template.to_string();
    };

    map.iter().fold(template.to_string(), |content, (key, value)| {
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        content.replace(&format!("{{{{{key}}}}}"), &replacement)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render_template(
            "Order {{orderId}}: {{amount}} {{currency}} (ref {{orderId}})",
            &json!({ "orderId": "abc", "amount": "498.00", "currency": "USD" }),
        );
        assert_eq!(out, "Order abc: 498.00 USD (ref abc)");
    }

    #[test]
    fn render_stringifies_non_string_values_and_keeps_unknown_keys() {
        let out = render_template(
            "{{qty}} x {{paid}} {{missing}}",
            &json!({ "qty": 2, "paid": true }),
        );
        assert_eq!(out, "2 x true {{missing}}");
    }

    #[test]
    fn render_without_object_data_is_identity() {
        assert_eq!(render_template("Hi {{name}}", &Value::Null), "Hi {{name}}");
    }
}
