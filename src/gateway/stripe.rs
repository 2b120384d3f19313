//! Stripe checkout sessions over the REST API (no SDK dependency).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use super::{CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway};

#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    api_base: String,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// `/v1/checkout/sessions/{id}` with the id encoded as one path segment.
    pub fn session_url(&self, session_id: &str) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&format!("{}/v1/checkout/sessions", self.api_base))
            .map_err(|_| GatewayError::InvalidBaseUrl(self.api_base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidBaseUrl(self.api_base.clone()))?
            .push(session_id);
        Ok(url)
    }
}

/// Session ids are opaque tokens of ASCII letters, digits and underscores.
pub fn is_session_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout_session(
        &self,
        secret_key: &str,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(secret_key, None::<&str>)
            .form(&session_form(request))
            .send()
            .await?;

        let session = parse_session(resp).await?;
        if session.url.is_none() {
            return Err(GatewayError::MissingField("url"));
        }
        tracing::debug!(session_id = %session.id, "stripe checkout session created");
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        secret_key: &str,
        session_id: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        if !is_session_id(session_id) {
            return Err(GatewayError::SessionNotFound(session_id.to_string()));
        }
        let resp = self
            .client
            .get(self.session_url(session_id)?)
            .basic_auth(secret_key, None::<&str>)
            .query(&[("expand[]", "payment_intent")])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::SessionNotFound(session_id.to_string()));
        }
        parse_session(resp).await
    }
}

/// Flatten a session request into Stripe's bracketed form encoding.
pub fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
        (
            "client_reference_id".to_string(),
            request.client_reference_id.clone(),
        ),
        (
            "metadata[order_id]".to_string(),
            request.client_reference_id.clone(),
        ),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let key = |field: &str| format!("line_items[{i}]{field}");
        form.push((key("[quantity]"), item.quantity.to_string()));
        form.push((key("[price_data][currency]"), item.currency.to_lowercase()));
        form.push((key("[price_data][unit_amount]"), item.unit_amount.to_string()));
        form.push((key("[price_data][product_data][name]"), item.name.clone()));
        if let Some(description) = item.description.as_ref().filter(|d| !d.is_empty()) {
            form.push((
                key("[price_data][product_data][description]"),
                description.clone(),
            ));
        }
    }

    form
}

async fn parse_session(resp: reqwest::Response) -> Result<CheckoutSession, GatewayError> {
    let status = resp.status();
    let body: Value = resp.json().await?;

    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_value(body).map_err(|_| GatewayError::MissingField("id"))
}
