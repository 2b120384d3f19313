//! Payment processor seam.
//!
//! The rest of the crate talks to the processor through [`PaymentGateway`], so the
//! checkout and reconciliation flows can run against a fake in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod stripe;
pub mod webhook;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to payment processor failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("checkout session {0} not found")]
    SessionNotFound(String),

    #[error("payment processor response missing {0}")]
    MissingField(&'static str),

    #[error("invalid payment processor base url {0}")]
    InvalidBaseUrl(String),
}

/// One priced line on the hosted checkout page. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub currency: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub client_reference_id: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// The processor's view of a checkout session, as far as reconciliation cares.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub payment_intent: Option<PaymentIntentRef>,
}

/// `payment_intent` arrives as a bare id, or as an object when expanded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PaymentIntentRef {
    Id(String),
    Expanded { id: String },
}

impl CheckoutSession {
    /// Order id the session was opened for.
    pub fn order_reference(&self) -> Option<&str> {
        self.client_reference_id
            .as_deref()
            .or_else(|| self.metadata.get("order_id").map(String::as_str))
            .filter(|id| !id.is_empty())
    }

    pub fn transaction_id(&self) -> Option<String> {
        match &self.payment_intent {
            Some(PaymentIntentRef::Id(id)) => Some(id.clone()),
            Some(PaymentIntentRef::Expanded { id }) => Some(id.clone()),
            None => None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Name stored on payment records, e.g. `stripe`.
    fn provider(&self) -> &'static str;

    async fn create_checkout_session(
        &self,
        secret_key: &str,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    async fn retrieve_checkout_session(
        &self,
        secret_key: &str,
        session_id: &str,
    ) -> Result<CheckoutSession, GatewayError>;
}
