//! Signed webhook events.
//!
//! The processor signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `stripe-signature: t=<unix>,v1=<hex>[,v1=<hex>...]`. The body must not be
//! parsed before the signature checks out.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use super::CheckoutSession;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Maximum age of a signed event, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("invalid signature timestamp")]
    InvalidTimestamp,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("no signature matches the payload")]
    Mismatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl Event {
    /// The completed checkout session carried by this event, if it is one.
    pub fn completed_session(&self) -> Option<CheckoutSession> {
        if self.event_type != CHECKOUT_SESSION_COMPLETED {
            return None;
        }
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    let mac = signed_mac(payload, timestamp, secret)?;
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

/// Build a header the way the processor would. Used by tests and local tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let ts = timestamp.to_string();
    let signature = signed_mac(payload, &ts, secret)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={ts},v1={signature}")
}

fn signed_mac(payload: &[u8], timestamp: &str, secret: &str) -> Result<Hmac<Sha256>, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
