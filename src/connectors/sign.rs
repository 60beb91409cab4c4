// src/connectors/sign.rs
//! Request signing for the Backpack REST API.
//!
//! Pure string-in, string-out so it can be unit tested without any
//! network access. The exchange expects
//! `HMAC-SHA256(secret, "{ts}\n{METHOD}\n{path}\n[{json body}]")`
//! hex-encoded, with the body appended only for POST and DELETE.

use crate::error::ExchangeError;
use crate::types::Credentials;
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Everything needed to issue one authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    /// JSON body, present only for POST/DELETE.
    pub body: Option<String>,
}

/// Build the signature payload and sign it.
///
/// `body_params` must already be serialized JSON when present; GET
/// requests carry no body and sign the bare envelope.
pub fn build_signed_request(
    method: &Method,
    path: &str,
    body_json: Option<&str>,
    credentials: &Credentials,
    timestamp_ms: i64,
) -> Result<SignedRequest, ExchangeError> {
    if credentials.api_key.is_empty() || credentials.api_secret.is_empty() {
        return Err(ExchangeError::Config(
            "api key and secret are required for signed requests".to_string(),
        ));
    }

    let timestamp = timestamp_ms.to_string();
    let has_body = *method == Method::POST || *method == Method::DELETE;

    let mut payload = format!("{timestamp}\n{}\n{path}\n", method.as_str());
    if has_body {
        payload.push_str(body_json.unwrap_or("{}"));
    }

    let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
        .map_err(|e| ExchangeError::Config(format!("invalid secret key: {e}")))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let headers = vec![
        ("X-API-KEY", credentials.api_key.clone()),
        ("X-TIMESTAMP", timestamp),
        ("X-SIGNATURE", signature),
        ("Content-Type", "application/json".to_string()),
    ];

    Ok(SignedRequest {
        path: path.to_string(),
        headers,
        body: if has_body {
            Some(body_json.unwrap_or("{}").to_string())
        } else {
            None
        },
    })
}
