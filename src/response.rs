//! Response normalization: JSON or plain text, with structured errors for
//! non-success statuses.

use std::fmt;

use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CallError;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Json(_) => None,
            Payload::Text(text) => Some(text),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => write!(f, "{value}"),
            Payload::Text(text) => f.write_str(text),
        }
    }
}

/// Consumes `response` and returns its decoded body.
///
/// Statuses outside 200-299 become [`CallError::Response`] carrying the body
/// decoded as JSON when possible, as text otherwise. Successful responses are
/// decoded as JSON only when `content-type` contains `application/json`.
pub async fn process_response(response: Response) -> Result<Payload, CallError> {
    let status = response.status();

    if !status.is_success() {
        // A body that cannot be read still yields a Response error, just with
        // an empty payload.
        let bytes = response.bytes().await.unwrap_or_default();
        let payload = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(String::from_utf8_lossy(&bytes).into_owned()),
        };
        debug!(status = status.as_u16(), "Non-success response");
        return Err(CallError::response(
            format!("Request failed with status {}", status.as_u16()),
            status.as_u16(),
            payload,
        ));
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if is_json {
        let bytes = response.bytes().await?;
        Ok(Payload::Json(serde_json::from_slice(&bytes)?))
    } else {
        Ok(Payload::Text(response.text().await?))
    }
}
