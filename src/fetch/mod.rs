//! Transport seam.
//!
//! [`HttpClient`] is the only thing that touches the network. The executor
//! builds a [`reqwest::Request`], hands it to [`send_with_timeout`] and never
//! inspects the connection itself, so tests can swap in their own client.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Request, Response};
use serde_json::Value;
use tracing::warn;

use crate::error::CallError;
use crate::options::HttpMethod;

/// Merges header layers in order; a later layer wins on a case-insensitive
/// name collision. `Content-Type: application/json` is always the first layer.
pub fn merge_headers<'a, I>(layers: I) -> Result<HeaderMap, CallError>
where
    I: IntoIterator<Item = &'a [(String, String)]>,
{
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in layers.into_iter().flatten() {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| CallError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| CallError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Assembles a request. A present body is sent as its JSON text.
pub fn build_request(
    method: HttpMethod,
    url: &str,
    headers: HeaderMap,
    body: Option<&Value>,
) -> Result<Request, CallError> {
    let mut req = Request::new(method.into(), url.parse()?);
    *req.headers_mut() = headers;
    if let Some(body) = body {
        *req.body_mut() = Some(body.to_string().into());
    }
    Ok(req)
}

/// Sends `req`, giving up after `timeout`.
///
/// The timer only covers the wait for the response head. When it elapses the
/// in-flight future is dropped, which aborts the underlying connection.
pub async fn send_with_timeout<C: HttpClient + ?Sized>(
    client: &C,
    req: Request,
    timeout: Duration,
) -> Result<Response, CallError> {
    match tokio::time::timeout(timeout, client.execute(req)).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(timeout = ?timeout, "Request timed out, aborting");
            Err(CallError::timeout())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn content_type_defaults_to_json() {
        let headers = merge_headers(std::iter::empty()).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let main = pairs(&[("Content-Type", "text/plain"), ("X-Api-Key", "main")]);
        let license = pairs(&[("x-api-key", "license"), ("X-Trace", "1")]);
        let headers = merge_headers([main.as_slice(), license.as_slice()]).unwrap();

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get("x-api-key").unwrap(), "license");
        assert_eq!(headers.get_all("x-api-key").iter().count(), 1);
        assert_eq!(headers.get("x-trace").unwrap(), "1");
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let bad = pairs(&[("bad header", "v")]);
        let err = merge_headers([bad.as_slice()]).unwrap_err();
        assert!(matches!(err, CallError::InvalidHeader { name, .. } if name == "bad header"));
    }

    #[test]
    fn body_is_serialized_as_json_text() {
        let body = json!({"key": "abc", "n": 2});
        let req = build_request(
            HttpMethod::Post,
            "https://api.x.com/license",
            HeaderMap::new(),
            Some(&body),
        )
        .unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        let sent = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(sent).unwrap(), body);
    }

    #[test]
    fn absent_body_sends_nothing() {
        let req = build_request(HttpMethod::Get, "https://api.x.com/", HeaderMap::new(), None)
            .unwrap();
        assert!(req.body().is_none());
    }

    struct NeverResponds;

    #[async_trait::async_trait]
    impl HttpClient for NeverResponds {
        async fn execute(&self, _req: Request) -> reqwest::Result<Response> {
            std::future::pending::<()>().await;
            unreachable!("pending future resolved")
        }
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn timeout_logs_full_duration() {
        let req = build_request(HttpMethod::Get, "https://api.x.com/", HeaderMap::new(), None)
            .unwrap();
        let err = send_with_timeout(&NeverResponds, req, Duration::from_micros(1_500))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(logs_contain("Request timed out, aborting"));
        assert!(logs_contain("timeout=1.5ms"));
    }
}
