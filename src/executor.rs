//! Request execution: an optional license gate followed by the main call.

use reqwest::Response;
use tracing::{Instrument, Span, debug, field, info, info_span, warn};

use crate::error::CallError;
use crate::fetch::{BasicClient, HttpClient, build_request, merge_headers, send_with_timeout};
use crate::options::{CallOptions, DebugFlags, HttpMethod, LicenseValidation, RequestParams};
use crate::response::{Payload, process_response};
use crate::url_builder::build_url;

/// Target for the output switched on by [`DebugFlags`].
pub const DEBUG_TARGET: &str = "call_api::debug";

/// Performs the call described by `options` with a fresh [`BasicClient`].
pub async fn call_api(options: CallOptions) -> Result<Payload, CallError> {
    let client = BasicClient::new();
    call_api_with(&client, options).await
}

/// Performs the call described by `options` over `client`.
///
/// When a license validation is configured it runs first; if it fails its
/// `on_error` is notified and the error is returned without the main request
/// ever being sent.
pub async fn call_api_with<C>(client: &C, options: CallOptions) -> Result<Payload, CallError>
where
    C: HttpClient + ?Sized,
{
    if let Some(license) = &options.license {
        let span = info_span!(
            "license_phase",
            path = %license.params.path,
            http.method = field::Empty,
            http.url = field::Empty,
        );
        validate_license(client, &options, license)
            .instrument(span)
            .await?;
    }

    let span = info_span!(
        "main_phase",
        path = %options.params.path,
        http.method = field::Empty,
        http.url = field::Empty,
    );
    let result = main_request(client, &options).instrument(span).await;

    match &result {
        Ok(payload) => options.callbacks.notify_success(payload),
        Err(err) => {
            warn!(error = %err, kind = ?err.kind(), "API call failed");
            options.callbacks.notify_error(err);
        }
    }
    result
}

async fn validate_license<C>(
    client: &C,
    options: &CallOptions,
    license: &LicenseValidation,
) -> Result<(), CallError>
where
    C: HttpClient + ?Sized,
{
    let result = license_request(client, options, &license.params).await;

    match result {
        Ok(payload) => {
            debug!("License validated");
            license.callbacks.notify_success(&payload);
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, kind = ?err.kind(), "License validation failed");
            license.callbacks.notify_error(&err);
            Err(err)
        }
    }
}

async fn license_request<C>(
    client: &C,
    options: &CallOptions,
    params: &RequestParams,
) -> Result<Payload, CallError>
where
    C: HttpClient + ?Sized,
{
    let url = build_url(
        &options.base_url,
        &params.path,
        params.query_params.as_ref(),
        params.skip_uri_encoding,
    )?;
    let method = params.method.unwrap_or(HttpMethod::Post);
    log_request(&options.debug, method, &url, params.body.as_ref());

    let headers = merge_headers([options.params.headers.as_slice(), params.headers.as_slice()])?;
    let req = build_request(method, &url, headers, params.body.as_ref())?;
    let response = send_with_timeout(client, req, options.timeout).await?;
    process_response(response).await
}

async fn main_request<C>(client: &C, options: &CallOptions) -> Result<Payload, CallError>
where
    C: HttpClient + ?Sized,
{
    let params = &options.params;
    let url = build_url(
        &options.base_url,
        &params.path,
        params.query_params.as_ref(),
        params.skip_uri_encoding,
    )?;
    let method = params.method.unwrap_or(HttpMethod::Get);
    log_request(&options.debug, method, &url, params.body.as_ref());

    let headers = merge_headers([params.headers.as_slice()])?;
    let req = build_request(method, &url, headers, params.body.as_ref())?;
    let response = send_with_timeout(client, req, options.timeout).await?;
    debug!(status = response.status().as_u16(), "Response received");

    if options.debug.log_raw_response {
        log_raw_response(&response);
    }
    let payload = process_response(response).await?;
    if options.debug.log_response {
        info!(target: DEBUG_TARGET, response = %payload, "Decoded response");
    }
    Ok(payload)
}

/// Records the target on the current phase span and emits the debug-flag
/// request output.
fn log_request(debug: &DebugFlags, method: HttpMethod, url: &str, body: Option<&serde_json::Value>) {
    let span = Span::current();
    span.record("http.method", field::display(method));
    span.record("http.url", field::display(url));

    if debug.log_url {
        info!(target: DEBUG_TARGET, %method, url, "Request URL");
    }
    if debug.log_body {
        if let Some(body) = body {
            info!(target: DEBUG_TARGET, body = %body, "Request body");
        }
    }
}

fn log_raw_response(response: &Response) {
    info!(
        target: DEBUG_TARGET,
        status = response.status().as_u16(),
        headers = ?response.headers(),
        "Raw response"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn echo_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"echoed":"payload-marker"}"#, "application/json")
                    .insert_header("x-served-by", "mock-7"),
            )
            .mount(&server)
            .await;
        server
    }

    fn echo_options(server: &MockServer, debug: DebugFlags) -> CallOptions {
        let params = RequestParams::new("/echo")
            .with_method(HttpMethod::Post)
            .with_body(json!({"sent": "body-marker"}));
        CallOptions::new(server.uri(), params).with_debug(debug)
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn all_debug_flags_log_every_stage() {
        let server = echo_server().await;
        let payload = call_api(echo_options(&server, DebugFlags::all()))
            .await
            .unwrap();

        assert_eq!(payload, Payload::Json(json!({"echoed": "payload-marker"})));
        assert!(logs_contain("Request URL"));
        assert!(logs_contain("/echo"));
        assert!(logs_contain("body-marker"));
        assert!(logs_contain("Raw response"));
        assert!(logs_contain("mock-7"));
        assert!(logs_contain("Decoded response"));
        assert!(logs_contain("payload-marker"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn disabled_debug_flags_stay_quiet() {
        let server = echo_server().await;
        let payload = call_api(echo_options(&server, DebugFlags::default()))
            .await
            .unwrap();

        assert_eq!(payload, Payload::Json(json!({"echoed": "payload-marker"})));
        assert!(!logs_contain("Request URL"));
        assert!(!logs_contain("body-marker"));
        assert!(!logs_contain("Raw response"));
        assert!(!logs_contain("Decoded response"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn flags_are_checked_independently() {
        let server = echo_server().await;
        let debug = DebugFlags {
            log_body: true,
            log_response: true,
            ..DebugFlags::default()
        };
        call_api(echo_options(&server, debug)).await.unwrap();

        assert!(!logs_contain("Request URL"));
        assert!(logs_contain("body-marker"));
        assert!(!logs_contain("Raw response"));
        assert!(logs_contain("Decoded response"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn debug_logging_does_not_change_error_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
            .mount(&server)
            .await;

        let options = CallOptions::new(server.uri(), RequestParams::new("/gone"))
            .with_debug(DebugFlags::all());
        let err = call_api(options).await.unwrap_err();

        assert_eq!(err.status_code(), Some(410));
        assert!(logs_contain("Request URL"));
        assert!(logs_contain("Raw response"));
        assert!(!logs_contain("Decoded response"));
        assert!(logs_contain("API call failed"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn license_phase_logs_url_and_body_when_enabled() {
        let server = echo_server().await;
        Mock::given(method("POST"))
            .and(path("/license/activate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("licensed"))
            .expect(1)
            .mount(&server)
            .await;

        let license = LicenseValidation::new(
            RequestParams::new("/license/activate").with_body(json!({"key": "license-body-marker"})),
        );
        let debug = DebugFlags {
            log_url: true,
            log_body: true,
            ..DebugFlags::default()
        };
        call_api(echo_options(&server, debug).with_license(license))
            .await
            .unwrap();

        let license_url = format!("{}/license/activate", server.uri());
        logs_assert(|lines: &[&str]| {
            let logged_url = lines.iter().any(|l| {
                l.contains("license_phase") && l.contains("Request URL") && l.contains(&license_url)
            });
            let logged_body = lines.iter().any(|l| {
                l.contains("license_phase")
                    && l.contains("Request body")
                    && l.contains("license-body-marker")
            });
            match (logged_url, logged_body) {
                (true, true) => Ok(()),
                (false, _) => Err("license URL was not logged".to_string()),
                (_, false) => Err("license body was not logged".to_string()),
            }
        });
        assert!(!logs_contain("Raw response"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn phase_spans_record_method_and_url() {
        let server = echo_server().await;
        call_api(echo_options(&server, DebugFlags::default()))
            .await
            .unwrap();

        assert!(logs_contain("main_phase"));
        assert!(logs_contain("http.method=POST"));
        assert!(logs_contain(&format!("{}/echo", server.uri())));
    }
}
