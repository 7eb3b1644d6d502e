//! CLI entry point for `call_api`.
//!
//! Drives a single API call (optionally gated by a license validation request)
//! from the command line, or prints the URL a call would target.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use call_api::{
    CallOptions, Callbacks, DebugFlags, HttpMethod, LicenseValidation, Payload, QueryParams,
    QueryValue, RequestParams, build_url, call_api,
};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "call_api")]
#[command(about = "Issue a single HTTP API call and print the decoded response", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform an API call and print the response
    Call(CallArgs),
    /// Print the URL a call would target
    Url {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Base URL (falls back to CALL_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Path resolved against the base URL
    #[arg(value_name = "PATH")]
    path: String,

    /// Query parameter as key=value; a bare key is treated as null and dropped
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,

    /// Insert query keys and values without percent-encoding
    #[arg(long, default_value_t = false)]
    skip_encoding: bool,
}

#[derive(Args)]
struct CallArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: HttpMethod,

    /// Header as 'Name: value'
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// JSON request body
    #[arg(short = 'd', long)]
    body: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Log URL, body, raw response and decoded response
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Path of a license validation request to run first
    #[arg(long)]
    license_path: Option<String>,

    /// Method of the license validation request
    #[arg(long, default_value = "POST")]
    license_method: HttpMethod,

    /// JSON body of the license validation request
    #[arg(long)]
    license_body: Option<String>,

    /// Extra header for the license validation request as 'Name: value'
    #[arg(long = "license-header", value_name = "NAME: VALUE")]
    license_headers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/call_api.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("call_api.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Url { target } => {
            let base_url = resolve_base_url(target.base_url.as_deref())?;
            let query = parse_query(&target.query);
            let url = build_url(&base_url, &target.path, Some(&query), target.skip_encoding)?;
            println!("{url}");
        }
        Commands::Call(args) => {
            let options = call_options(args)?;
            match call_api(options).await {
                Ok(payload) => print_payload(&payload)?,
                Err(e) => {
                    error!(error = %e, kind = ?e.kind(), "Call failed");
                    if let Some(body) = e.response_payload() {
                        print_payload(body)?;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

fn call_options(args: CallArgs) -> Result<CallOptions> {
    let base_url = resolve_base_url(args.target.base_url.as_deref())?;

    let mut params = RequestParams::new(args.target.path)
        .with_method(args.method)
        .with_query(parse_query(&args.target.query))
        .with_skip_uri_encoding(args.target.skip_encoding);
    params.headers = parse_headers(&args.headers)?;
    if let Some(body) = args.body.as_deref() {
        params.body = Some(serde_json::from_str(body).context("--body is not valid JSON")?);
    }

    let debug = if args.debug {
        DebugFlags::all()
    } else {
        DebugFlags::default()
    };

    let mut options = CallOptions::new(base_url, params)
        .with_timeout(Duration::from_millis(args.timeout_ms))
        .with_debug(debug);

    if let Some(path) = args.license_path {
        let mut license = RequestParams::new(path).with_method(args.license_method);
        license.headers = parse_headers(&args.license_headers)?;
        if let Some(body) = args.license_body.as_deref() {
            license.body =
                Some(serde_json::from_str(body).context("--license-body is not valid JSON")?);
        }
        let callbacks = Callbacks::new()
            .on_success(|_| info!("License accepted"))
            .on_error(|e| error!(error = %e, "License rejected"));
        options = options.with_license(LicenseValidation::new(license).with_callbacks(callbacks));
    }

    Ok(options)
}

fn resolve_base_url(arg: Option<&str>) -> Result<String> {
    match arg {
        Some(url) => Ok(url.to_string()),
        None => std::env::var("CALL_API_BASE_URL")
            .map_err(|_| anyhow!("--base-url or CALL_API_BASE_URL must be set")),
    }
}

fn parse_query(raw: &[String]) -> QueryParams {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), QueryValue::from(v)),
            None => (pair.clone(), QueryValue::Null),
        })
        .collect()
}

fn parse_headers(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .ok_or_else(|| anyhow!("header '{h}' must look like 'Name: value'"))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn print_payload(payload: &Payload) -> Result<()> {
    match payload {
        Payload::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        Payload::Text(text) => println!("{text}"),
    }
    Ok(())
}
