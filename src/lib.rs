//! Single-call HTTP request helper.
//!
//! [`call_api`] builds a URL from a base, a path and query parameters, sends
//! one request under a timeout, and normalizes the response to JSON or text.
//! An optional license validation request can gate the main call.

pub mod error;
pub mod executor;
pub mod fetch;
pub mod options;
pub mod response;
pub mod url_builder;

pub use error::{CallError, ErrorKind};
pub use executor::{call_api, call_api_with};
pub use options::{
    CallOptions, Callbacks, DebugFlags, HttpMethod, LicenseValidation, QueryParams, QueryValue,
    RequestParams,
};
pub use response::Payload;
pub use url_builder::build_url;
