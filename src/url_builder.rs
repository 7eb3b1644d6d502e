//! Target URL construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::error::CallError;
use crate::options::QueryParams;

/// Characters left untouched by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Resolves `path` against `base` and appends every non-null query entry.
///
/// With `skip_encoding` the keys and values are inserted verbatim; the caller
/// is then responsible for producing a well-formed URL.
pub fn build_url(
    base: &str,
    path: &str,
    query_params: Option<&QueryParams>,
    skip_encoding: bool,
) -> Result<String, CallError> {
    let mut url = Url::parse(base)?.join(path)?;

    let Some(params) = query_params else {
        return Ok(url.into());
    };

    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            let value = value.to_query_string()?;
            Some(if skip_encoding {
                format!("{key}={value}")
            } else {
                format!("{}={}", encode(key), encode(&value))
            })
        })
        .collect();

    if pairs.is_empty() {
        return Ok(url.into());
    }

    // Splice the pairs in as text so `Url` does not re-encode verbatim input.
    let fragment = url.fragment().map(str::to_owned);
    url.set_fragment(None);
    let separator = match url.query() {
        Some(q) if !q.is_empty() => "&",
        Some(_) => "",
        None => "?",
    };

    let mut built = String::from(url);
    built.push_str(separator);
    built.push_str(&pairs.join("&"));
    if let Some(fragment) = fragment {
        built.push('#');
        built.push_str(&fragment);
    }
    Ok(built)
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}
