//! Error taxonomy for a single API call.
//!
//! Callers distinguish failures by variant (or [`CallError::kind`]), never by
//! message text. [`CallError::Network`], [`CallError::Response`] and
//! [`CallError::Timeout`] are the three kinds a call surfaces at runtime; the
//! remaining variants cover inputs that could not be turned into a request.

use crate::response::Payload;

/// Message carried by a [`CallError::Timeout`] when none is supplied.
pub const DEFAULT_TIMEOUT_MESSAGE: &str = "Request timed out";

/// Coarse classification of a [`CallError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Response,
    Timeout,
    InvalidUrl,
    InvalidHeader,
    Decode,
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The transport failed before a complete response was obtained
    /// (DNS failure, connection refused, reset while reading the body).
    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A response arrived with a status outside 200-299.
    #[error("{message}")]
    Response {
        message: String,
        status_code: u16,
        response: Payload,
    },

    /// The per-phase timer elapsed before the response arrived.
    #[error("{message}")]
    Timeout { message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The server declared `application/json` but the body did not parse.
    #[error("failed to decode JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CallError {
    pub fn network(message: impl Into<String>) -> Self {
        CallError::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn response(message: impl Into<String>, status_code: u16, response: Payload) -> Self {
        CallError::Response {
            message: message.into(),
            status_code,
            response,
        }
    }

    pub fn timeout() -> Self {
        Self::timeout_with_message(DEFAULT_TIMEOUT_MESSAGE)
    }

    pub fn timeout_with_message(message: impl Into<String>) -> Self {
        CallError::Timeout {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::Network { .. } => ErrorKind::Network,
            CallError::Response { .. } => ErrorKind::Response,
            CallError::Timeout { .. } => ErrorKind::Timeout,
            CallError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            CallError::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            CallError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Status code of a [`CallError::Response`], `None` for every other kind.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CallError::Response { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Decoded error body of a [`CallError::Response`].
    pub fn response_payload(&self) -> Option<&Payload> {
        match self {
            CallError::Response { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return CallError::timeout();
        }
        CallError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timeout_uses_default_message() {
        let err = CallError::timeout();
        assert_eq!(err.to_string(), "Request timed out");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_timeout());
    }

    #[test]
    fn response_error_exposes_status_and_payload() {
        let payload = Payload::Json(json!({"error": "not found"}));
        let err = CallError::response("Request failed with status 404", 404, payload.clone());
        assert_eq!(err.kind(), ErrorKind::Response);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.response_payload(), Some(&payload));
        assert_eq!(err.to_string(), "Request failed with status 404");
    }

    #[test]
    fn network_error_carries_message_only() {
        let err = CallError::network("connection refused");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.status_code(), None);
        assert!(err.response_payload().is_none());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn url_parse_error_is_kept_unchanged() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = CallError::from(parse_err);
        assert!(matches!(err, CallError::InvalidUrl(e) if e == parse_err));
    }
}
