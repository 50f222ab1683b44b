/*
[INPUT]:  Failures from URL handling, transport, HTTP status codes and body decoding
[OUTPUT]: ExamdeskError values the import client returns
[POS]:    Error handling layer - one error type for the adapter crate
[UPDATE]: When the client starts producing a new kind of failure
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Everything a call into the examdesk API can fail with.
#[derive(Error, Debug)]
pub enum ExamdeskError {
    /// Base URL rejected while building the client
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection, TLS or protocol failure below the HTTP status level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {duration}s")]
    Timeout { duration: u64 },

    /// 401/403, or a blank token refused before sending
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// 429; `retry_after` comes from the Retry-After header
    #[error("Rate limited by server (Retry-After {retry_after}s)")]
    RateLimit { retry_after: u64 },

    /// Any other non-success status
    #[error("API error (HTTP {code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed response body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Body decoded but contradicts the request
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ExamdeskError {
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        ExamdeskError::Api {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ExamdeskError::Authentication { .. })
    }

    /// HTTP status behind the error, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ExamdeskError::Api { code, .. } => Some(*code),
            ExamdeskError::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            ExamdeskError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExamdeskError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_api_error_keeps_status_and_message() {
        let err = ExamdeskError::api_error(StatusCode::NOT_FOUND, "Unknown import task");
        assert!(matches!(
            &err,
            ExamdeskError::Api { code: 404, message } if message == "Unknown import task"
        ));
        assert_eq!(err.to_string(), "API error (HTTP 404): Unknown import task");
    }

    #[rstest]
    #[case(ExamdeskError::api_error(StatusCode::BAD_GATEWAY, "upstream"), Some(502))]
    #[case(ExamdeskError::RateLimit { retry_after: 3 }, Some(429))]
    #[case(ExamdeskError::Timeout { duration: 30 }, None)]
    #[case(ExamdeskError::InvalidResponse("task id mismatch".into()), None)]
    fn test_status_code(#[case] err: ExamdeskError, #[case] expected: Option<u16>) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn test_only_authentication_is_auth_error() {
        let auth = ExamdeskError::Authentication {
            message: "bad token".to_string(),
        };
        assert!(auth.is_auth_error());
        assert!(!ExamdeskError::api_error(StatusCode::FORBIDDEN, "x").is_auth_error());
        assert!(!ExamdeskError::Timeout { duration: 30 }.is_auth_error());
    }
}
