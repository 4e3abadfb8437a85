use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - credential missing or expired")]
    Unauthorized { detail: Option<String> },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Rejected {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Server error ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Server {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// FastAPI error body: `detail` is a string for `HTTPException`s and a list of
/// `{loc, msg, type}` objects for request validation failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull a displayable message out of an error response body, if it has one.
    pub fn extract_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        let detail = match parsed.detail? {
            Value::String(s) => s,
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; "),
            Value::Null => return None,
            other => other.to_string(),
        };
        let detail = detail.trim();
        if detail.is_empty() {
            None
        } else {
            Some(detail.to_string())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = Self::extract_detail(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { detail },
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status, detail },
            _ => ApiError::Rejected { status, detail },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Server-provided detail, verbatim.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail }
            | ApiError::Rejected { detail, .. }
            | ApiError::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// A message suitable for showing to the user.
    ///
    /// Server detail is shown for 401 and 4xx rejections only. A 5xx detail is
    /// often a raw exception string, so it stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { detail: Some(detail) }
            | ApiError::Rejected { detail: Some(detail), .. } => return detail.clone(),
            _ => {}
        }
        match self {
            ApiError::Unauthorized { .. } => "Your session has expired. Please log in again.".to_string(),
            ApiError::RateLimited => "Too many requests. Please wait a moment and try again.".to_string(),
            ApiError::Rejected { status, .. } => format!("Request was rejected ({}).", status.as_u16()),
            ApiError::Server { .. } => "The server ran into a problem. Please try again later.".to_string(),
            ApiError::Network(e) if e.is_timeout() => "Connection timed out. Please try again.".to_string(),
            ApiError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::InvalidResponse(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_hides_detail_from_user() {
        let err = ApiError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail":"Traceback (most recent call last): KeyError 'x'"}"#,
        );
        assert_eq!(err.detail(), Some("Traceback (most recent call last): KeyError 'x'"));
        assert_eq!(
            err.user_message(),
            "The server ran into a problem. Please try again later."
        );
    }

    #[test]
    fn test_from_status_classification() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>"),
            ApiError::Server { detail: None, .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, r#"{"detail": "Meeting not found"}"#),
            ApiError::Rejected { status: StatusCode::NOT_FOUND, .. }
        ));
    }

    #[test]
    fn test_string_detail_is_verbatim() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "User with this email already exists"}"#,
        );
        assert_eq!(err.detail(), Some("User with this email already exists"));
        assert_eq!(err.user_message(), "User with this email already exists");
    }

    #[test]
    fn test_validation_detail_list_is_joined() {
        let body = r#"{"detail": [
            {"loc": ["body", "email"], "msg": "value is not a valid email address", "type": "value_error"},
            {"loc": ["body", "password"], "msg": "field required", "type": "missing"}
        ]}"#;
        assert_eq!(
            ApiError::extract_detail(body).as_deref(),
            Some("value is not a valid email address; field required")
        );
    }

    #[test]
    fn test_missing_or_empty_detail() {
        assert!(ApiError::extract_detail("").is_none());
        assert!(ApiError::extract_detail("Internal Server Error").is_none());
        assert!(ApiError::extract_detail(r#"{"detail": null}"#).is_none());
        assert!(ApiError::extract_detail(r#"{"detail": "  "}"#).is_none());
        assert!(ApiError::extract_detail(r#"{"message": "nope"}"#).is_none());
    }

    #[test]
    fn test_fallback_messages_are_non_empty() {
        let errors = [
            ApiError::Unauthorized { detail: None },
            ApiError::RateLimited,
            ApiError::Rejected { status: StatusCode::CONFLICT, detail: None },
            ApiError::Server { status: StatusCode::INTERNAL_SERVER_ERROR, detail: None },
            ApiError::InvalidResponse("bad json".to_string()),
        ];
        for err in &errors {
            assert!(!err.user_message().is_empty());
        }
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
