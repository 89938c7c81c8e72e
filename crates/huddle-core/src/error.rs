//! Error taxonomy for API operations.

use serde_json::Value;

/// Shown when neither a field error nor a server message is available.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong!";

/// Errors surfaced by [`crate::api::Api`] and [`crate::client::ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Authorization failed and no refresh token was available.
    /// The session has been cleared.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The refresh exchange failed. The session has been cleared.
    #[error("Session expired: {message}")]
    RefreshFailed { message: String },

    /// 4xx response carrying field errors.
    #[error("HTTP {status}: {message}")]
    Validation {
        status: u16,
        message: String,
        field_errors: Vec<String>,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Token storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl ApiError {
    /// Builds the error for a non-2xx response body.
    ///
    /// The server reports field errors as `data.errors[].msg` and a summary
    /// as `message`; a 4xx with field errors becomes [`ApiError::Validation`].
    pub fn from_response(status: u16, body: &str) -> Self {
        let json = serde_json::from_str::<Value>(body).ok();

        let message = json
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback_message(body));

        let field_errors: Vec<String> = json
            .as_ref()
            .and_then(|v| v.pointer("/data/errors"))
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if (400..500).contains(&status) && !field_errors.is_empty() {
            ApiError::Validation {
                status,
                message,
                field_errors,
            }
        } else {
            ApiError::Http { status, message }
        }
    }

    /// Message for display: first field error, then the server message,
    /// then [`DEFAULT_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation {
                field_errors,
                message,
                ..
            } => field_errors
                .first()
                .cloned()
                .or_else(|| non_empty(message))
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            ApiError::Http { message, .. }
            | ApiError::Unauthorized { message }
            | ApiError::RefreshFailed { message } => {
                non_empty(message).unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
            }
            ApiError::InvalidInput(message) => message.clone(),
            ApiError::Network(_) | ApiError::Decode { .. } | ApiError::Storage(_) => {
                DEFAULT_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// True when the session was terminated and the user must log in again.
    pub fn is_session_ended(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::RefreshFailed { .. }
        )
    }
}

fn non_empty(message: &str) -> Option<String> {
    let trimmed = message.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn fallback_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') || trimmed.starts_with('<') {
        "Request failed".to_string()
    } else {
        trimmed.trim_matches('"').to_string()
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_wins() {
        let body = r#"{
            "success": false,
            "message": "Validation error",
            "data": {"errors": [{"msg": "Email is invalid"}, {"msg": "Password too short"}]}
        }"#;
        let err = ApiError::from_response(422, body);
        assert!(matches!(err, ApiError::Validation { status: 422, .. }));
        assert_eq!(err.user_message(), "Email is invalid");
    }

    #[test]
    fn test_server_message_is_second_choice() {
        let err = ApiError::from_response(409, r#"{"message": "Email already taken"}"#);
        assert!(matches!(err, ApiError::Http { status: 409, .. }));
        assert_eq!(err.user_message(), "Email already taken");
    }

    #[test]
    fn test_static_default_is_last_resort() {
        let err = ApiError::Http {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_plain_text_body_becomes_message() {
        let err = ApiError::from_response(403, "Forbidden");
        assert_eq!(err.user_message(), "Forbidden");
        assert!(matches!(err, ApiError::Http { status: 403, .. }));

        let err = ApiError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502: Request failed");
    }

    #[test]
    fn test_field_errors_on_5xx_are_not_validation() {
        let body = r#"{"message": "boom", "data": {"errors": [{"msg": "x"}]}}"#;
        assert!(matches!(
            ApiError::from_response(500, body),
            ApiError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn test_session_ended_kinds() {
        assert!(
            ApiError::RefreshFailed {
                message: "HTTP 401".into()
            }
            .is_session_ended()
        );
        assert!(!ApiError::InvalidInput("nope".into()).is_session_ended());
    }
}
