// src/error.rs

use serde::Deserialize;
use thiserror::Error;

/// Global Client Error Enum.
/// Every backend call and every form submission funnels its failure through here,
/// so a screen only ever has one notification to show.
#[derive(Debug, Error)]
pub enum AppError {
    // Transport failure: connection refused, DNS, TLS, timeout.
    #[error("Network error: {0}")]
    Network(String),

    // 4xx with a backend message (validation, conflict).
    #[error("Bad request: {0}")]
    BadRequest(String),

    // 401 / 403, or a missing/expired token detected locally.
    #[error("Authentication required: {0}")]
    AuthError(String),

    // 404
    #[error("Not found: {0}")]
    NotFound(String),

    // 5xx
    #[error("Server error: {0}")]
    Server(String),

    // A response the normalizer could not repair.
    #[error("Malformed response: {0}")]
    Decode(String),

    // Client-side form validation.
    #[error("{0}")]
    Validation(String),

    // The record exists but no longer accepts the action (past its due date).
    #[error("{0}")]
    Unavailable(String),

    // The trigger was invoked while the same action is still in flight.
    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session storage error: {0}")]
    Session(String),
}

/// Error body shape returned by the backend. Most endpoints use `message`,
/// a few older ones use `error`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

impl AppError {
    /// Maps a non-2xx status and the (optional) backend message to an error.
    /// An absent message is stored as an empty string so that
    /// [`AppError::user_message`] falls back to the caller's text.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_default();
        match status {
            401 | 403 => AppError::AuthError(message),
            404 => AppError::NotFound(message),
            400..=499 => AppError::BadRequest(message),
            _ => AppError::Server(message),
        }
    }

    /// The single user-visible notification for this failure: the backend's
    /// message when it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Server(msg)
            | AppError::Validation(msg)
            | AppError::Unavailable(msg)
                if !msg.is_empty() =>
            {
                msg.clone()
            }
            AppError::Busy(_) => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Auth failures are not ordinary notifications: the session is gone and
    /// the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, AppError::AuthError(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(AppError::from_status(401, None), AppError::AuthError(_)));
        assert!(matches!(AppError::from_status(403, None), AppError::AuthError(_)));
        assert!(matches!(AppError::from_status(404, None), AppError::NotFound(_)));
        assert!(matches!(AppError::from_status(422, None), AppError::BadRequest(_)));
        assert!(matches!(AppError::from_status(502, None), AppError::Server(_)));
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let err = AppError::from_status(400, Some("Title is required".to_string()));
        assert_eq!(err.user_message("Save failed"), "Title is required");

        let err = AppError::from_status(500, None);
        assert_eq!(err.user_message("Save failed"), "Save failed");

        let err = AppError::Network("connection refused".to_string());
        assert_eq!(err.user_message("Failed to load assignments"), "Failed to load assignments");
    }

    #[test]
    fn error_body_falls_back_to_error_field() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"  Invalid token "}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid token"));

        let body: ErrorBody = serde_json::from_str(r#"{"message":""}"#).unwrap();
        assert_eq!(body.into_message(), None);
    }

    #[test]
    fn only_auth_errors_require_login() {
        assert!(AppError::AuthError(String::new()).requires_login());
        assert!(!AppError::NotFound(String::new()).requires_login());
        assert!(!AppError::Unavailable(String::new()).requires_login());
    }

    #[test]
    fn unavailable_shows_its_own_text() {
        let err = AppError::Unavailable("'Rust basics' closed on 2020-01-01".to_string());
        assert_eq!(err.user_message("Submit failed"), "'Rust basics' closed on 2020-01-01");
    }
}
