// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types and the `{success, error}` shape handed to the UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message shown when a session is torn down because renewal failed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Message shown for any connectivity failure.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Client error type covering every failure the session layer can surface.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad local input; shown inline, credentials untouched.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Bad credentials at login.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Renewal failed, or the request was still unauthorized after renewal.
    #[error("Authentication expired")]
    AuthenticationExpired,

    /// Connectivity or timeout failure. Never retried automatically.
    #[error("Network error: {0}")]
    Network(String),

    /// Token could not be decoded or lacks a required claim.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// 422-class response from the backend, already mapped to a readable message.
    #[error("Backend validation error: {0}")]
    BackendValidation(String),

    /// Any other non-success response from the backend.
    #[error("Backend error (HTTP {status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// True when the error means the current credentials can no longer be used.
    ///
    /// A malformed token is handled exactly like an expired session.
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::AuthenticationExpired | ClientError::MalformedToken(_)
        )
    }

    /// The text presentation code shows to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg)
            | ClientError::Authentication(msg)
            | ClientError::BackendValidation(msg) => msg.clone(),
            ClientError::AuthenticationExpired | ClientError::MalformedToken(_) => {
                SESSION_EXPIRED_MESSAGE.to_string()
            }
            ClientError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ClientError::Backend { status, detail } if *status >= 500 && detail.is_empty() => {
                "Server error. Please try again later.".to_string()
            }
            ClientError::Backend { detail, .. } => detail.clone(),
            ClientError::Storage(_) | ClientError::Internal(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Field order is unspecified; sort so the same form always reports the same message.
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let message = fields
            .into_iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Please fill in all fields".to_string());
        ClientError::Validation(message)
    }
}

/// Outcome handed to presentation code. No transport error crosses this line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T>> for ActionResult {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => ActionResult::ok(),
            Err(e) => ActionResult::failed(e.user_message()),
        }
    }
}

/// Map a 422 response body to a human-readable message.
///
/// The backend reports field errors as `{"detail": [{"loc": [...], "msg": "..."}]}`;
/// the field path decides which message is shown.
pub fn describe_validation_failure(body: &Value) -> String {
    let detail = match body.get("detail") {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Array(items)) => items,
        _ => return "Please check your input and try again.".to_string(),
    };

    for item in detail {
        let loc: Vec<&str> = item
            .get("loc")
            .and_then(Value::as_array)
            .map(|parts| parts.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let msg = item.get("msg").and_then(Value::as_str).unwrap_or("invalid value");

        if loc.contains(&"password") {
            return "Password must be at least 8 characters".to_string();
        }
        if loc.contains(&"email") {
            return "Please enter a valid email address".to_string();
        }
        if loc.contains(&"username") {
            return format!("Username is invalid: {}", msg);
        }
    }

    detail
        .first()
        .and_then(|item| item.get("msg"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "Please check your input and try again.".to_string())
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
