// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP transport to the fitness backend.
//!
//! This layer knows nothing about sessions: it sends one request, with or
//! without a bearer token, and hands back the status and body. Renewal and
//! retry live in [`crate::services::RequestExecutor`].

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{describe_validation_failure, ClientError, Result};

/// Backend endpoint paths, relative to the configured base URL.
pub mod endpoints {
    pub const REGISTER: &str = "/users/";
    pub const LOGIN: &str = "/users/login";
    pub const REFRESH: &str = "/users/refresh";
    pub const SESSIONS: &str = "/sessions/";
    pub const HEALTH: &str = "/health";
}

/// One request, replayable as-is after a renewal.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post<T: Serialize>(path: impl Into<String>, body: &T) -> Result<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::Internal(anyhow::anyhow!("Failed to encode request: {}", e)))?;
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        })
    }

    /// Whether this is the renewal call itself, which must never trigger a renewal.
    pub fn is_refresh(&self) -> bool {
        self.path == endpoints::REFRESH
    }
}

/// Status and raw body of a backend response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ClientError::Internal(anyhow::anyhow!(
                "Unexpected response body (HTTP {}): {}",
                self.status.as_u16(),
                e
            ))
        })
    }

    /// Body as JSON, or `Null` when it isn't JSON.
    pub fn json_value(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    /// The backend's `detail` field when it is a plain string.
    pub fn detail(&self) -> Option<String> {
        match self.json_value().get("detail") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Convert a non-success response into an error.
    ///
    /// 422 responses are mapped to a readable validation message; anything else
    /// carries the backend's `detail`, or `fallback` when there is none.
    pub fn into_error(self, fallback: &str) -> ClientError {
        if self.status == StatusCode::UNPROCESSABLE_ENTITY {
            return ClientError::BackendValidation(describe_validation_failure(&self.json_value()));
        }
        let detail = match self.detail() {
            Some(detail) => detail,
            // Server errors without detail get the generic "try again later" message.
            None if self.status.is_server_error() => String::new(),
            None => fallback.to_string(),
        };
        ClientError::Backend {
            status: self.status.as_u16(),
            detail,
        }
    }
}

/// Raw client for the fitness backend.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ClientError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request`, attaching `bearer` as the Authorization header when given.
    ///
    /// Only transport failures are errors here; every HTTP status comes back as
    /// an [`ApiResponse`].
    pub async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.http.request(request.method.clone(), &url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %request.method, endpoint = %request.path, error = %e, "Backend unreachable");
            ClientError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read response: {}", e)))?;

        tracing::debug!(
            method = %request.method,
            endpoint = %request.path,
            status = status.as_u16(),
            authenticated = bearer.is_some(),
            "Backend request completed"
        );

        Ok(ApiResponse { status, body })
    }

    /// Check that the backend is up.
    pub async fn health(&self) -> Result<()> {
        let response = self.send(&ApiRequest::get(endpoints::HEALTH), None).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(response.into_error("Backend is unhealthy"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn detail_is_surfaced_verbatim() {
        let err = response(400, json!({"detail": "Workout name too long"})).into_error("Failed");
        assert_eq!(err.user_message(), "Workout name too long");
    }

    #[test]
    fn fallback_used_without_detail() {
        let err = response(404, json!({})).into_error("Failed to load sessions");
        assert!(matches!(err, ClientError::Backend { status: 404, .. }));
        assert_eq!(err.user_message(), "Failed to load sessions");
    }

    #[test]
    fn server_error_without_detail_is_generic() {
        let err = ApiResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Internal Server Error".into(),
        }
        .into_error("Failed to save session");
        assert_eq!(err.user_message(), "Server error. Please try again later.");
    }

    #[test]
    fn unprocessable_maps_to_validation_message() {
        let err = response(
            422,
            json!({"detail": [{"loc": ["body", "password"], "msg": "too short"}]}),
        )
        .into_error("Registration failed");
        assert!(matches!(err, ClientError::BackendValidation(_)));
        assert_eq!(err.user_message(), "Password must be at least 8 characters");
    }

    #[test]
    fn refresh_request_is_recognized() {
        let req = ApiRequest::post(endpoints::REFRESH, &json!({"refresh_token": "r"})).unwrap();
        assert!(req.is_refresh());
        assert!(!ApiRequest::get(endpoints::SESSIONS).is_refresh());
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = Config {
            api_url: "http://localhost:8000/".into(),
            ..Config::default()
        };
        assert_eq!(BackendClient::new(&config).unwrap().base_url(), "http://localhost:8000");
    }
}
