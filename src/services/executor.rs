// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated request execution with a single renew-and-retry.

use reqwest::StatusCode;

use crate::error::{ClientError, Result};
use crate::services::backend::{ApiRequest, ApiResponse};
use crate::services::session::SessionController;

/// Sends requests with the session's current access token.
///
/// A 401 triggers at most one renewal and at most one retry per call. When
/// renewal fails, or the retried request is still unauthorized, the session
/// is ended and the call fails with [`ClientError::AuthenticationExpired`].
#[derive(Clone)]
pub struct RequestExecutor {
    session: SessionController,
}

impl RequestExecutor {
    pub fn new(session: SessionController) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let generation = self.session.current_generation();
        let sent_with = self.session.stored_credentials()?;
        let backend = self.session.backend();

        let response = backend
            .send(&request, sent_with.as_ref().map(|p| p.access_token.as_str()))
            .await?;

        if response.status != StatusCode::UNAUTHORIZED || request.is_refresh() {
            return Ok(response);
        }
        // Without a refresh token there is nothing to recover with; the caller
        // sees the 401 as-is.
        let Some(sent_with) = sent_with else {
            return Ok(response);
        };

        tracing::info!(endpoint = %request.path, "Request unauthorized; renewing credentials");

        // Another caller may already have renewed since this request was sent.
        let already_renewed = matches!(
            self.session.stored_credentials(),
            Ok(Some(current)) if current.access_token != sent_with.access_token
        );
        if !already_renewed && !self.session.renew().await {
            self.session.expire(generation);
            return Err(ClientError::AuthenticationExpired);
        }

        // Never replay a request under a session other than the one it was sent for.
        if self.session.current_generation() != generation {
            return Err(ClientError::AuthenticationExpired);
        }
        let Some(renewed) = self.session.stored_credentials()? else {
            return Err(ClientError::AuthenticationExpired);
        };

        let retried = backend.send(&request, Some(&renewed.access_token)).await?;
        if retried.status == StatusCode::UNAUTHORIZED {
            tracing::warn!(endpoint = %request.path, "Still unauthorized after renewal");
            self.session.expire(generation);
            return Err(ClientError::AuthenticationExpired);
        }
        Ok(retried)
    }
}
