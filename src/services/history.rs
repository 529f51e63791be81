// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Past sessions as stored by the backend.

use reqwest::StatusCode;

use crate::error::{ClientError, Result};
use crate::models::{HistorySummary, SessionRecord};
use crate::services::backend::{endpoints, ApiRequest};
use crate::services::executor::RequestExecutor;

#[derive(Clone)]
pub struct HistoryService {
    executor: RequestExecutor,
}

impl HistoryService {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// Fetch the current user's sessions. A 404 means there are none yet.
    pub async fn fetch(&self) -> Result<Vec<SessionRecord>> {
        let response = self
            .executor
            .execute(ApiRequest::get(endpoints::SESSIONS))
            .await?;

        match response.status {
            status if status.is_success() => {
                let sessions: Vec<SessionRecord> = response.json()?;
                tracing::debug!(count = sessions.len(), "Loaded session history");
                Ok(sessions)
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Authentication(
                "Authentication error. Please log in again.".to_string(),
            )),
            _ => Err(response.into_error("Failed to load sessions")),
        }
    }

    pub async fn summary(&self) -> Result<HistorySummary> {
        Ok(HistorySummary::from_records(&self.fetch().await?))
    }
}
