// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The workout session being trained, and its flush to the backend.

use serde::Deserialize;

use crate::error::{ClientError, Result};
use crate::models::{Exercise, SessionPayload, SessionRecord, WorkoutSession};
use crate::services::backend::{endpoints, ApiRequest};
use crate::services::executor::RequestExecutor;

const NO_ACTIVE_SESSION: &str = "No workout session in progress";

/// Response of `POST /sessions/`; only the id is needed.
#[derive(Deserialize)]
struct CreatedSession {
    id: i64,
}

/// Holds at most one in-progress session plus the sessions flushed so far.
///
/// A failed flush leaves the session exactly as it was, so the same payload
/// can be sent again.
pub struct WorkoutTracker {
    executor: RequestExecutor,
    current: Option<WorkoutSession>,
    history: Vec<SessionRecord>,
}

impl WorkoutTracker {
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor,
            current: None,
            history: Vec::new(),
        }
    }

    /// Start a new session now. Fails if one is already in progress.
    pub fn start(&mut self) -> Result<&WorkoutSession> {
        if self.current.is_some() {
            return Err(ClientError::Validation(
                "A workout session is already in progress".to_string(),
            ));
        }
        let session = self.current.insert(WorkoutSession::start());
        tracing::info!(started_at = %session.started_at(), "Workout session started");
        Ok(&*session)
    }

    pub fn current(&self) -> Option<&WorkoutSession> {
        self.current.as_ref()
    }

    pub fn add_exercise(&mut self, exercise: Exercise) -> Result<()> {
        self.active_mut()?.add_exercise(exercise)
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<()> {
        self.active_mut()?.set_notes(notes);
        Ok(())
    }

    pub fn build_payload(&self) -> Result<SessionPayload> {
        Ok(self.active()?.build_payload())
    }

    /// Save `payload` to the backend.
    ///
    /// On success the in-progress session is discarded and the saved record is
    /// put at the front of the local history. On failure nothing changes and
    /// the backend's `detail` is surfaced as-is.
    pub async fn flush(&mut self, payload: &SessionPayload) -> Result<SessionRecord> {
        self.active()?;

        let request = ApiRequest::post(endpoints::SESSIONS, payload)?;
        let response = self.executor.execute(request).await.map_err(|e| {
            tracing::warn!(error = %e, "Session flush failed");
            e
        })?;
        if !response.is_success() {
            tracing::warn!(status = response.status.as_u16(), "Session rejected by backend");
            return Err(response.into_error("Failed to save session"));
        }
        let created: CreatedSession = response.json()?;

        let record = SessionRecord::from_payload(created.id, payload);
        self.current = None;
        self.history.insert(0, record.clone());
        tracing::info!(
            session_id = record.id,
            exercises = record.workouts.len(),
            "Workout session saved"
        );
        Ok(record)
    }

    /// Finish the session now and save it.
    pub async fn end(&mut self) -> Result<SessionRecord> {
        let payload = self.build_payload()?;
        self.flush(&payload).await
    }

    /// Drop the in-progress session without saving it.
    pub fn discard(&mut self) -> Option<WorkoutSession> {
        let discarded = self.current.take();
        if discarded.is_some() {
            tracing::info!("Workout session discarded");
        }
        discarded
    }

    /// Sessions flushed through this tracker, newest first.
    pub fn history(&self) -> &[SessionRecord] {
        &self.history
    }

    fn active(&self) -> Result<&WorkoutSession> {
        self.current
            .as_ref()
            .ok_or_else(|| ClientError::Validation(NO_ACTIVE_SESSION.to_string()))
    }

    fn active_mut(&mut self) -> Result<&mut WorkoutSession> {
        self.current
            .as_mut()
            .ok_or_else(|| ClientError::Validation(NO_ACTIVE_SESSION.to_string()))
    }
}
