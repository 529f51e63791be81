// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Liftlog: client for a workout-logging backend
//!
//! This crate keeps a user's session alive against the backend (login,
//! proactive and reactive token renewal, logout) and builds workout
//! sessions locally before saving them in one request.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use error::Result;
use services::{HistoryService, SessionController, WorkoutTracker};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: SessionController,
    pub history: HistoryService,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let session = SessionController::from_config(&config)?;
        let history = HistoryService::new(session.executor());
        Ok(Self {
            config,
            session,
            history,
        })
    }

    /// A tracker for a new workout, sending through this session.
    pub fn workout_tracker(&self) -> WorkoutTracker {
        WorkoutTracker::new(self.session.executor())
    }
}
