// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session lifecycle and backend access.

pub mod backend;
pub mod credential_store;
pub mod executor;
pub mod history;
pub mod refresh_scheduler;
pub mod session;
pub mod token_clock;
pub mod workout_session;

pub use backend::{endpoints, ApiRequest, ApiResponse, BackendClient};
pub use credential_store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use executor::RequestExecutor;
pub use history::HistoryService;
pub use refresh_scheduler::RefreshScheduler;
pub use session::SessionController;
pub use workout_session::WorkoutTracker;
