// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models shared by the session layer and the CLI.

pub mod auth;
pub mod credentials;
pub mod stats;
pub mod workout;

pub use auth::{LoginRequest, RefreshRequest, RegisterRequest, RegisteredUser, SignupForm, TokenResponse};
pub use credentials::{AuthState, CredentialPair, UserIdentity};
pub use stats::{HistorySummary, SessionStats};
pub use workout::{
    Exercise, ExerciseForm, Intensity, RecordedExercise, RecordedSet, Reps, SessionPayload,
    SessionRecord, SetForm, WorkoutSession, WorkoutSet,
};
