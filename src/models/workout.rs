// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout session aggregate and the session payload sent to the backend.
//!
//! A `WorkoutSession` is built incrementally while the user trains:
//! exercises are appended, notes may be edited, and nothing is sent until
//! the session is flushed. `build_payload` produces the exact structure the
//! backend stores; the aggregate itself is never mutated by it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::error::{ClientError, Result};
use crate::time_utils::iso8601_millis;

/// Perceived effort of a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for Intensity {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Intensity::Low),
            "medium" => Ok(Intensity::Medium),
            "high" => Ok(Intensity::High),
            other => Err(ClientError::Validation(format!(
                "Unknown intensity '{}' (expected low, medium or high)",
                other
            ))),
        }
    }
}

/// Repetitions performed in one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reps {
    pub count: NonZeroU32,
    pub intensity: Intensity,
    /// Load per repetition; `null` for bodyweight sets.
    pub weight: Option<f64>,
}

impl Reps {
    pub fn new(count: u32, weight: Option<f64>, intensity: Intensity) -> Result<Self> {
        let count = NonZeroU32::new(count)
            .ok_or_else(|| ClientError::Validation("Reps must be a positive number".to_string()))?;
        let reps = Self {
            count,
            intensity,
            weight,
        };
        reps.validate_weight()?;
        Ok(reps)
    }

    fn validate_weight(&self) -> Result<()> {
        match self.weight {
            Some(w) if !(w.is_finite() && w > 0.0) => Err(ClientError::Validation(
                "Weight must be a positive number".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Reps × weight; zero for unweighted sets.
    pub fn volume(&self) -> f64 {
        self.weight.map_or(0.0, |w| w * f64::from(self.count.get()))
    }
}

/// One set within an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    #[serde(with = "iso8601_millis")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601_millis")]
    pub finished_at: DateTime<Utc>,
    pub reps: Reps,
}

impl WorkoutSet {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, reps: Reps) -> Result<Self> {
        let set = Self {
            started_at,
            finished_at,
            reps,
        };
        set.validate()?;
        Ok(set)
    }

    /// Check the data-model invariants of this set.
    pub fn validate(&self) -> Result<()> {
        if self.finished_at < self.started_at {
            return Err(ClientError::Validation(
                "A set cannot finish before it starts".to_string(),
            ));
        }
        self.reps.validate_weight()
    }
}

/// One exercise ("workout" on the wire) and its sets, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(with = "iso8601_millis")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601_millis")]
    pub finished_at: DateTime<Utc>,
    pub sets: Vec<WorkoutSet>,
}

impl Exercise {
    pub fn new(
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        sets: Vec<WorkoutSet>,
    ) -> Result<Self> {
        let exercise = Self {
            name: name.into(),
            started_at,
            finished_at,
            sets,
        };
        exercise.validate()?;
        Ok(exercise)
    }

    /// Record an exercise logged just now: every timestamp is the current time.
    pub fn record(name: impl Into<String>, reps: Vec<Reps>) -> Result<Self> {
        let now = Utc::now();
        let sets = reps
            .into_iter()
            .map(|r| WorkoutSet::new(now, now, r))
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, now, now, sets)
    }

    /// Check the data-model invariants of this exercise and all of its sets.
    pub fn validate(&self) -> Result<()> {
        if self.finished_at < self.started_at {
            return Err(ClientError::Validation(format!(
                "Exercise '{}' cannot finish before it starts",
                self.name
            )));
        }
        self.sets.iter().try_for_each(WorkoutSet::validate)
    }

    pub fn total_reps(&self) -> u64 {
        self.sets.iter().map(|s| u64::from(s.reps.count.get())).sum()
    }
}

/// One row of the "add workout" form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetForm {
    /// Raw reps entry; `None` when the field was left empty.
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub intensity: Intensity,
}

/// The "add workout" form, checked before it becomes an `Exercise`.
#[derive(Debug, Clone, Validate)]
pub struct ExerciseForm {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, message = "Add at least one set"))]
    pub sets: Vec<SetForm>,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Please enter a workout name".into());
        return Err(err);
    }
    Ok(())
}

impl ExerciseForm {
    pub fn into_exercise(self) -> Result<Exercise> {
        self.validate()?;
        let reps = self
            .sets
            .iter()
            .map(|set| {
                let count = set.reps.ok_or_else(|| {
                    ClientError::Validation("Please fill in reps for all sets".to_string())
                })?;
                Reps::new(count, set.weight, set.intensity)
            })
            .collect::<Result<Vec<_>>>()?;
        Exercise::record(self.name.trim(), reps)
    }
}

/// In-memory record of the session being trained.
///
/// `exercises` only grows until the session is flushed; there is no backend
/// id until a flush succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSession {
    started_at: DateTime<Utc>,
    notes: String,
    exercises: Vec<Exercise>,
}

impl WorkoutSession {
    /// Start an empty session now.
    pub fn start() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            notes: String::new(),
            exercises: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Append an exercise. Only the data-model invariants are checked here;
    /// form-level checks belong to `ExerciseForm`.
    pub fn add_exercise(&mut self, exercise: Exercise) -> Result<()> {
        exercise.validate()?;
        tracing::debug!(
            exercise = %exercise.name,
            sets = exercise.sets.len(),
            "Exercise added to session"
        );
        self.exercises.push(exercise);
        Ok(())
    }

    /// Build the backend payload, finishing the session now.
    pub fn build_payload(&self) -> SessionPayload {
        self.build_payload_at(Utc::now())
    }

    /// Build the backend payload with an explicit finish time.
    ///
    /// A finish time earlier than the start is clamped to the start.
    pub fn build_payload_at(&self, finished_at: DateTime<Utc>) -> SessionPayload {
        let notes = if self.notes.is_empty() {
            format!("Session completed with {} exercises", self.exercises.len())
        } else {
            self.notes.clone()
        };

        SessionPayload {
            started_at: self.started_at,
            finished_at: finished_at.max(self.started_at),
            notes,
            workouts: self.exercises.clone(),
        }
    }
}

/// Body of `POST /sessions/`. Field names are the backend's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(with = "iso8601_millis")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601_millis")]
    pub finished_at: DateTime<Utc>,
    pub notes: String,
    pub workouts: Vec<Exercise>,
}

/// A set as returned by the history endpoint (timestamps may be omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSet {
    #[serde(default, with = "iso8601_millis::option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "iso8601_millis::option")]
    pub finished_at: Option<DateTime<Utc>>,
    pub reps: Reps,
}

/// An exercise as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExercise {
    pub name: String,
    #[serde(default, with = "iso8601_millis::option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "iso8601_millis::option")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sets: Vec<RecordedSet>,
}

/// A persisted session, identified by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    #[serde(with = "iso8601_millis")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601_millis")]
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub workouts: Vec<RecordedExercise>,
}

impl SessionRecord {
    /// Local copy of a flushed payload under the id the backend assigned.
    pub fn from_payload(id: i64, payload: &SessionPayload) -> Self {
        Self {
            id,
            started_at: payload.started_at,
            finished_at: payload.finished_at,
            notes: Some(payload.notes.clone()),
            workouts: payload
                .workouts
                .iter()
                .map(|e| RecordedExercise {
                    name: e.name.clone(),
                    started_at: Some(e.started_at),
                    finished_at: Some(e.finished_at),
                    sets: e
                        .sets
                        .iter()
                        .map(|s| RecordedSet {
                            started_at: Some(s.started_at),
                            finished_at: Some(s.finished_at),
                            reps: s.reps.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
