//! Per-session and whole-history statistics for the history view.

use chrono::Duration;
use serde::Serialize;

use crate::models::SessionRecord;

/// Totals for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub exercises: usize,
    pub total_sets: usize,
    pub total_reps: u64,
    /// Σ reps × weight over weighted sets
    pub volume: f64,
    pub duration_secs: i64,
}

impl SessionStats {
    pub fn from_record(record: &SessionRecord) -> Self {
        let sets = record.workouts.iter().flat_map(|w| w.sets.iter());

        let (total_sets, total_reps, volume) = sets.fold((0, 0u64, 0.0), |(n, reps, vol), set| {
            (
                n + 1,
                reps + u64::from(set.reps.count.get()),
                vol + set.reps.volume(),
            )
        });

        Self {
            exercises: record.workouts.len(),
            total_sets,
            total_reps,
            volume,
            duration_secs: (record.finished_at - record.started_at).num_seconds().max(0),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }
}

/// Aggregates across every session in the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub sessions: usize,
    pub total_sets: usize,
    pub total_reps: u64,
    pub total_volume: f64,
    pub total_duration_secs: i64,
}

impl HistorySummary {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        records
            .iter()
            .map(SessionStats::from_record)
            .fold(Self::default(), |mut acc, stats| {
                acc.sessions += 1;
                acc.total_sets += stats.total_sets;
                acc.total_reps += stats.total_reps;
                acc.total_volume += stats.volume;
                acc.total_duration_secs += stats.duration_secs;
                acc
            })
    }

    /// Mean session length; zero for an empty history.
    pub fn average_duration_secs(&self) -> i64 {
        if self.sessions == 0 {
            0
        } else {
            self.total_duration_secs / self.sessions as i64
        }
    }
}
