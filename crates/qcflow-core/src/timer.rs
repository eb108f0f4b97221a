//! Cycle timer.
//!
//! Measures how long each unit takes. [`CycleTimer::complete_unit`] is the
//! only operation that changes timing; the periodic display tick reads the
//! clock without touching state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown before any unit has completed.
pub const NOT_STARTED: &str = "--:--";

/// Timing record for a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxTiming {
    /// Start of the unit in progress.
    pub start_time: Option<DateTime<Utc>>,

    /// Durations of completed units, in completion order.
    pub completed_durations_seconds: Vec<u64>,

    /// Duration of the first completed unit. Never overwritten.
    pub first_unit_duration: Option<u64>,

    /// Mean of all completed durations, or the single duration.
    pub running_average_seconds: Option<u64>,

    /// Set when a unit completes, cleared when the next one starts.
    pub box_completed: bool,
}

/// Display strings for the timer panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDisplay {
    /// Elapsed time of the unit in progress.
    pub elapsed: String,

    /// First-unit duration (one unit done), running average (two or more),
    /// or [`NOT_STARTED`].
    pub summary: String,

    /// Which value `summary` shows.
    pub summary_kind: SummaryKind,
}

/// Which value the timer summary shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    NotStarted,
    FirstUnit,
    RunningAverage,
}

/// Unit timer over a [`BoxTiming`] record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleTimer {
    timing: BoxTiming,
}

impl CycleTimer {
    /// Creates an empty timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the timing record.
    pub fn timing(&self) -> &BoxTiming {
        &self.timing
    }

    /// Starts timing a unit.
    pub fn start_unit(&mut self, now: DateTime<Utc>) {
        self.timing.start_time = Some(now);
        self.timing.box_completed = false;
    }

    /// Stops timing the current unit and returns its duration in seconds.
    ///
    /// Without a running unit the duration is zero. Clock skew that would
    /// produce a negative duration is also clamped to zero.
    pub fn complete_unit(&mut self, now: DateTime<Utc>) -> u64 {
        let duration = self
            .timing
            .start_time
            .take()
            .map_or(0, |start| seconds_between(start, now));

        let timing = &mut self.timing;
        timing.completed_durations_seconds.push(duration);
        if timing.first_unit_duration.is_none() {
            timing.first_unit_duration = Some(duration);
        }
        timing.running_average_seconds = Some(rounded_mean(&timing.completed_durations_seconds));
        timing.box_completed = true;

        tracing::debug!(
            duration,
            units = timing.completed_durations_seconds.len(),
            average = ?timing.running_average_seconds,
            "unit timed"
        );
        duration
    }

    /// Seconds since the running unit started, if one is running.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        self.timing
            .start_time
            .map(|start| seconds_between(start, now))
    }

    /// Number of completed units.
    pub fn completed_units(&self) -> usize {
        self.timing.completed_durations_seconds.len()
    }

    /// Builds the display strings for `now`. Does not modify the timer.
    pub fn display(&self, now: DateTime<Utc>) -> TimerDisplay {
        let elapsed = self
            .elapsed_seconds(now)
            .map_or_else(|| NOT_STARTED.to_string(), format_seconds);

        let (summary_kind, value) = match self.completed_units() {
            0 => (SummaryKind::NotStarted, None),
            1 => (SummaryKind::FirstUnit, self.timing.first_unit_duration),
            _ => (SummaryKind::RunningAverage, self.timing.running_average_seconds),
        };

        TimerDisplay {
            elapsed,
            summary: value.map_or_else(|| NOT_STARTED.to_string(), format_seconds),
            summary_kind,
        }
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}

fn rounded_mean(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let total: u64 = values.iter().sum();
    let count = values.len() as u64;
    (total + count / 2) / count
}

/// Formats seconds as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
