//! Lifecycle state and execution report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one job instance.
///
/// `Created → FieldsBound → Configured → {Skipped | Running} → {Succeeded | Failed}`
///
/// A job instance is created fresh for every execution and never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Instantiated, nothing bound yet
    Created,
    /// Fields resolved from the property context
    FieldsBound,
    /// `configure()` and dependency configuration done
    Configured,
    /// Every output existed before running; `run()` was not invoked
    Skipped,
    /// `run()` in progress
    Running,
    /// Finished successfully (including the skip path)
    Succeeded,
    /// Failed in configure, run, the output postcondition or `on_success`
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Configured (or further along), so configuring again is a no-op.
    pub fn is_configured(&self) -> bool {
        *self >= JobState::Configured
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::FieldsBound => "fields_bound",
            JobState::Configured => "configured",
            JobState::Skipped => "skipped",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Record of one successful `execute()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: String,
    pub state: JobState,
    /// True when the pre-check found every output and `run()` was not invoked.
    pub skipped: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl JobReport {
    pub fn new(job: impl Into<String>, skipped: bool, started_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            job: job.into(),
            state: JobState::Succeeded,
            skipped,
            started_at,
            finished_at: now,
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_along_the_lifecycle() {
        assert!(JobState::Created < JobState::FieldsBound);
        assert!(JobState::FieldsBound < JobState::Configured);
        assert!(JobState::Configured.is_configured());
        assert!(JobState::Running.is_configured());
        assert!(!JobState::FieldsBound.is_configured());
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Skipped.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn report_serializes_state_in_snake_case() {
        let report = JobReport::new("export_orders", true, Utc::now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["skipped"], true);
    }
}
