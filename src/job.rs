//! Job records and the time-driven lifecycle derivation.
//!
//! Status is never pushed by a background worker. It is derived lazily on
//! every read from the submission timestamp and the caller-supplied clock,
//! which keeps derivation a pure function and makes it trivially testable
//! with a frozen `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Elapsed-time policy table, in minutes since submission.
///
/// Below `QUEUE_PHASE_MINS` a job reports `queued`, below `RUN_PHASE_MINS`
/// it reports `running`, beyond that `completed`. These thresholds model a
/// demo SLA and are a replaceable policy, not a protocol constant.
pub const QUEUE_PHASE_MINS: f64 = 1.0;
pub const RUN_PHASE_MINS: f64 = 3.0;

/// Progress advances linearly at this rate while running, clamped to 5-95%.
const PROGRESS_PER_MINUTE: f64 = 30.0;
const RUNNING_PROGRESS_MIN: f64 = 5.0;
const RUNNING_PROGRESS_MAX: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Queued,
    Running,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses are never changed by derivation.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(JobStatus::Submitted),
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

/// Bookkeeping entry for one submitted unit of externally performed work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub input_file: String,
    pub output_format: String,
    #[serde(default)]
    pub databases: Option<String>,
    pub priority: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notification_email: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub estimated_completion: DateTime<Utc>,
    pub progress: u8,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Derive the current status from the record and wall-clock time.
///
/// Terminal statuses are returned unchanged; everything else progresses
/// through the policy table as time advances. Idempotent for a fixed `now`.
pub fn derive_status(record: &JobRecord, now: DateTime<Utc>) -> JobStatus {
    if record.status.is_terminal() {
        return record.status;
    }
    let elapsed = elapsed_minutes(record.submitted_at, now);
    if elapsed < QUEUE_PHASE_MINS {
        JobStatus::Queued
    } else if elapsed < RUN_PHASE_MINS {
        JobStatus::Running
    } else {
        JobStatus::Completed
    }
}

/// Derive the progress percentage for an already-derived status.
pub fn derive_progress(status: JobStatus, submitted_at: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    match status {
        JobStatus::Queued => 0,
        JobStatus::Running => {
            let raw = (elapsed_minutes(submitted_at, now) * PROGRESS_PER_MINUTE).floor();
            raw.clamp(RUNNING_PROGRESS_MIN, RUNNING_PROGRESS_MAX) as u8
        }
        JobStatus::Completed => 100,
        JobStatus::Submitted | JobStatus::Cancelled => 0,
    }
}

/// Recompute status and progress in place, returning the derived status.
pub fn refresh(record: &mut JobRecord, now: DateTime<Utc>) -> JobStatus {
    let status = derive_status(record, now);
    record.status = status;
    record.progress = derive_progress(status, record.submitted_at, now);
    status
}
