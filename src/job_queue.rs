//! Job API: submit / status / result / cancel / list over the persisted
//! store, with time-driven status derivation applied on every read.
//!
//! Every operation here is a full load -> mutate -> save cycle against the
//! store. Callers pass `now` explicitly, which keeps the whole API a
//! deterministic function of (store contents, clock) and lets tests freeze
//! time.

use crate::config::ScanConfig;
use crate::error::{ErrorCode, ScanError};
use crate::job::{self, JobRecord, JobStatus};
use crate::job_store::{self, JobStore};
use crate::{fasta, sample_data};
use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Clamped to 1-10 on submission; out-of-range values are not errors.
    pub priority: i64,
    pub output_format: String,
    pub databases: Option<String>,
    pub tags: Vec<String>,
    pub notification_email: Option<String>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            priority: 5,
            output_format: "tsv".to_string(),
            databases: None,
            tags: vec![],
            notification_email: None,
        }
    }
}

/// Result payload for a completed job: the refreshed record, the raw
/// tabular output of the analysis, and the path it was saved to if the
/// caller asked for one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    pub record: JobRecord,
    pub results: String,
    pub output_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    pub total_jobs: usize,
    pub status_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct JobQueue {
    store: JobStore,
    config: ScanConfig,
}

impl JobQueue {
    pub fn new(config: ScanConfig) -> Self {
        let store = JobStore::new(config.state_path.clone());
        Self { store, config }
    }

    pub fn with_store(store: JobStore, config: ScanConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Create a job record for an externally executed analysis run.
    pub fn submit(
        &self,
        input_file: &str,
        options: SubmitOptions,
        now: DateTime<Utc>,
    ) -> Result<JobRecord, ScanError> {
        let input_path = Path::new(input_file);
        if !input_path.is_file() {
            return Err(ScanError::invalid_input(format!(
                "Input file not found: {input_file}"
            )));
        }

        let priority = options.priority.clamp(1, 10) as u8;
        let estimated_minutes = fasta::estimate_processing_minutes(input_path);
        let record = JobRecord {
            job_id: job_store::generate_job_id(),
            status: JobStatus::Submitted,
            input_file: input_file.to_string(),
            output_format: options.output_format,
            databases: options.databases.or_else(|| self.config.databases.clone()),
            priority,
            tags: options.tags,
            notification_email: options.notification_email,
            submitted_at: now,
            estimated_completion: now + Duration::minutes(estimated_minutes),
            progress: 0,
            cancelled_at: None,
        };
        self.store.create(record.clone())?;
        info!(
            "Submitted {} (priority {priority}, ~{estimated_minutes} min)",
            record.job_id
        );
        Ok(record)
    }

    /// Refresh and persist one record, returning its derived state.
    pub fn status(&self, job_id: &str, now: DateTime<Utc>) -> Result<JobRecord, ScanError> {
        let mut snapshot = self.store.load();
        let record = snapshot
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScanError::not_found(job_id))?;
        job::refresh(record, now);
        let refreshed = record.clone();
        self.store.save(&snapshot)?;
        Ok(refreshed)
    }

    /// Fetch the tabular output of a completed job. Fails `NotReady` until
    /// the derived status reaches `completed`; completed results remain
    /// retrievable indefinitely. When `output` is given the raw TSV is also
    /// written there, creating parent directories as needed.
    pub fn result(
        &self,
        job_id: &str,
        output: Option<&Path>,
        now: DateTime<Utc>,
    ) -> Result<JobOutput, ScanError> {
        let record = self.status(job_id, now)?;
        if record.status != JobStatus::Completed {
            return Err(ScanError::new(
                ErrorCode::NotReady,
                format!(
                    "Job '{job_id}' is not completed yet (status: {})",
                    record.status.as_str()
                ),
            ));
        }
        let results = sample_data::mock_job_results(&record.input_file, job_id, now);
        let mut output_file = None;
        if let Some(output) = output {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output, &results)?;
            info!("Saved {job_id} results to '{}'", output.display());
            output_file = Some(output.to_string_lossy().to_string());
        }
        Ok(JobOutput {
            record,
            results,
            output_file,
        })
    }

    /// Cancel a non-completed job. Cancellation is bookkeeping only: it
    /// does not stop any externally running computation.
    pub fn cancel(&self, job_id: &str, now: DateTime<Utc>) -> Result<JobRecord, ScanError> {
        let mut snapshot = self.store.load();
        let record = snapshot
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScanError::not_found(job_id))?;
        if job::derive_status(record, now) == JobStatus::Completed {
            return Err(ScanError::new(
                ErrorCode::AlreadyCompleted,
                format!("Cannot cancel completed job '{job_id}'"),
            ));
        }
        record.status = JobStatus::Cancelled;
        record.cancelled_at = Some(now);
        record.progress = 0;
        let cancelled = record.clone();
        self.store.save(&snapshot)?;
        info!("Cancelled {job_id}");
        Ok(cancelled)
    }

    /// List records in submission order with freshly derived statuses,
    /// optionally filtered by status.
    pub fn list(
        &self,
        status_filter: Option<JobStatus>,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, ScanError> {
        let mut snapshot = self.store.load();
        for record in snapshot.jobs.values_mut() {
            job::refresh(record, now);
        }
        let jobs = snapshot
            .history
            .iter()
            .filter_map(|id| snapshot.jobs.get(id))
            .filter(|record| status_filter.is_none_or(|wanted| record.status == wanted))
            .cloned()
            .collect();
        self.store.save(&snapshot)?;
        Ok(jobs)
    }

    /// Total job count plus a per-status breakdown, derived fresh.
    pub fn server_info(&self, now: DateTime<Utc>) -> Result<ServerInfo, ScanError> {
        let jobs = self.list(None, now)?;
        let mut status_counts = BTreeMap::new();
        for record in &jobs {
            *status_counts
                .entry(record.status.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(ServerInfo {
            total_jobs: jobs.len(),
            status_counts,
        })
    }
}

/// Wrap a payload in the `{"status": "success", ...}` envelope callers
/// consume. Non-object payloads land under a `result` key.
pub fn success_response(result: Value, message: Option<&str>) -> Value {
    let mut fields = match result {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    fields.insert("status".to_string(), json!("success"));
    if let Some(message) = message {
        fields.insert("message".to_string(), json!(message));
    }
    Value::Object(fields)
}

/// Wrap an error in the `{"status": "error", ...}` envelope.
pub fn error_response(error: &ScanError, context: Option<&str>) -> Value {
    let mut fields = Map::new();
    fields.insert("status".to_string(), json!("error"));
    fields.insert("error".to_string(), json!(error.message));
    fields.insert("code".to_string(), json!(error.code));
    if let Some(context) = context {
        fields.insert("context".to_string(), json!(context));
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn queue_in(dir: &Path) -> (JobQueue, std::path::PathBuf) {
        let input = dir.join("input.fasta");
        crate::fasta::create_sample_fasta(&input).unwrap();
        let config = ScanConfig {
            state_path: dir.join("jobs.json").to_string_lossy().to_string(),
            ..ScanConfig::default()
        };
        (JobQueue::new(config), input)
    }

    #[test]
    fn test_submit_then_query_through_lifecycle() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let record = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();
        assert_eq!(record.status, JobStatus::Submitted);
        assert!(record.estimated_completion > t0);

        let at_30s = queue
            .status(&record.job_id, t0 + Duration::seconds(30))
            .unwrap();
        assert_eq!(at_30s.status, JobStatus::Queued);
        assert_eq!(at_30s.progress, 0);

        let at_90s = queue
            .status(&record.job_id, t0 + Duration::seconds(90))
            .unwrap();
        assert_eq!(at_90s.status, JobStatus::Running);
        assert_eq!(at_90s.progress, 45);

        let at_4m = queue
            .status(&record.job_id, t0 + Duration::minutes(4))
            .unwrap();
        assert_eq!(at_4m.status, JobStatus::Completed);
        assert_eq!(at_4m.progress, 100);

        let output = queue
            .result(&record.job_id, None, t0 + Duration::minutes(4))
            .unwrap();
        assert!(!output.results.is_empty());
        assert!(output.results.contains(&record.job_id));
        assert!(output.output_file.is_none());
    }

    #[test]
    fn test_result_saves_to_requested_path() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let record = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();

        let target = dir.path().join("saved/results.tsv");
        let output = queue
            .result(&record.job_id, Some(&target), t0 + Duration::minutes(4))
            .unwrap();
        assert_eq!(
            output.output_file.as_deref(),
            Some(&*target.to_string_lossy())
        );
        let written = std::fs::read_to_string(&target).unwrap();
        assert_eq!(written, output.results);
        assert!(written.contains(&record.job_id));
    }

    #[test]
    fn test_result_before_completion_is_not_ready() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let record = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();
        let err = queue
            .result(&record.job_id, None, t0 + Duration::seconds(30))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotReady);
    }

    #[test]
    fn test_cancel_is_terminal_with_original_timestamp() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let record = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();

        let cancel_time = t0 + Duration::seconds(90);
        let cancelled = queue.cancel(&record.job_id, cancel_time).unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(cancelled.cancelled_at, Some(cancel_time));

        // Derivation never resurrects a cancelled job, no matter how late.
        let later = queue
            .status(&record.job_id, t0 + Duration::hours(2))
            .unwrap();
        assert_eq!(later.status, JobStatus::Cancelled);
        assert_eq!(later.cancelled_at, Some(cancel_time));
        assert_eq!(later.progress, 0);

        let err = queue
            .result(&record.job_id, None, t0 + Duration::hours(2))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotReady);
    }

    #[test]
    fn test_cancel_completed_job_fails() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let record = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();
        let err = queue
            .cancel(&record.job_id, t0 + Duration::minutes(5))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyCompleted);
    }

    #[test]
    fn test_cancel_unknown_job_fails_not_found() {
        let dir = tempdir().unwrap();
        let (queue, _input) = queue_in(dir.path());
        let err = queue.cancel("job_deadbeef", Utc::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_submit_missing_input_is_invalid() {
        let dir = tempdir().unwrap();
        let (queue, _input) = queue_in(dir.path());
        let err = queue
            .submit("/nonexistent.fasta", SubmitOptions::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_priority_is_clamped_not_rejected() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let record = queue
            .submit(
                &input.to_string_lossy(),
                SubmitOptions {
                    priority: 99,
                    ..SubmitOptions::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(record.priority, 10);

        let record = queue
            .submit(
                &input.to_string_lossy(),
                SubmitOptions {
                    priority: -3,
                    ..SubmitOptions::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(record.priority, 1);
    }

    #[test]
    fn test_list_preserves_submission_order_and_filters() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let a = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();
        let b = queue
            .submit(
                &input.to_string_lossy(),
                SubmitOptions::default(),
                t0 + Duration::minutes(2),
            )
            .unwrap();

        // At t0+2.5min: job a has been running 2.5min -> running;
        // job b 0.5min -> queued.
        let now = t0 + Duration::seconds(150);
        let all = queue.list(None, now).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].job_id, a.job_id);
        assert_eq!(all[1].job_id, b.job_id);
        assert_eq!(all[0].status, JobStatus::Running);
        assert_eq!(all[1].status, JobStatus::Queued);

        let queued = queue.list(Some(JobStatus::Queued), now).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].job_id, b.job_id);
    }

    #[test]
    fn test_server_info_counts_by_status() {
        let dir = tempdir().unwrap();
        let (queue, input) = queue_in(dir.path());
        let t0 = Utc::now();
        let a = queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();
        queue
            .submit(&input.to_string_lossy(), SubmitOptions::default(), t0)
            .unwrap();
        queue.cancel(&a.job_id, t0 + Duration::seconds(10)).unwrap();

        let info = queue.server_info(t0 + Duration::seconds(30)).unwrap();
        assert_eq!(info.total_jobs, 2);
        assert_eq!(info.status_counts.get("cancelled"), Some(&1));
        assert_eq!(info.status_counts.get("queued"), Some(&1));
    }

    #[test]
    fn test_response_envelopes() {
        let ok = success_response(json!({"job_id": "job_12345678"}), Some("Job submitted"));
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["job_id"], "job_12345678");
        assert_eq!(ok["message"], "Job submitted");

        let err = error_response(&ScanError::not_found("job_x"), Some("get_job_status"));
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "NotFound");
        assert_eq!(err["context"], "get_job_status");
    }
}
