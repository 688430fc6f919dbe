//! Durable job store: one JSON file holding every job record plus the
//! submission-order history.
//!
//! Every mutation is a whole-file load/mutate/save cycle. Within one process
//! that makes mutations strictly sequential; across processes concurrent
//! writers can race (lost-update hazard). Closing that gap needs file
//! locking or a transactional backing store.

use crate::error::{ErrorCode, ScanError};
use crate::job::JobRecord;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// The full persisted state: job id -> record, plus append-only history
/// of job ids in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStoreSnapshot {
    #[serde(default)]
    pub jobs: HashMap<String, JobRecord>,
    #[serde(default)]
    pub history: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
}

impl JobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full snapshot. A missing, unreadable, or corrupt state file
    /// yields a fresh empty snapshot; corruption is logged, never raised.
    pub fn load(&self) -> JobStoreSnapshot {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return JobStoreSnapshot::default();
            }
            Err(err) => {
                warn!(
                    "Could not read job store '{}', starting fresh: {err}",
                    self.path.display()
                );
                return JobStoreSnapshot::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    "Job store '{}' is corrupt, starting fresh: {err}",
                    self.path.display()
                );
                JobStoreSnapshot::default()
            }
        }
    }

    /// Write the whole snapshot atomically: serialize to a temp file in the
    /// same directory, then rename it over the store path, so a concurrent
    /// reader never observes a partially written file.
    pub fn save(&self, snapshot: &JobStoreSnapshot) -> Result<(), ScanError> {
        let text = serde_json::to_string_pretty(snapshot).map_err(|e| {
            ScanError::new(ErrorCode::Internal, format!("Could not serialize job store: {e}"))
        })?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| {
            ScanError::new(
                ErrorCode::Io,
                format!("Could not persist job store '{}': {}", self.path.display(), e.error),
            )
        })?;
        Ok(())
    }

    /// Insert a new record and append its id to history.
    pub fn create(&self, record: JobRecord) -> Result<(), ScanError> {
        let mut snapshot = self.load();
        if snapshot.jobs.contains_key(&record.job_id) {
            return Err(ScanError::new(
                ErrorCode::DuplicateId,
                format!("Job id '{}' already exists in the store", record.job_id),
            ));
        }
        snapshot.history.push(record.job_id.clone());
        snapshot.jobs.insert(record.job_id.clone(), record);
        self.save(&snapshot)
    }

    pub fn get(&self, job_id: &str) -> Result<JobRecord, ScanError> {
        self.load()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| ScanError::not_found(job_id))
    }
}

/// `job_` plus an 8-hex-character random suffix. Collisions are not defended
/// against beyond the store-level duplicate check in `create`.
pub fn generate_job_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("job_{}", &hex[..8])
}
