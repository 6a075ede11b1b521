//! In-memory record of the latest job per identifier.
//!
//! The ledger is how finished and failed jobs stay observable after the
//! request that ran them returns. It holds one entry per [`JobId`]; a newer
//! submission of the same identifier replaces the older record. The ledger
//! is bounded: once full, recording a new identifier evicts the one recorded
//! least recently.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::types::{Job, JobId, JobState};

/// Number of identifiers kept by [`JobLedger::new`].
pub const DEFAULT_LEDGER_CAPACITY: usize = 1024;

/// Thread-safe map from job identifier to its most recent [`Job`].
#[derive(Debug)]
pub struct JobLedger {
    capacity: usize,
    inner: Mutex<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    next_seq: u64,
    /// Job records tagged with the sequence number of their last update.
    jobs: HashMap<JobId, (u64, Job)>,
}

/// Counts of recorded jobs by terminal outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    /// Jobs recorded in total.
    pub total: usize,
    /// Jobs whose last run ended in `Failed`.
    pub failed: usize,
    /// Jobs whose last run ended in `Published`.
    pub published: usize,
}

impl Default for JobLedger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }
}

impl JobLedger {
    /// Creates an empty ledger holding up to [`DEFAULT_LEDGER_CAPACITY`] jobs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger holding up to `capacity` jobs (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Returns the maximum number of identifiers kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores `job`, replacing any earlier record with the same identifier.
    pub fn record(&self, job: Job) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        if !inner.jobs.contains_key(&job.job_id) && inner.jobs.len() >= self.capacity {
            let oldest = inner
                .jobs
                .iter()
                .min_by_key(|(_, (recorded, _))| *recorded)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                inner.jobs.remove(&oldest);
                debug!(job_id = %oldest, "evicted job record");
            }
        }
        inner.jobs.insert(job.job_id.clone(), (seq, job));
    }

    /// Returns a copy of the latest record for `job_id`.
    pub fn get(&self, job_id: &JobId) -> Option<Job> {
        self.lock().jobs.get(job_id).map(|(_, job)| job.clone())
    }

    /// Drops the record for `job_id`, returning true if one existed.
    pub fn forget(&self, job_id: &JobId) -> bool {
        self.lock().jobs.remove(job_id).is_some()
    }

    /// Returns the number of recorded jobs.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts recorded jobs by outcome.
    pub fn summary(&self) -> LedgerSummary {
        let inner = self.lock();
        let mut summary = LedgerSummary {
            total: inner.jobs.len(),
            ..LedgerSummary::default()
        };
        for (_, job) in inner.jobs.values() {
            match job.state {
                JobState::Failed => summary.failed += 1,
                JobState::Published => summary.published += 1,
                _ => {}
            }
        }
        summary
    }
}
