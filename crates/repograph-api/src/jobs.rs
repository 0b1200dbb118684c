use dashmap::DashMap;
use repograph_core::{Job, JobError, JobKind, JobState, RepoGraphError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub jobs: BTreeMap<String, Job>,
}

/// Registry of asynchronous pipeline executions, owned by the service.
///
/// Ids are `"<kind>_<counter>"` with a process-wide monotonic counter.
/// State only moves forward; completed records are retained until
/// explicitly deleted.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Job>,
    tokens: DashMap<String, CancellationToken>,
    counter: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, kind: JobKind) -> Job {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let job_id = format!("{}_{}", kind, n);
        let job = Job::new(job_id.clone(), kind);
        self.tokens.insert(job_id.clone(), CancellationToken::new());
        self.jobs.insert(job_id, job.clone());
        job
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|j| j.clone())
    }

    pub fn token(&self, job_id: &str) -> Option<CancellationToken> {
        self.tokens.get(job_id).map(|t| t.clone())
    }

    fn transition(&self, job_id: &str, next: JobState, update: impl FnOnce(&mut Job)) {
        let Some(mut entry) = self.jobs.get_mut(job_id) else {
            warn!("transition for unknown job {}", job_id);
            return;
        };
        if !entry.state.can_transition_to(next) {
            warn!(
                "illegal job transition {:?} -> {:?} for {}",
                entry.state, next, job_id
            );
            return;
        }
        entry.state = next;
        update(&mut entry);
    }

    pub fn mark_running(&self, job_id: &str) {
        self.transition(job_id, JobState::Running, |_| {});
    }

    pub fn set_progress(&self, job_id: &str, progress: impl Into<String>) {
        if let Some(mut entry) = self.jobs.get_mut(job_id) {
            entry.progress = Some(progress.into());
        }
    }

    pub fn complete(&self, job_id: &str, result: serde_json::Value) {
        self.transition(job_id, JobState::Completed, |job| {
            job.finished_at = Some(chrono::Utc::now());
            job.result = Some(result);
        });
    }

    pub fn fail(&self, job_id: &str, error: &RepoGraphError) {
        self.transition(job_id, JobState::Failed, |job| {
            job.finished_at = Some(chrono::Utc::now());
            job.error = Some(JobError::new(error.kind(), error.to_string()));
        });
    }

    pub fn mark_cancelled(&self, job_id: &str) {
        self.transition(job_id, JobState::Cancelled, |job| {
            job.finished_at = Some(chrono::Utc::now());
        });
    }

    /// Requests cancellation; the running task observes the token at its
    /// next suspension point. Pending jobs cancel immediately.
    pub fn cancel(&self, job_id: &str) -> Result<()> {
        let job = self
            .get(job_id)
            .ok_or_else(|| RepoGraphError::NotFound(format!("job {}", job_id)))?;
        if let Some(token) = self.token(job_id) {
            token.cancel();
        }
        if job.state == JobState::Pending {
            self.mark_cancelled(job_id);
        }
        Ok(())
    }

    pub fn delete(&self, job_id: &str) -> Result<()> {
        let job = self
            .get(job_id)
            .ok_or_else(|| RepoGraphError::NotFound(format!("job {}", job_id)))?;
        if !job.state.is_terminal() {
            return Err(RepoGraphError::InvalidInput(format!(
                "job {} has not finished; cancel it first",
                job_id
            )));
        }
        self.jobs.remove(job_id);
        self.tokens.remove(job_id);
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| !j.state.is_terminal())
            .count()
    }

    pub fn summary(&self) -> JobSummary {
        let jobs: BTreeMap<String, Job> = self
            .jobs
            .iter()
            .map(|j| (j.key().clone(), j.value().clone()))
            .collect();
        let active = jobs.values().filter(|j| !j.state.is_terminal()).count();
        let completed = jobs
            .values()
            .filter(|j| j.state == JobState::Completed)
            .count();
        let failed = jobs.values().filter(|j| j.state == JobState::Failed).count();
        JobSummary {
            total: jobs.len(),
            active,
            completed,
            failed,
            jobs,
        }
    }
}
