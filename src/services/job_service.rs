use std::env;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::db::job_store::JobStore;
use crate::db::StoreError;
use crate::models::job::{GenerationRequest, Job, JobStatus};
use crate::services::staleness_service;

const STUCK_JOB_THRESHOLD_MINUTES: i64 = 5;

/// Error recorded on a job that was recovered after its worker went silent.
pub const ABANDONED_JOB_ERROR: &str = "abandoned by generation worker";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct JobPolicyConfig {
    /// How long a processing job may go without an update before it is
    /// presumed abandoned. An operational tuning knob, not a correctness one.
    pub stuck_after: Duration,
}

impl Default for JobPolicyConfig {
    fn default() -> Self {
        Self {
            stuck_after: Duration::minutes(STUCK_JOB_THRESHOLD_MINUTES),
        }
    }
}

impl JobPolicyConfig {
    pub fn from_env() -> Self {
        let minutes = env::var("STUCK_JOB_THRESHOLD_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(STUCK_JOB_THRESHOLD_MINUTES);

        Self {
            stuck_after: Duration::minutes(minutes),
        }
    }
}

/// Result or error to attach to a transition. Whichever side the new status
/// calls for is kept; the other side is always cleared.
#[derive(Debug, Clone, Default)]
pub struct TransitionPayload {
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum RecoveryOutcome {
    Recovered(Job),
    NotAbandoned(Job),
}

/// Owns the generation-job state machine: creation, transition rules, the
/// forced-override escape hatch and the abandoned-job policy.
pub struct JobService {
    store: Arc<dyn JobStore>,
    config: JobPolicyConfig,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, config: JobPolicyConfig) -> Self {
        Self { store, config }
    }

    pub async fn create(&self, parameters: GenerationRequest) -> Result<Job, JobError> {
        let job = Job::new(parameters);
        self.store.insert(&job).await?;
        println!("Created generation job {}", job.job_id);
        Ok(job)
    }

    pub async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Move a job to `next`. Without `forced` the move must be in the current
    /// status's successor set. With `forced` any move is permitted; the job is
    /// marked as corrected and the override is logged.
    pub async fn transition(
        &self,
        job_id: &str,
        next: JobStatus,
        payload: TransitionPayload,
        forced: bool,
    ) -> Result<Job, JobError> {
        let mut job = self.get(job_id).await?;

        if !forced && !job.status.allows(next) {
            return Err(JobError::InvalidTransition {
                from: job.status,
                to: next,
            });
        }

        if forced {
            eprintln!(
                "Forced correction on job {}: {} -> {}",
                job.job_id, job.status, next
            );
            job.force_corrected = true;
        }

        job.status = next;
        match next {
            JobStatus::Completed => {
                job.result = payload.result;
                job.error = None;
            }
            JobStatus::Failed => {
                job.error = payload.error.or_else(|| Some("job failed".to_string()));
                job.result = None;
            }
            JobStatus::Pending | JobStatus::Processing => {
                job.result = None;
                job.error = None;
            }
        }
        job.updated_at = Utc::now();

        self.store.update(&job.job_id, &job).await?;
        Ok(job)
    }

    /// Abandonment predicate shared by the status route, the recovery route
    /// and the sweep, so they all agree on the threshold.
    pub fn is_abandoned(&self, job: &Job, now: DateTime<Utc>) -> bool {
        staleness_service::job_abandoned(job.status, job.updated_at, now, self.config.stuck_after)
    }

    /// Operator recovery for a stuck job. An abandoned job is force-moved to
    /// `target` (failed with a sentinel error unless the caller picks another
    /// terminal status); a job that is not abandoned is left untouched.
    pub async fn recover_if_abandoned(
        &self,
        job_id: &str,
        target: Option<JobStatus>,
    ) -> Result<RecoveryOutcome, JobError> {
        let job = self.get(job_id).await?;
        if !self.is_abandoned(&job, Utc::now()) {
            return Ok(RecoveryOutcome::NotAbandoned(job));
        }

        let target = target.unwrap_or(JobStatus::Failed);
        let payload = match target {
            JobStatus::Failed => TransitionPayload {
                result: None,
                error: Some(ABANDONED_JOB_ERROR.to_string()),
            },
            _ => TransitionPayload::default(),
        };

        let corrected = self.transition(job_id, target, payload, true).await?;
        Ok(RecoveryOutcome::Recovered(corrected))
    }

    /// All processing jobs currently past the stuck threshold.
    pub async fn list_abandoned(&self) -> Result<Vec<Job>, JobError> {
        let now = Utc::now();
        let processing = self.store.find_processing().await?;
        Ok(processing
            .into_iter()
            .filter(|job| self.is_abandoned(job, now))
            .collect())
    }
}
